//! SQLite-backed cache for mirrored documents and sync state.
//!
//! This module provides persistent storage using SQLite with async access
//! via tokio-rusqlite. It supports:
//!
//! - Upsert-by-(store, id) document storage, one table per document kind
//! - Per-(store, kind) sync status rows
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod documents;
pub mod migrations;
pub mod status;

pub use crate::Error;

pub use connection::CacheDb;
pub use documents::{DocKind, Document};
pub use status::SyncStatus;
