//! Core types and shared functionality for the document mirror.
//!
//! This crate provides:
//! - SQLite-backed document cache and sync-status store
//! - Layered configuration and the tenant registry
//! - Unified error types

pub mod cache;
pub mod config;
pub mod error;
pub mod tenants;

pub use cache::{CacheDb, DocKind, Document, SyncStatus};
pub use config::AppConfig;
pub use error::Error;
pub use tenants::{TenantCredentials, TenantRegistry};
