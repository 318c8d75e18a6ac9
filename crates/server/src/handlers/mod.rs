//! HTTP request handlers.

pub mod data_storage;
pub mod documents;
pub mod health;
