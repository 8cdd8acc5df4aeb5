//! Core types and shared functionality for the BlindGuide offline cache.
//!
//! This crate provides:
//! - Durable cache storage (named stores of request/response pairs) on SQLite
//! - Unified error types
//! - Configuration structures

pub mod cache;
pub mod config;
pub mod error;

pub use cache::{CacheDb, CacheStore, StoredResponse};
pub use config::{AppConfig, ConfigError};
pub use error::Error;
