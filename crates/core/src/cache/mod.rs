//! SQLite-backed cache storage for request/response pairs.
//!
//! This module provides durable, named cache stores using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - One store per worker version, enumerable and deletable by name
//! - Entries keyed by a SHA-256 of method and URL, GET only
//! - Automatic schema migrations
//! - WAL mode for concurrent access

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;
pub mod stores;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{CacheStore, StoredResponse};
