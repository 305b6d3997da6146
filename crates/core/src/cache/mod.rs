//! SQLite-backed cache stores keyed by request identity.
//!
//! This module provides the named, versioned stores the offline layer reads
//! and writes, using SQLite with async access via tokio-rusqlite. It supports:
//!
//! - Request-identity keys using SHA-256 hashing
//! - Automatic schema migrations
//! - WAL mode for concurrent access
//! - Whole-store deletion as the only eviction mechanism

pub mod connection;
pub mod entries;
pub mod generation;
pub mod hash;
pub mod migrations;
pub mod storage;

pub use crate::Error;

pub use connection::CacheDb;
pub use entries::{EntryMeta, StoreSummary};
pub use generation::{Generation, Tier};
pub use storage::CacheStorage;
