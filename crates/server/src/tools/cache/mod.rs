//! Cache-related MCP tools.
//!
//! This module provides tools for inspecting the SQLite-backed cache stores.

pub mod stores;

pub use stores::{SwCacheStoresParams, stores_impl};
