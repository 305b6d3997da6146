//! The cache store abstraction.

use async_trait::async_trait;

use crate::Error;
use crate::http::{Request, Response};

/// Named key-value stores keyed by request identity.
///
/// Stores are created on first write (or explicitly with `open_store`) and
/// removed only as a whole. Writes are upserts, so repeated writes for the
/// same request are idempotent and the last one wins.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Create the store if it does not exist yet.
    async fn open_store(&self, name: &str) -> Result<(), Error>;

    async fn has_store(&self, name: &str) -> Result<bool, Error>;

    /// Every store name, in creation order.
    async fn store_names(&self) -> Result<Vec<String>, Error>;

    /// Delete a store with all its entries. Returns whether it existed.
    async fn delete_store(&self, name: &str) -> Result<bool, Error>;

    /// Persist `response` for `request` in `store`, consuming the response.
    async fn put(&self, store: &str, request: &Request, response: Response) -> Result<(), Error>;

    /// Look up `request` in one store.
    async fn match_in(&self, store: &str, request: &Request) -> Result<Option<Response>, Error>;

    /// Look up `request` across every store, oldest store first.
    async fn match_any(&self, request: &Request) -> Result<Option<Response>, Error>;

    /// Sum of body sizes of every entry in every store.
    async fn total_size(&self) -> Result<u64, Error>;
}
