//! sw_cache_stores tool implementation.
//!
//! Lists cache stores with their sizes, or the entries of one store.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use tuneverse_core::cache::{EntryMeta, StoreSummary};
use tuneverse_core::{CacheDb, CacheStorage, Error};

/// Parameters for the sw_cache_stores tool.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct SwCacheStoresParams {
    /// List the entries of this store instead of summarizing every store.
    #[serde(default)]
    pub store: Option<String>,
}

/// Output from the sw_cache_stores tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwCacheStoresOutput {
    pub stores: Vec<StoreSummary>,
    /// Body bytes across every store.
    pub total_bytes: u64,
    /// Entries of the requested store, when one was named.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<EntryMeta>>,
}

/// Implementation of the sw_cache_stores tool.
pub async fn stores_impl(cache: &CacheDb, params: SwCacheStoresParams) -> Result<CallToolResult, McpError> {
    let entries = match params.store.as_deref() {
        Some(store) => {
            if !cache.has_store(store).await? {
                return Err(Error::InvalidInput(format!("no such store: {store}")).into());
            }
            Some(cache.keys(store).await?)
        }
        None => None,
    };

    let output = SwCacheStoresOutput {
        stores: cache.store_summaries().await?,
        total_bytes: cache.total_size().await?,
        entries,
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
