//! sw_message tool implementation.
//!
//! Posts a control message to the worker on a reply channel and returns the
//! reply.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tuneverse_client::{PendingMessage, Reply, ServiceWorker};
use tuneverse_core::Error;

/// Input parameters for the sw_message tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwMessageParams {
    /// The message as a page would post it, e.g. `{"type": "GET_CACHE_SIZE"}`.
    pub message: Value,
}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct SwMessageOutput {
    pub reply: Reply,
}

/// Implementation of the sw_message tool.
pub async fn message_impl(worker: &ServiceWorker, params: SwMessageParams) -> Result<CallToolResult, McpError> {
    let (message, reply) = PendingMessage::with_reply(params.message);
    worker.handle_message(message).await;

    let reply = reply
        .await
        .map_err(|_| Error::Platform("worker dropped the reply channel".into()))?;

    let json = serde_json::to_string_pretty(&SwMessageOutput { reply })
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
