//! sw_notification_click tool implementation.
//!
//! Simulates a click on the now-playing notification.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use tuneverse_client::{NotificationAction, ServiceWorker};
use tuneverse_core::Error;

/// Input parameters for the sw_notification_click tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwNotificationClickParams {
    /// Button that was pressed: "rewind", "playpause", "forward" or "close".
    /// Omit for a click on the notification body.
    #[serde(default)]
    pub action: Option<String>,
}

/// Implementation of the sw_notification_click tool.
pub async fn click_impl(
    worker: &ServiceWorker, params: SwNotificationClickParams,
) -> Result<CallToolResult, McpError> {
    let action = params
        .action
        .as_deref()
        .map(str::parse::<NotificationAction>)
        .transpose()?;

    let outcome = worker.handle_notification_click(action).await?;

    let json = serde_json::to_string_pretty(&outcome)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
