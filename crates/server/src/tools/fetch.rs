//! sw_fetch tool implementation.
//!
//! Issues a page request through the worker and reports how it was answered.

use rmcp::{
    ErrorData as McpError,
    model::{CallToolResult, Content},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use tuneverse_client::ServiceWorker;
use tuneverse_core::{Destination, Error, Method, Request, RequestMode, origin};

use crate::error::ToolError;

/// Input parameters for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchParams {
    /// Absolute URL, or a path relative to the application origin.
    pub url: String,

    /// Request destination: "document", "script", "style", "image", "font",
    /// "manifest" or empty (default).
    #[serde(default)]
    pub destination: Option<String>,

    /// Request mode: "navigate", "same-origin", "no-cors" or "cors" (default).
    #[serde(default)]
    pub mode: Option<String>,

    /// HTTP method (default: GET).
    #[serde(default)]
    pub method: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct HeaderPair {
    pub name: String,
    pub value: String,
}

/// Output structure for the sw_fetch tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SwFetchOutput {
    /// The resolved request URL.
    pub url: String,
    /// Whether the worker answered; `false` means default network handling.
    pub intercepted: bool,
    pub status: Option<u16>,
    pub status_text: Option<String>,
    pub headers: Vec<HeaderPair>,
    /// Body decoded as UTF-8 (lossy).
    pub body: Option<String>,
    pub bytes: usize,
    /// Whether the answer was synthesized offline.
    pub fallback: bool,
}

/// Decode a lowercase enum value the same way it arrives on the wire.
fn parse_wire<T: serde::de::DeserializeOwned>(field: &str, raw: &str) -> Result<T, ToolError> {
    serde_json::from_value(Value::String(raw.to_string()))
        .map_err(|_| ToolError::InvalidInput(format!("unsupported {field}: {raw}")))
}

fn build_request(worker: &ServiceWorker, params: &SwFetchParams) -> Result<Request, McpError> {
    let url = origin::resolve(&worker.config().origin, &params.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;

    let mut request = Request::get(url);
    if let Some(method) = &params.method {
        request = request.with_method(method.parse::<Method>()?);
    }
    if let Some(destination) = &params.destination {
        request = request.with_destination(parse_wire::<Destination>("destination", destination)?);
    }
    if let Some(mode) = &params.mode {
        request = request.with_mode(parse_wire::<RequestMode>("mode", mode)?);
    }
    Ok(request)
}

/// Implementation of the sw_fetch tool.
pub async fn fetch_impl(worker: &ServiceWorker, params: SwFetchParams) -> Result<CallToolResult, McpError> {
    if params.url.trim().is_empty() {
        return Err(ToolError::InvalidInput("url cannot be empty".into()).into());
    }

    let request = build_request(worker, &params)?;
    let url = request.url.to_string();

    let output = match worker.handle_fetch(request).await {
        Some(response) => SwFetchOutput {
            url,
            intercepted: true,
            status: Some(response.status),
            status_text: Some(response.status_text.clone()),
            headers: response
                .headers
                .iter()
                .map(|(name, value)| HeaderPair { name: name.to_string(), value: value.to_string() })
                .collect(),
            body: Some(String::from_utf8_lossy(&response.body).into_owned()),
            bytes: response.body_len(),
            fallback: response.is_fallback(),
        },
        None => {
            tracing::debug!(%url, "request not intercepted");
            SwFetchOutput {
                url,
                intercepted: false,
                status: None,
                status_text: None,
                headers: Vec::new(),
                body: None,
                bytes: 0,
                fallback: false,
            }
        }
    };

    let json = serde_json::to_string_pretty(&output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}
