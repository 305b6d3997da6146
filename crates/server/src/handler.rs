//! MCP server handler implementation.
//!
//! This module defines the main server handler that
//! routes tool calls to the appropriate implementations.
use std::sync::Arc;

use crate::tools::cache::{SwCacheStoresParams, stores_impl};
use crate::tools::fetch::{SwFetchParams, fetch_impl};
use crate::tools::message::{SwMessageParams, message_impl};
use crate::tools::notification::{SwNotificationClickParams, click_impl};

use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{
        tool::{ToolCallContext, ToolRouter},
        wrapper::Parameters,
    },
    model::{
        CallToolRequestParam, CallToolResult, Implementation, ListToolsResult, PaginatedRequestParam, ProtocolVersion,
        ServerCapabilities, ServerInfo,
    },
    service::{RequestContext, RoleServer},
    tool, tool_router,
};
use tuneverse_client::ServiceWorker;
use tuneverse_core::CacheDb;

/// The MCP server handler for tuneverse-sw.
#[derive(Clone)]
pub struct TuneVerseServer {
    worker: Arc<ServiceWorker>,
    cache: Arc<CacheDb>,
    tool_router: ToolRouter<Self>,
}

/// Tool router implementation using the #[tool_router] macro.
///
/// This macro generates the routing logic that maps tool names to handler methods.
#[tool_router]
impl TuneVerseServer {
    /// Create a new server handler around a running worker.
    pub fn new(worker: Arc<ServiceWorker>, cache: Arc<CacheDb>) -> Self {
        Self { worker, cache, tool_router: Self::tool_router() }
    }

    /// Issue a page request through the worker.
    #[tool(
        description = "Fetch a URL through the offline worker. Returns status, headers, body and whether the answer was an offline fallback."
    )]
    async fn sw_fetch(&self, params: Parameters<SwFetchParams>) -> Result<CallToolResult, McpError> {
        fetch_impl(&self.worker, params.0).await
    }

    /// Post a control message and wait for its reply.
    #[tool(
        description = "Post a control message (SKIP_WAITING, CLEAR_CACHE, GET_CACHE_SIZE, SHOW_NOW_PLAYING) to the worker and return its reply."
    )]
    async fn sw_message(&self, params: Parameters<SwMessageParams>) -> Result<CallToolResult, McpError> {
        message_impl(&self.worker, params.0).await
    }

    #[tool(description = "Click the now-playing notification, optionally on one of its buttons. Returns the pages notified.")]
    async fn sw_notification_click(
        &self, params: Parameters<SwNotificationClickParams>,
    ) -> Result<CallToolResult, McpError> {
        click_impl(&self.worker, params.0).await
    }

    #[tool(description = "List cache stores with entry counts and sizes, or the entries of one store.")]
    async fn sw_cache_stores(&self, params: Parameters<SwCacheStoresParams>) -> Result<CallToolResult, McpError> {
        stores_impl(&self.cache, params.0).await
    }
}

impl ServerHandler for TuneVerseServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "tuneverse-sw".into(),
                version: env!("CARGO_PKG_VERSION").into(),
                ..Default::default()
            },
            protocol_version: ProtocolVersion::LATEST,
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            instructions: Some(
                "Offline layer for TuneVerse: fetch through network-first/cache-first strategies, post control messages, and inspect cache stores."
                    .into(),
            ),
            ..Default::default()
        }
    }

    async fn list_tools(
        &self, _request: Option<PaginatedRequestParam>, _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, rmcp::model::ErrorData> {
        Ok(ListToolsResult { meta: None, tools: self.tool_router.list_all(), next_cursor: None })
    }

    async fn call_tool(
        &self, request: CallToolRequestParam, context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, rmcp::model::ErrorData> {
        self.tool_router
            .call(ToolCallContext::new(self, request, context))
            .await
    }
}
