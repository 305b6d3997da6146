//! Structured errors for tool parameters.

use rmcp::model::{ErrorCode, ErrorData as McpError};

/// Errors raised while decoding tool parameters, before the worker is involved.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Invalid input parameters (e.g., an unknown destination).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),
}

impl From<ToolError> for McpError {
    fn from(err: ToolError) -> Self {
        let (code, message) = match &err {
            ToolError::InvalidInput(_) => (-32602, err.to_string()),
        };

        McpError { code: ErrorCode(code), message: message.into(), data: None }
    }
}
