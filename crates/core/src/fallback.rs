//! Substitute responses for requests neither the network nor the cache can answer.
//!
//! The synthesizer is total: whatever the class, a concrete response comes
//! back and nothing is ever raised to the caller.

use std::sync::Arc;

use bytes::Bytes;
use serde_json::{Value, json};

use crate::cache::CacheStorage;
use crate::classify::RequestClass;
use crate::config::AppConfig;
use crate::http::{Destination, FALLBACK_HEADER, Request, Response};

/// Text served when nothing better is available.
pub const OFFLINE_TEXT: &str = "You are offline. Some features may not be available.";

/// 1x1 transparent GIF.
static PLACEHOLDER_GIF: [u8; 43] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff, 0xff,
    0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02,
    0x02, 0x44, 0x01, 0x00, 0x3b,
];

/// Produces class-appropriate substitutes on total exhaustion.
#[derive(Debug, Clone)]
pub struct FallbackSynthesizer {
    config: Arc<AppConfig>,
}

impl FallbackSynthesizer {
    pub fn new(config: Arc<AppConfig>) -> Self {
        Self { config }
    }

    /// Answer `request` without the network.
    ///
    /// Only the document branch touches `storage` (to find the app shell); a
    /// failing lookup degrades to the generic offline text.
    pub async fn respond(&self, request: &Request, class: RequestClass, storage: &dyn CacheStorage) -> Response {
        tracing::debug!(url = %request.url, ?class, "synthesizing offline fallback");
        match class {
            RequestClass::Api => self.api(request),
            RequestClass::Image => placeholder_image(),
            RequestClass::StaticDocument if request.is_navigation() => match self.app_shell(storage).await {
                Some(shell) => shell.with_header(FALLBACK_HEADER, "shell"),
                None => offline_text(),
            },
            RequestClass::StaticDocument | RequestClass::Other => offline_text(),
        }
    }

    /// Empty collection for known read-mostly endpoints, tagged error otherwise.
    pub fn api(&self, request: &Request) -> Response {
        let path = request.path();
        let endpoint = path
            .strip_prefix(self.config.api_prefix.as_str())
            .unwrap_or(path)
            .trim_end_matches('/');

        match empty_collection(endpoint, request) {
            Some(body) => json_response(200, &body),
            None => json_response(
                503,
                &json!({
                    "error": "offline",
                    "offline": true,
                    "message": OFFLINE_TEXT,
                    "path": path,
                }),
            ),
        }
    }

    async fn app_shell(&self, storage: &dyn CacheStorage) -> Option<Response> {
        for path in [self.config.app_shell.as_str(), "/"] {
            let url = match self.config.resolve(path) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(path, error = %e, "app shell path does not resolve");
                    continue;
                }
            };
            let shell = Request::navigate(url).with_destination(Destination::Document);
            match storage.match_any(&shell).await {
                Ok(Some(response)) => return Some(response),
                Ok(None) => {}
                Err(e) => tracing::warn!(path, error = %e, "app shell lookup failed"),
            }
        }
        None
    }
}

/// Structurally valid empty payload for a known collection endpoint.
fn empty_collection(endpoint: &str, request: &Request) -> Option<Value> {
    let body = match endpoint {
        "folders" => json!({ "folders": [] }),
        "files" if request.url.query_pairs().any(|(k, _)| k == "folder") => json!({ "files": [] }),
        "files" => json!({ "folders": {}, "root": [] }),
        "status" => json!({ "statuses": [] }),
        "stats" => json!({
            "total": 0,
            "completed": 0,
            "errors": 0,
            "processing": 0,
            "recent": [],
        }),
        _ => return None,
    };
    Some(body)
}

fn json_response(status: u16, body: &Value) -> Response {
    Response::new(status, body.to_string())
        .with_header("content-type", "application/json")
        .with_header(FALLBACK_HEADER, "1")
}

/// Minimal valid image so image elements never show a broken-asset glyph.
pub fn placeholder_image() -> Response {
    Response::new(200, Bytes::from_static(&PLACEHOLDER_GIF))
        .with_header("content-type", "image/gif")
        .with_header("cache-control", "no-store")
        .with_header(FALLBACK_HEADER, "1")
}

/// Generic 503 offline text.
pub fn offline_text() -> Response {
    Response::new(503, OFFLINE_TEXT)
        .with_header("content-type", "text/plain")
        .with_header(FALLBACK_HEADER, "1")
}
