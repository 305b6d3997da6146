//! Request classification and routing.
//!
//! Every intercepted request lands in exactly one class; each class maps to
//! one tier and one fetch strategy. Cross-origin and non-GET requests are
//! never intercepted and are left to default network handling.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::Tier;
use crate::config::AppConfig;
use crate::http::{Destination, Request};
use crate::origin::is_same_origin;

/// Class of an intercepted request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestClass {
    Api,
    Image,
    StaticDocument,
    Other,
}

/// Fetch algorithm used for a class.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Race the network against `timeout`; fall back to the tier, then synthesis.
    NetworkFirst { timeout: Duration },
    /// Serve from the tier when present; otherwise fetch and persist.
    CacheFirst,
}

/// Tier and strategy chosen for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Route {
    pub class: RequestClass,
    pub tier: Tier,
    pub strategy: Strategy,
}

/// Whether the layer answers this request at all.
pub fn is_intercepted(request: &Request, config: &AppConfig) -> bool {
    request.method.is_cacheable() && is_same_origin(&config.origin, &request.url)
}

/// Classify an intercepted request. Returns `None` for requests the layer
/// must leave alone.
pub fn classify(request: &Request, config: &AppConfig) -> Option<RequestClass> {
    if !is_intercepted(request, config) {
        return None;
    }

    let class = if request.path().starts_with(&config.api_prefix) {
        RequestClass::Api
    } else {
        match request.destination {
            Destination::Image => RequestClass::Image,
            Destination::Document | Destination::Script | Destination::Style => RequestClass::StaticDocument,
            _ => RequestClass::Other,
        }
    };

    Some(class)
}

/// Tier and strategy for a classified request.
pub fn route(class: RequestClass, request: &Request, config: &AppConfig) -> Route {
    let network_first = Strategy::NetworkFirst { timeout: config.network_timeout() };
    let (tier, strategy) = match class {
        RequestClass::Api => (Tier::Api, network_first),
        RequestClass::Image => (Tier::Images, Strategy::CacheFirst),
        RequestClass::StaticDocument if config.network_first_documents && request.is_navigation() => {
            (Tier::Static, network_first)
        }
        RequestClass::StaticDocument => (Tier::Static, Strategy::CacheFirst),
        RequestClass::Other => (Tier::Runtime, Strategy::CacheFirst),
    };
    Route { class, tier, strategy }
}
