//! Fetch strategies: how a routed request is answered from network and cache.
//!
//! Both strategies return a concrete response for every request. The wait for
//! a response head is raced against the configured timeout. Successful
//! responses are duplicated and the duplicate persisted on a detached task;
//! exhaustion ends in the fallback synthesizer.

mod cache_first;
mod network_first;
pub mod race;

use std::sync::Arc;
use std::time::Duration;

use tuneverse_core::{
    AppConfig, CacheStorage, Error, FallbackSynthesizer, Request, RequestClass, Response, Route, Strategy,
};

use crate::fetch::Network;
use crate::lifetime::Lifetime;

pub use race::{Race, race};

/// Executes fetch strategies against one storage and one network.
#[derive(Clone)]
pub struct Strategies {
    storage: Arc<dyn CacheStorage>,
    network: Arc<dyn Network>,
    fallback: FallbackSynthesizer,
    lifetime: Lifetime,
    /// Bound on cache-first network fetches.
    timeout: Duration,
}

impl Strategies {
    pub fn new(
        config: Arc<AppConfig>, storage: Arc<dyn CacheStorage>, network: Arc<dyn Network>, lifetime: Lifetime,
    ) -> Self {
        let timeout = config.network_timeout();
        Self { storage, network, fallback: FallbackSynthesizer::new(config), lifetime, timeout }
    }

    /// Answer `request` along `route`, using `store` as the tier's store name.
    pub async fn run(&self, request: &Request, route: Route, store: &str) -> Response {
        match route.strategy {
            Strategy::NetworkFirst { timeout } => self.network_first(request, route.class, store, timeout).await,
            Strategy::CacheFirst => self.cache_first(request, route.class, store).await,
        }
    }

    /// Network whose response head must arrive within `timeout`. A timeout
    /// becomes `Error::FetchTimeout`; the body is then read under the
    /// transport's own bound.
    async fn fetch_within(&self, request: &Request, timeout: Duration) -> Result<Response, Error> {
        let incoming = match race(self.network.fetch(request), timeout).await {
            Race::Settled(result) => result?,
            Race::TimedOut => {
                return Err(Error::FetchTimeout(format!("{} after {}ms", request.url, timeout.as_millis())));
            }
        };
        incoming.read().await
    }

    /// Tier lookup where a storage failure counts as a miss.
    async fn lookup(&self, store: &str, request: &Request) -> Option<Response> {
        match self.storage.match_in(store, request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(store, url = %request.url, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Lookup across every store where a storage failure counts as a miss.
    async fn lookup_any(&self, request: &Request) -> Option<Response> {
        match self.storage.match_any(request).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(url = %request.url, error = %e, "cache read failed, treating as miss");
                None
            }
        }
    }

    /// Store a duplicate of `response` without delaying the caller.
    fn persist(&self, store: &str, request: &Request, response: &Response) {
        let storage = self.storage.clone();
        let store = store.to_string();
        let request = request.clone();
        let copy = response.duplicate();

        self.lifetime.wait_until(async move {
            match storage.put(&store, &request, copy).await {
                Ok(()) => tracing::debug!(store, url = %request.url, "cached response"),
                Err(e) => tracing::warn!(store, url = %request.url, error = %e, "cache write failed"),
            }
        });
    }

    async fn synthesize(&self, request: &Request, class: RequestClass) -> Response {
        self.fallback.respond(request, class, self.storage.as_ref()).await
    }
}
