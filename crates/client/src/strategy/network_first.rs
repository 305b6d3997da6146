use std::time::Duration;

use tuneverse_core::{Request, RequestClass, Response};

use super::Strategies;

impl Strategies {
    /// Fresh data when the network answers in time; the tier, then synthesis,
    /// when it does not.
    pub async fn network_first(
        &self, request: &Request, class: RequestClass, store: &str, timeout: Duration,
    ) -> Response {
        match self.fetch_within(request, timeout).await {
            Ok(response) => {
                if response.ok() && !response.is_partial() && !response.is_opaque() {
                    self.persist(store, request, &response);
                } else {
                    tracing::debug!(url = %request.url, status = response.status, "passing through uncached response");
                }
                response
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network unavailable, trying cache");
                match self.lookup(store, request).await {
                    Some(hit) => {
                        tracing::debug!(store, url = %request.url, "cache hit after network failure");
                        hit
                    }
                    None => self.synthesize(request, class).await,
                }
            }
        }
    }
}
