use tuneverse_core::{Request, RequestClass, Response};

use super::Strategies;

impl Strategies {
    /// Serve stored responses without revalidation; fetch and persist on a miss.
    pub async fn cache_first(&self, request: &Request, class: RequestClass, store: &str) -> Response {
        if let Some(hit) = self.lookup(store, request).await {
            tracing::debug!(store, url = %request.url, "cache hit");
            return hit;
        }

        tracing::debug!(store, url = %request.url, "cache miss");
        match self.fetch_within(request, self.timeout).await {
            Ok(response) => {
                if response.status == 200 && !response.is_opaque() {
                    self.persist(store, request, &response);
                }
                response
            }
            Err(e) => {
                tracing::debug!(url = %request.url, error = %e, "network unavailable, searching every store");
                match self.lookup_any(request).await {
                    Some(hit) => hit,
                    None => self.synthesize(request, class).await,
                }
            }
        }
    }
}
