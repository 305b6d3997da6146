//! Request-identity cache key generation.

use sha2::{Digest, Sha256};
use url::Url;

use crate::http::Method;

/// Compute the cache key for a request identity (method + absolute URL).
///
/// The fragment never takes part in the identity.
pub fn compute_request_key(method: Method, url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);

    let mut hasher = Sha256::new();
    hasher.update(method.as_str().as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_key_stability() {
        let key1 = compute_request_key(Method::Get, &url("http://localhost:5000/api/folders"));
        let key2 = compute_request_key(Method::Get, &url("http://localhost:5000/api/folders"));
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_key_different_method() {
        let get = compute_request_key(Method::Get, &url("http://localhost:5000/api/folders"));
        let head = compute_request_key(Method::Head, &url("http://localhost:5000/api/folders"));
        assert_ne!(get, head);
    }

    #[test]
    fn test_key_query_matters() {
        let v1 = compute_request_key(Method::Get, &url("http://localhost:5000/style.css?v=1.2.0"));
        let v2 = compute_request_key(Method::Get, &url("http://localhost:5000/style.css?v=1.3.0"));
        assert_ne!(v1, v2);
    }

    #[test]
    fn test_key_fragment_ignored() {
        let plain = compute_request_key(Method::Get, &url("http://localhost:5000/player.html"));
        let frag = compute_request_key(Method::Get, &url("http://localhost:5000/player.html#x"));
        assert_eq!(plain, frag);
    }

    #[test]
    fn test_key_format() {
        let key = compute_request_key(Method::Get, &url("http://localhost:5000/"));
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
