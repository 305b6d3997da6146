//! Network access for the offline layer.
//!
//! ### Contract
//! - `fetch` settles once the response head arrives. The body is read
//!   afterwards through [`Incoming::read`], bounded by the transport timeout.
//! - Any HTTP status is a response, not an error; strategies decide what a
//!   non-success status means.
//! - Transport failures (refused, DNS, TLS, reset) are `Error::Network`,
//!   client-side timeouts are `Error::FetchTimeout`.
//! - Bodies larger than `max_bytes` are rejected with `Error::FetchTooLarge`.
//! - Redirects are followed up to `max_redirects`; the response type is
//!   `basic` when the final URL stays on the application origin and `cors`
//!   otherwise.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{Client, header};
use std::future::Future;
use std::pin::Pin;
use std::time::{Duration, Instant};
use url::Url;

use tuneverse_core::origin::is_same_origin;
use tuneverse_core::{AppConfig, Error, Headers, Method, Request, Response, ResponseType};

type BodyFuture = Pin<Box<dyn Future<Output = Result<Bytes, Error>> + Send>>;

/// Something that can answer a request from the network.
#[async_trait]
pub trait Network: Send + Sync {
    /// Resolves when the response head is available.
    async fn fetch(&self, request: &Request) -> Result<Incoming, Error>;
}

/// A response whose head has arrived and whose body may still be in flight.
pub struct Incoming {
    head: Response,
    body: BodyFuture,
}

impl Incoming {
    /// Wrap a response whose body is already in memory.
    pub fn ready(mut response: Response) -> Self {
        let body = std::mem::take(&mut response.body);
        Self { head: response, body: Box::pin(async move { Ok::<_, Error>(body) }) }
    }

    /// Pair a head with the future that delivers its body.
    pub fn streaming(head: Response, body: impl Future<Output = Result<Bytes, Error>> + Send + 'static) -> Self {
        Self { head, body: Box::pin(body) }
    }

    pub fn status(&self) -> u16 {
        self.head.status
    }

    /// Wait for the rest of the body.
    pub async fn read(self) -> Result<Response, Error> {
        let body = self.body.await?;
        Ok(Response { body, ..self.head })
    }
}

/// Configuration for the HTTP network.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "tuneverse-sw/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 50MB)
    pub max_bytes: usize,

    /// Hard transport timeout. Strategies race their own, usually shorter,
    /// timer on top of this.
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "tuneverse-sw/0.1".to_string(),
            max_bytes: 50 * 1024 * 1024,
            timeout: Duration::from_secs(30),
            max_redirects: 5,
        }
    }
}

impl FetchConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            user_agent: config.user_agent.clone(),
            max_bytes: config.max_bytes,
            // Must exceed the strategy timeout so the race fires first.
            timeout: config.network_timeout() * 2,
            ..Default::default()
        }
    }
}

/// reqwest-backed network.
pub struct HttpNetwork {
    http: Client,
    config: FetchConfig,
    origin: Url,
}

impl HttpNetwork {
    /// Create a new network client with the given configuration.
    pub fn new(config: FetchConfig, origin: Url) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config, origin })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }
}

fn to_reqwest_method(method: Method) -> reqwest::Method {
    match method {
        Method::Get => reqwest::Method::GET,
        Method::Head => reqwest::Method::HEAD,
        Method::Post => reqwest::Method::POST,
        Method::Put => reqwest::Method::PUT,
        Method::Patch => reqwest::Method::PATCH,
        Method::Delete => reqwest::Method::DELETE,
        Method::Options => reqwest::Method::OPTIONS,
    }
}

fn transport_error(url: &Url, err: &reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::FetchTimeout(format!("{url}: {err}"))
    } else {
        Error::Network(format!("{url}: {err}"))
    }
}

#[async_trait]
impl Network for HttpNetwork {
    async fn fetch(&self, request: &Request) -> Result<Incoming, Error> {
        let start = Instant::now();

        let mut builder = self.http.request(to_reqwest_method(request.method), request.url.as_str());
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }

        let response = builder.send().await.map_err(|e| transport_error(&request.url, &e))?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let response_type = if is_same_origin(&self.origin, response.url()) {
            ResponseType::Basic
        } else {
            ResponseType::Cors
        };

        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| value.to_str().ok().map(|v| (name.as_str().to_string(), v.to_string())))
            .collect();

        tracing::debug!(
            url = %request.url,
            status = status.as_u16(),
            content_type = headers.get(header::CONTENT_TYPE.as_str()).unwrap_or(""),
            head_ms = start.elapsed().as_millis() as u64,
            "network response head"
        );

        let head = Response {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_string(),
            headers,
            body: Bytes::new(),
            response_type,
        };

        let url = request.url.clone();
        let max_bytes = self.config.max_bytes;
        let body = async move {
            let bytes = response.bytes().await.map_err(|e| transport_error(&url, &e))?;

            if bytes.len() > max_bytes {
                return Err(Error::FetchTooLarge(format!("{} bytes exceeds {}", bytes.len(), max_bytes)));
            }

            tracing::debug!(
                url = %url,
                bytes = bytes.len(),
                fetch_ms = start.elapsed().as_millis() as u64,
                "network body read"
            );
            Ok::<_, Error>(bytes)
        };

        Ok(Incoming::streaming(head, body))
    }
}
