//! Provides the layered HTTP stack (§4.B/4.C/4.D): a raw [`transport::Transport`], an
//! exponential-backoff [`retry::RetryClient`] decorator, and a single-flight
//! [`cache::CacheClient`] decorator, all implementing the same narrow [`HttpClient`] trait so
//! they compose as `CacheClient(RetryClient(Transport))`, matching §2's control-flow diagram.

pub mod cache;
pub mod portal;
pub mod retry;
pub mod transport;

pub use cache::CacheClient;
pub use retry::RetryClient;
pub use transport::Transport;

use crate::error::TransportError;
use async_trait::async_trait;
use std::collections::HashMap;

/// An HTTP method this stack knows how to send, per §4.B's public contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    /// `GET`.
    Get,
    /// `HEAD`.
    Head,
    /// `POST`.
    Post,
    /// `PUT`.
    Put,
    /// `DELETE`.
    Delete,
}

/// A single outgoing request.
#[derive(Debug, Clone)]
pub struct Request {
    /// The request method.
    pub method: Method,
    /// The full target URL, including any query string.
    pub url: String,
    /// Request headers.
    pub headers: HashMap<String, String>,
    /// An optional request body.
    pub body: Option<Vec<u8>>,
}

impl Request {
    /// Builds a bare `GET` request with no headers or body.
    pub fn get(url: impl Into<String>) -> Self {
        Request {
            method: Method::Get,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Builds a bare request of the given method.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Request {
            method,
            url: url.into(),
            headers: HashMap::new(),
            body: None,
        }
    }

    /// Adds a header, returning `self` for chaining.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets the request body, returning `self` for chaining.
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = Some(body);
        self
    }
}

/// A response to one request, whether served live or from the cache (§2's "uniform response
/// abstraction covering both live and cached results").
#[derive(Debug, Clone)]
pub struct Response {
    /// The final HTTP status code, after following any redirects.
    pub code: u16,
    /// The response body.
    pub body: Vec<u8>,
    /// Response headers, from the final response in a redirect chain.
    pub headers: HashMap<String, String>,
    /// The final URL the body was fetched from, after following any redirects.
    pub final_url: String,
    /// Whether this response was served from the cache rather than the network.
    pub from_cache: bool,
}

impl Response {
    /// Returns whether the status code indicates success (2xx or 206 Partial Content).
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Deserializes the body as JSON.
    pub fn json<T>(&self) -> Result<T, serde_json::Error>
    where
        T: serde::de::DeserializeOwned,
    {
        serde_json::from_slice(&self.body)
    }
}

/// The narrow request surface shared by the transport, the retry layer and the cache layer, so
/// they can be composed as decorators over one another (§2).
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Executes one request and returns the response, or a [`TransportError`] per §4.B/§4.C's
    /// status/failure classification.
    async fn execute(&self, request: Request) -> Result<Response, TransportError>;

    /// Executes a `GET` request, streaming the response body to `writer` as it arrives rather
    /// than buffering it. Used for mod archive downloads, where bodies can be tens of megabytes.
    /// Never cached, regardless of the delegate's caching behavior for [`execute`](Self::execute) —
    /// §4.D's cache layer only intercepts `execute`.
    async fn download_to_writer(
        &self,
        request: Request,
        writer: &mut (dyn tokio::io::AsyncWrite + Unpin + Send),
    ) -> Result<Response, TransportError>;
}

/// Replaces the values of `masked` query parameters in a URL with `*****`, for logging requests
/// that carry credentials in the query string (§4.B's credential masking). Parameters not
/// present are left alone; the rest of the URL is untouched. Falls back to returning `url`
/// unchanged if it doesn't parse, rather than panicking on a log path.
pub fn mask_url(url: &str, masked: &[String]) -> String {
    let mut parsed = match url::Url::parse(url) {
        Ok(parsed) => parsed,
        Err(_) => return url.to_string(),
    };

    if parsed.query().is_none() {
        return url.to_string();
    }

    let masked_pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| {
            if masked.iter().any(|m| m == k.as_ref()) {
                (k.into_owned(), "*****".to_string())
            } else {
                (k.into_owned(), v.into_owned())
            }
        })
        .collect();

    parsed.query_pairs_mut().clear().extend_pairs(&masked_pairs);
    parsed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks_configured_params() {
        let url = "https://mods.factorio.com/download?username=alice&token=secret123";
        let masked = mask_url(url, &["token".to_string()]);
        assert!(masked.contains("username=alice"));
        assert!(masked.contains("token=*****"));
        assert!(!masked.contains("secret123"));
    }

    #[test]
    fn leaves_unmasked_params_and_non_query_urls_alone() {
        let url = "https://mods.factorio.com/api/mods/foo";
        assert_eq!(mask_url(url, &["token".to_string()]), url);
    }
}
