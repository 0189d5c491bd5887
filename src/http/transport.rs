//! Provides [`Transport`], the bottom of the HTTP stack (§4.B): a thin, HTTPS-only wrapper
//! around a `reqwest::Client` that classifies every response into the [`TransportError`] family
//! instead of letting `reqwest`'s own error type leak upward, and follows redirects itself so it
//! can enforce the ten-hop cap.

use super::{mask_url, HttpClient, Method, Request, Response};
use crate::error::TransportError;
use crate::util::ext::ResponseExt;
use async_trait::async_trait;
use log::*;
use reqwest::{redirect::Policy, StatusCode};
use serde::Deserialize;
use std::time::Duration;

/// Maximum number of redirects [`Transport`] will follow before giving up (§4.B).
const MAX_REDIRECTS: u8 = 10;
/// Default connect timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default overall request timeout, covering both the read and write phases.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// The user-agent sent with every request.
const USER_AGENT: &str = "factorix";

/// The shape of a mod portal error body, per §4.B: `{"error": "...", "message": "..."}`.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: Option<String>,
    message: Option<String>,
}

/// Configuration for a [`Transport`].
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Connect timeout.
    pub connect_timeout: Duration,
    /// Overall request timeout.
    pub timeout: Duration,
    /// Query parameter names whose values get masked (`*****`) in log output, e.g. `token`.
    pub masked_params: Vec<String>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            timeout: DEFAULT_TIMEOUT,
            masked_params: Vec::new(),
        }
    }
}

/// The raw HTTP transport. HTTPS-only: any `http://` URL is rejected with
/// [`TransportError::Url`] before a connection is attempted.
#[derive(Debug)]
pub struct Transport {
    client: reqwest::Client,
    masked_params: Vec<String>,
}

impl Transport {
    /// Builds a new transport from the given configuration.
    pub fn new(config: TransportConfig) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .connect_timeout(config.connect_timeout)
            .timeout(config.timeout)
            .redirect(Policy::none())
            .build()?;

        Ok(Transport {
            client,
            masked_params: config.masked_params,
        })
    }

    /// Logs a request URL with credentials masked.
    fn log_url(&self, prefix: &str, url: &str) {
        debug!("{}: {}", prefix, mask_url(url, &self.masked_params));
    }

    fn require_https(url: &str) -> Result<url::Url, TransportError> {
        let parsed = url::Url::parse(url).map_err(|_| TransportError::Url(url.to_string()))?;
        if parsed.scheme() != "https" {
            return Err(TransportError::Url(url.to_string()));
        }
        Ok(parsed)
    }

    fn reqwest_method(method: Method) -> reqwest::Method {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Delete => reqwest::Method::DELETE,
        }
    }

    fn build_request(&self, request: &Request, url: &url::Url) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(Self::reqwest_method(request.method), url.as_str());

        for (name, value) in &request.headers {
            builder = builder.header(name, value);
        }

        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        builder
    }

    /// Classifies a non-2xx/non-3xx `reqwest::Response` into a [`TransportError`], consuming the
    /// body to extract an API error message where one is present (§4.B).
    async fn classify_error(host: &str, status: StatusCode, response: reqwest::Response) -> TransportError {
        let body = response.text().await.unwrap_or_default();
        let parsed: Option<ApiErrorBody> = serde_json::from_str(&body).ok();
        let api_error = parsed.as_ref().and_then(|b| b.error.clone());
        let api_message = parsed.as_ref().and_then(|b| b.message.clone());

        if status == StatusCode::NOT_FOUND {
            return TransportError::HttpNotFound { api_error, api_message };
        }

        if status.is_client_error() {
            return TransportError::HttpClient {
                status: status.as_u16(),
                api_error,
                api_message,
            };
        }

        if status.is_server_error() {
            return TransportError::HttpServer { status: status.as_u16() };
        }

        let _ = host;
        TransportError::Http { status: status.as_u16() }
    }

    fn classify_reqwest_error(host: &str, error: reqwest::Error) -> TransportError {
        let host = host.to_string();
        if error.is_timeout() {
            TransportError::NetworkTimeout { host }
        } else if error.is_connect() {
            TransportError::NetworkConnection { host }
        } else if error.to_string().to_lowercase().contains("tls") || error.to_string().to_lowercase().contains("ssl")
        {
            TransportError::Tls { host }
        } else if error.is_request() || error.is_body() {
            TransportError::Network { host }
        } else {
            TransportError::Reqwest(error)
        }
    }

    /// Sends one request, following redirects up to [`MAX_REDIRECTS`], and returns the final
    /// `reqwest::Response` together with the final URL it was served from.
    ///
    /// Per §4.B, a 3xx response is never resent with its original method and body: each redirect
    /// hop rewrites to a bodyless `GET` against `Location` before recursing, same as a browser's
    /// "simple" redirect handling.
    async fn send_following_redirects(
        &self,
        request: &Request,
    ) -> Result<(reqwest::Response, String), TransportError> {
        let mut url = Self::require_https(&request.url)?;
        let mut hops = 0u8;
        // Borrowed for the first hop; after the first redirect we rewrite to GET and own the
        // request for the rest of the loop.
        let mut owned_request;
        let mut current = request;

        loop {
            self.log_url("Requesting", url.as_str());
            let host = url.host_str().unwrap_or_default().to_string();

            let response = self
                .build_request(current, &url)
                .send()
                .await
                .map_err(|e| Self::classify_reqwest_error(&host, e))?;

            let status = response.status();
            if status.is_redirection() {
                hops += 1;
                if hops > MAX_REDIRECTS {
                    return Err(TransportError::TooManyRedirects(request.url.clone()));
                }

                let location = response
                    .headers()
                    .get(reqwest::header::LOCATION)
                    .and_then(|v| v.to_str().ok())
                    .ok_or_else(|| TransportError::InvalidRedirect {
                        from: url.to_string(),
                        location: String::new(),
                    })?
                    .to_string();

                let next = url.join(&location).map_err(|_| TransportError::InvalidRedirect {
                    from: url.to_string(),
                    location: location.clone(),
                })?;

                if next.scheme() != "https" {
                    return Err(TransportError::InvalidRedirect {
                        from: url.to_string(),
                        location,
                    });
                }

                owned_request = Request {
                    method: Method::Get,
                    url: next.to_string(),
                    headers: current.headers.clone(),
                    body: None,
                };
                current = &owned_request;
                url = next;
                continue;
            }

            let final_url = url.to_string();
            return Ok((response, final_url));
        }
    }
}

#[async_trait]
impl HttpClient for Transport {
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let (response, final_url) = self.send_following_redirects(&request).await?;
        let status = response.status();

        if !status.is_success() {
            let host = response.url().host_str().unwrap_or_default().to_string();
            return Err(Self::classify_error(&host, status, response).await);
        }

        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let code = status.as_u16();
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::classify_reqwest_error(&final_url, e))?
            .to_vec();

        Ok(Response {
            code,
            body,
            headers,
            final_url,
            from_cache: false,
        })
    }

    async fn download_to_writer(
        &self,
        request: Request,
        writer: &mut (dyn tokio::io::AsyncWrite + Unpin + Send),
    ) -> Result<Response, TransportError> {
        let (mut response, final_url) = self.send_following_redirects(&request).await?;
        let status = response.status();

        if !status.is_success() {
            let host = response.url().host_str().unwrap_or_default().to_string();
            return Err(Self::classify_error(&host, status, response).await);
        }

        let headers = response
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let code = status.as_u16();

        response
            .to_writer(writer)
            .await
            .map_err(|_| TransportError::Network { host: final_url.clone() })?;

        Ok(Response {
            code,
            body: Vec::new(),
            headers,
            final_url,
            from_cache: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_https_urls() {
        assert!(Transport::require_https("http://example.com").is_err());
        assert!(Transport::require_https("https://example.com").is_ok());
        assert!(Transport::require_https("not a url").is_err());
    }

    #[test]
    fn default_config_has_sane_timeouts() {
        let config = TransportConfig::default();
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.timeout, Duration::from_secs(30));
    }
}
