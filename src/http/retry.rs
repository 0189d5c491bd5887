//! Provides [`RetryClient`], the exponential-backoff-with-jitter decorator described in §4.C.

use super::{HttpClient, Request, Response};
use crate::error::TransportError;
use async_trait::async_trait;
use rand::Rng;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// The `5xx` statuses treated as retryable when a [`RetryConfig`] doesn't say otherwise: the
/// classic "try again later" gateway/service statuses. A permanent `5xx` like `501 Not
/// Implemented` or `505 HTTP Version Not Supported` is never going to succeed on retry, so it's
/// deliberately excluded from the default.
pub const DEFAULT_RETRYABLE_SERVER_ERRORS: &[u16] = &[500, 502, 503, 504];

/// Configuration for a [`RetryClient`].
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// The base delay, `D_1`, in milliseconds.
    pub base_ms: u64,
    /// The delay cap in milliseconds; the backoff never waits longer than this.
    pub cap_ms: u64,
    /// Maximum number of attempts, including the first. A value of 1 disables retrying.
    pub max_attempts: u32,
    /// Which `5xx` status codes are considered transient and worth retrying (§4.C: "transient
    /// 5xx (subset configurable)"). A `5xx` status outside this list is treated the same as a
    /// `4xx`: surfaced immediately, no retry.
    pub retryable_server_errors: Vec<u16>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        RetryConfig {
            base_ms: 1_000,
            cap_ms: 30_000,
            max_attempts: 5,
            retryable_server_errors: DEFAULT_RETRYABLE_SERVER_ERRORS.to_vec(),
        }
    }
}

impl RetryConfig {
    /// Returns whether a [`TransportError`] is one this config considers worth retrying:
    /// network-level failures always, and a `5xx` status only if it's in
    /// [`retryable_server_errors`](Self::retryable_server_errors). `4xx` errors, redirect
    /// failures, and non-HTTPS URLs are never retried, since retrying those can't change the
    /// outcome.
    pub fn is_retryable(&self, error: &TransportError) -> bool {
        match error {
            TransportError::NetworkTimeout { .. } | TransportError::NetworkConnection { .. } | TransportError::Network { .. } => true,
            TransportError::HttpServer { status } => self.retryable_server_errors.contains(status),
            _ => false,
        }
    }
}

/// Computes the `n`th backoff delay per §4.C's formula: `D_n = min(cap, base * 2^(n-1))`,
/// multiplied by a uniform random jitter factor in `[0.5, 1.5)`.
fn backoff_delay(config: &RetryConfig, attempt: u32) -> Duration {
    let exponent = attempt.saturating_sub(1).min(32);
    let unjittered = config.base_ms.saturating_mul(1u64 << exponent).min(config.cap_ms);
    let jitter = rand::thread_rng().gen_range(0.5..1.5);
    Duration::from_millis((unjittered as f64 * jitter) as u64)
}

/// Wraps a delegate [`HttpClient`], retrying failed requests with exponential backoff and
/// jitter, up to `max_attempts` total tries (§4.C).
///
/// Holds a [`CancellationToken`] shared with the rest of the program (typically tripped by a
/// `SIGINT`/Ctrl-C handler): a pending backoff sleep races the token's
/// [`cancelled`](CancellationToken::cancelled) future, so an interrupt aborts the wait and
/// returns [`TransportError::Cancelled`] immediately rather than sleeping out the remaining
/// delay and trying again (§5's "in-flight retries to abort between attempts").
pub struct RetryClient<C> {
    delegate: C,
    config: RetryConfig,
    cancellation: CancellationToken,
}

impl<C> RetryClient<C>
where
    C: HttpClient,
{
    /// Wraps `delegate` in a retry decorator using `config`, aborting a pending backoff sleep if
    /// `cancellation` trips.
    pub fn new(delegate: C, config: RetryConfig, cancellation: CancellationToken) -> Self {
        RetryClient {
            delegate,
            config,
            cancellation,
        }
    }
}

#[async_trait]
impl<C> HttpClient for RetryClient<C>
where
    C: HttpClient,
{
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        let mut attempt = 1;
        loop {
            match self.delegate.execute(request.clone()).await {
                Ok(response) => return Ok(response),
                Err(error) if attempt < self.config.max_attempts && self.config.is_retryable(&error) => {
                    let delay = backoff_delay(&self.config, attempt);
                    log::debug!(
                        "Request to {} failed on attempt {}/{} ({}), retrying in {:?}",
                        request.url,
                        attempt,
                        self.config.max_attempts,
                        error,
                        delay
                    );

                    tokio::select! {
                        _ = tokio::time::sleep(delay) => {}
                        _ = self.cancellation.cancelled() => {
                            log::debug!("Retry of {} cancelled during backoff", request.url);
                            return Err(TransportError::Cancelled);
                        }
                    }

                    attempt += 1;
                }
                Err(error) => return Err(error),
            }
        }
    }

    async fn download_to_writer(
        &self,
        request: Request,
        writer: &mut (dyn tokio::io::AsyncWrite + Unpin + Send),
    ) -> Result<Response, TransportError> {
        // A partially written download can't be safely retried without the caller truncating the
        // destination first, so this delegates straight through rather than retrying.
        self.delegate.download_to_writer(request, writer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn config() -> RetryConfig {
        RetryConfig {
            base_ms: 1000,
            cap_ms: 30_000,
            max_attempts: 5,
            retryable_server_errors: DEFAULT_RETRYABLE_SERVER_ERRORS.to_vec(),
        }
    }

    #[test]
    fn backoff_respects_cap() {
        let config = config();
        for attempt in 1..=10 {
            let delay = backoff_delay(&config, attempt);
            assert!(delay.as_millis() <= (config.cap_ms as f64 * 1.5) as u128);
        }
    }

    #[test]
    fn backoff_grows_with_attempt_before_the_cap() {
        let config = RetryConfig {
            base_ms: 100,
            cap_ms: 100_000,
            max_attempts: 5,
            retryable_server_errors: DEFAULT_RETRYABLE_SERVER_ERRORS.to_vec(),
        };
        // jitter makes individual samples noisy, so compare the unjittered midpoints the
        // jitter factor is centered on.
        let midpoint = |attempt: u32| {
            let exponent = attempt.saturating_sub(1).min(32);
            (config.base_ms.saturating_mul(1u64 << exponent)).min(config.cap_ms) as f64
        };
        assert!(midpoint(2) > midpoint(1));
        assert!(midpoint(3) > midpoint(2));
    }

    #[test]
    fn classifies_retryable_errors() {
        let config = config();
        assert!(config.is_retryable(&TransportError::NetworkTimeout {
            host: "example.com".to_string()
        }));
        assert!(config.is_retryable(&TransportError::HttpServer { status: 503 }));
        assert!(!config.is_retryable(&TransportError::HttpClient {
            status: 404,
            api_error: None,
            api_message: None
        }));
        assert!(!config.is_retryable(&TransportError::TooManyRedirects(
            "https://example.com".to_string()
        )));
    }

    #[test]
    fn permanent_5xx_outside_the_configured_subset_is_not_retried() {
        let config = RetryConfig {
            retryable_server_errors: vec![502, 503, 504],
            ..config()
        };
        assert!(!config.is_retryable(&TransportError::HttpServer { status: 501 }));
        assert!(config.is_retryable(&TransportError::HttpServer { status: 503 }));
    }

    /// A delegate that always fails with a retryable `503`, counting how many times it was
    /// invoked.
    #[derive(Clone, Default)]
    struct AlwaysServerError {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl HttpClient for AlwaysServerError {
        async fn execute(&self, _request: Request) -> Result<Response, TransportError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(TransportError::HttpServer { status: 503 })
        }

        async fn download_to_writer(
            &self,
            _request: Request,
            _writer: &mut (dyn tokio::io::AsyncWrite + Unpin + Send),
        ) -> Result<Response, TransportError> {
            unimplemented!("not exercised by these tests")
        }
    }

    #[tokio::test]
    async fn cancellation_aborts_pending_backoff_without_a_further_attempt() {
        let calls = Arc::new(AtomicUsize::new(0));
        let delegate = AlwaysServerError { calls: calls.clone() };
        let token = CancellationToken::new();
        // Already cancelled before the first attempt even starts: the first attempt still runs
        // (cancellation only aborts the *wait* between attempts), but the backoff sleep that
        // would follow it trips the already-cancelled token instead of actually sleeping.
        token.cancel();

        let client = RetryClient::new(
            delegate,
            RetryConfig {
                base_ms: 60_000,
                cap_ms: 60_000,
                max_attempts: 5,
                retryable_server_errors: DEFAULT_RETRYABLE_SERVER_ERRORS.to_vec(),
            },
            token,
        );

        let result = client.execute(Request::get("https://example.com")).await;
        assert!(matches!(result, Err(TransportError::Cancelled)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
