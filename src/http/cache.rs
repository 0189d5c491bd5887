//! Provides [`CacheClient`], the single-flight `GET` cache decorator described in §4.D.

use super::{HttpClient, Method, Request, Response};
use crate::cache::CacheStore;
use crate::error::{StoreError, TransportError};
use crate::progress::{CacheEvents, LoggingCacheEvents};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// On-disk representation of a cached response, serialized with `serde_json` into the backing
/// [`CacheStore`] entry.
#[derive(Debug, Serialize, Deserialize)]
struct CachedEntry {
    code: u16,
    body: Vec<u8>,
    headers: std::collections::HashMap<String, String>,
    final_url: String,
}

impl From<&Response> for CachedEntry {
    fn from(response: &Response) -> Self {
        CachedEntry {
            code: response.code,
            body: response.body.clone(),
            headers: response.headers.clone(),
            final_url: response.final_url.clone(),
        }
    }
}

impl CachedEntry {
    fn into_response(self) -> Response {
        Response {
            code: self.code,
            body: self.body,
            headers: self.headers,
            final_url: self.final_url,
            from_cache: true,
        }
    }
}

/// Wraps a delegate [`HttpClient`] with a [`CacheStore`]-backed cache. Only `GET` requests that
/// succeed with a 2xx status are cached (§4.D); everything else passes straight through.
///
/// A cache miss acquires the store's per-key lock before delegating, so concurrent requests for
/// the same URL coalesce into a single network call (single-flight): the first caller in wins
/// the lock, fetches, and stores; every other caller blocks on the lock and then re-checks the
/// cache, finding the entry the winner just wrote (§4.D's double-checked locking).
pub struct CacheClient<C> {
    delegate: C,
    store: CacheStore,
    events: Arc<dyn CacheEvents>,
}

impl<C> CacheClient<C>
where
    C: HttpClient,
{
    /// Wraps `delegate` with a cache backed by `store`, logging hits and misses at `trace` level.
    pub fn new(delegate: C, store: CacheStore) -> Self {
        Self::with_events(delegate, store, Arc::new(LoggingCacheEvents))
    }

    /// Wraps `delegate` with a cache backed by `store`, publishing hit/miss notifications to
    /// `events` instead of the default logging subscriber.
    pub fn with_events(delegate: C, store: CacheStore, events: Arc<dyn CacheEvents>) -> Self {
        CacheClient { delegate, store, events }
    }

    /// Derives this request's cache key: a content hash of its method and URL. Request headers
    /// and body don't participate, since the only cacheable requests are credential-bearing
    /// `GET`s whose identity is fully captured by the URL.
    fn key_for(request: &Request) -> String {
        CacheStore::key_for(&format!("{:?} {}", request.method, request.url))
    }

    fn read_cached(&self, key: &str) -> Result<Option<Response>, StoreError> {
        match self.store.read(key)? {
            Some(bytes) => Ok(serde_json::from_slice::<CachedEntry>(&bytes).ok().map(CachedEntry::into_response)),
            None => Ok(None),
        }
    }
}

#[async_trait]
impl<C> HttpClient for CacheClient<C>
where
    C: HttpClient,
{
    async fn execute(&self, request: Request) -> Result<Response, TransportError> {
        if request.method != Method::Get {
            return self.delegate.execute(request).await;
        }

        let key = Self::key_for(&request);

        if let Some(cached) = self.read_cached(&key)? {
            self.events.hit(&request.url);
            return Ok(cached);
        }

        self.events.miss(&request.url);

        // `with_lock` is synchronous (it holds an `fs2` advisory lock across the closure), but
        // fetching on a miss is async. `block_in_place` hands this worker thread's other tasks
        // off to the runtime's other threads for the duration, so blocking here to drive the
        // fetch to completion doesn't stall the whole runtime. Requires the multi-thread runtime.
        let store = &self.store;
        let delegate = &self.delegate;
        tokio::task::block_in_place(|| {
            store.with_lock(&key, || -> Result<Response, TransportError> {
                if let Some(cached) = self.read_cached(&key)? {
                    self.events.hit(&request.url);
                    return Ok(cached);
                }

                let response = tokio::runtime::Handle::current().block_on(delegate.execute(request.clone()))?;

                if response.is_success() {
                    let entry = CachedEntry::from(&response);
                    if let Ok(bytes) = serde_json::to_vec(&entry) {
                        if let Err(e) = store.store_bytes(&key, &bytes) {
                            log::warn!("Failed to write cache entry for {}: {}", request.url, e);
                        }
                    }
                }

                Ok(response)
            })
        })
    }

    async fn download_to_writer(
        &self,
        request: Request,
        writer: &mut (dyn tokio::io::AsyncWrite + Unpin + Send),
    ) -> Result<Response, TransportError> {
        self.delegate.download_to_writer(request, writer).await
    }
}
