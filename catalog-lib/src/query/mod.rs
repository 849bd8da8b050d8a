//! Query client: cached reads and cache-synchronising writes
//!
//! Reads are served stale-while-revalidate from the [`QueryCache`]:
//!
//! - fresh entry: returned immediately, no network call,
//! - stale entry: returned immediately, one background revalidation starts,
//! - no entry: fetched, the caller waits for the result.
//!
//! At most one request per [`CacheKey`] is in flight at a time; concurrent
//! callers share its result. Writes go to the service first and only touch
//! the cache after a successful response (see [`rules`]).

mod events;
mod mutation;
pub mod rules;

pub use events::*;

use std::sync::Arc;
use std::time::Duration;

use chrono::DateTime;
use chrono::Utc;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::FutureExt;
use futures::future::BoxFuture;
use futures::future::Shared;
use log::debug;
use log::warn;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::Response;
use crate::api::ProductSource;
use crate::cache::CacheConfig;
use crate::cache::CacheKey;
use crate::cache::CachedData;
use crate::cache::QueryCache;
use crate::cache::QueryData;
use crate::error::ApiError;
use crate::error::Error;
use crate::model::Category;
use crate::model::Product;
use crate::model::ProductId;
use crate::retry::RetryConfig;

/// Result of one (possibly retried) fetch, shared by every waiter.
#[derive(Debug, Clone)]
struct Fetched {
    data: CachedData,
    /// When the result was stored, `None` if it was superseded and dropped.
    stored_at: Option<DateTime<Utc>>,
}

type InFlight = Shared<BoxFuture<'static, Result<Fetched, ApiError>>>;

/// Cached, deduplicated access to the product service.
///
/// Owns the query cache for the lifetime of the application session. Cheap
/// to clone; clones share the same cache.
///
/// # Example
///
/// ```ignore
/// use catalog_lib::{CatalogClient, QueryClient, DEFAULT_BASE_URL};
///
/// let client = CatalogClient::builder().url(DEFAULT_BASE_URL).build()?;
/// let queries = QueryClient::new(client);
///
/// let products = queries.products().await?;
/// println!("{} products ({:?})", products.data().len(), products.cache);
/// ```
#[derive(Clone)]
pub struct QueryClient {
    inner: Arc<QueryClientInner>,
}

struct QueryClientInner {
    source: Arc<dyn ProductSource>,
    cache: QueryCache,
    config: CacheConfig,
    retry: RetryConfig,
    in_flight: DashMap<CacheKey, InFlight>,
    /// Last failure per key, cleared by the next successful fetch.
    failures: DashMap<CacheKey, ApiError>,
    events: broadcast::Sender<CacheEvent>,
}

impl QueryClient {
    /// Creates a query client with default cache and retry settings.
    pub fn new(source: impl ProductSource + 'static) -> Self {
        Self::builder(source).build()
    }

    /// Creates a builder for a query client over `source`.
    pub fn builder(source: impl ProductSource + 'static) -> QueryClientBuilder {
        QueryClientBuilder::new(Arc::new(source))
    }

    /// Returns the underlying cache.
    pub fn cache(&self) -> &QueryCache {
        &self.inner.cache
    }

    /// Returns the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.inner.config
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Reads the product list.
    pub async fn products(&self) -> Result<Response<Arc<Vec<Product>>>, Error> {
        self.query(CacheKey::Products).await
    }

    /// Reads a single product.
    pub async fn product(&self, id: ProductId) -> Result<Response<Arc<Product>>, Error> {
        self.query(CacheKey::Product(id)).await
    }

    /// Reads the category list.
    pub async fn categories(&self) -> Result<Response<Arc<Vec<Category>>>, Error> {
        self.query(CacheKey::Categories).await
    }

    /// Reads a key, stale-while-revalidate.
    pub async fn query<T: QueryData>(&self, key: CacheKey) -> Result<Response<T>, Error> {
        if let Some(entry) = self.inner.cache.get(&key) {
            match T::from_cached(&entry.data) {
                Some(data) if !entry.is_stale(Instant::now(), self.inner.config.stale_time) => {
                    debug!("cache hit for {}", key);
                    return Ok(Response::cache_hit(data, entry.cached_at));
                }
                Some(data) => {
                    debug!("stale cache hit for {}, revalidating", key);
                    self.revalidate(&key);
                    return Ok(Response::stale(data, entry.cached_at, true));
                }
                None => warn!("cache entry for {} holds unexpected data, refetching", key),
            }
        }

        debug!("cache miss for {}", key);
        self.await_fetch(&key).await
    }

    /// Fetches a key from the network regardless of freshness.
    ///
    /// Joins the in-flight request for the key if there is one.
    pub async fn refetch<T: QueryData>(&self, key: CacheKey) -> Result<Response<T>, Error> {
        self.await_fetch(&key).await
    }

    /// Manual retry of the product list.
    pub async fn refetch_products(&self) -> Result<Response<Arc<Vec<Product>>>, Error> {
        self.refetch(CacheKey::Products).await
    }

    /// Starts a background revalidation of `key`.
    ///
    /// Returns `false` if a request for the key was already in flight and
    /// was joined instead.
    pub fn revalidate(&self, key: &CacheKey) -> bool {
        self.start_fetch(key).1
    }

    /// Starts a background revalidation of every stale entry.
    ///
    /// Returns the number of keys being revalidated.
    pub fn revalidate_stale(&self) -> usize {
        let now = Instant::now();
        let stale_time = self.inner.config.stale_time;
        self.inner
            .cache
            .keys()
            .into_iter()
            .filter(|key| {
                self.inner
                    .cache
                    .peek(key)
                    .is_some_and(|entry| entry.is_stale(now, stale_time))
            })
            .map(|key| self.start_fetch(&key))
            .count()
    }

    /// Reacts to focus and connectivity changes.
    ///
    /// Returns the number of keys being revalidated, zero when the matching
    /// `refetch_on_*` setting is off.
    pub fn handle_event(&self, event: LifecycleEvent) -> usize {
        let enabled = match event {
            LifecycleEvent::FocusGained => self.inner.config.refetch_on_focus,
            LifecycleEvent::Reconnected => self.inner.config.refetch_on_reconnect,
        };
        if !enabled {
            return 0;
        }
        debug!("{:?}: revalidating stale entries", event);
        self.revalidate_stale()
    }

    /// Returns `true` if a request for `key` is in flight.
    pub fn is_fetching(&self, key: &CacheKey) -> bool {
        self.inner.in_flight.contains_key(key)
    }

    // =========================================================================
    // Cache management
    // =========================================================================

    /// Marks an entry stale so the next read revalidates it.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let found = self.inner.cache.invalidate(key);
        if found {
            self.emit(key.clone(), CacheEventKind::Invalidated);
        }
        found
    }

    /// Drops an entry; the next read is a cache miss.
    pub fn remove(&self, key: &CacheKey) -> bool {
        let found = self.inner.cache.remove(key).is_some();
        self.inner.failures.remove(key);
        if found {
            self.emit(key.clone(), CacheEventKind::Removed);
        }
        found
    }

    /// Drops every entry.
    pub fn clear(&self) {
        for key in self.inner.cache.keys() {
            self.remove(&key);
        }
        self.inner.failures.clear();
    }

    /// Evicts entries past their eviction deadline.
    ///
    /// Returns the number of entries removed.
    pub fn gc(&self) -> usize {
        self.inner.cache.gc()
    }

    /// Runs [`QueryClient::gc`] every `interval` until `cancel` fires.
    pub fn spawn_gc(&self, interval: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {
                        let removed = client.gc();
                        if removed > 0 {
                            debug!("evicted {} cache entries", removed);
                        }
                    }
                }
            }
        })
    }

    // =========================================================================
    // Observation
    // =========================================================================

    /// Subscribes to change notifications for every key.
    pub fn subscribe(&self) -> broadcast::Receiver<CacheEvent> {
        self.inner.events.subscribe()
    }

    /// Snapshot of everything a consumer needs to render `key`.
    pub fn query_state<T: QueryData>(&self, key: &CacheKey) -> QueryState<T> {
        let entry = self.inner.cache.peek(key);
        let is_stale = entry
            .as_ref()
            .is_none_or(|e| e.is_stale(Instant::now(), self.inner.config.stale_time));

        QueryState {
            data: entry.as_ref().and_then(|e| T::from_cached(&e.data)),
            error: self.inner.failures.get(key).map(|e| e.clone()),
            is_stale,
            is_fetching: self.is_fetching(key),
            updated_at: entry.map(|e| e.cached_at),
        }
    }

    /// Streams a fresh [`QueryState`] for `key` whenever it changes.
    ///
    /// The current state is yielded first.
    pub fn watch<T: QueryData>(&self, key: CacheKey) -> impl futures::Stream<Item = QueryState<T>> + Send + 'static {
        let client = self.clone();
        let mut events = self.subscribe();
        async_stream::stream! {
            yield client.query_state::<T>(&key);
            loop {
                match events.recv().await {
                    Ok(event) if event.key == key => yield client.query_state::<T>(&key),
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(_)) => yield client.query_state::<T>(&key),
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    // =========================================================================
    // Fetch coordination
    // =========================================================================

    async fn await_fetch<T: QueryData>(&self, key: &CacheKey) -> Result<Response<T>, Error> {
        let (fetch, _) = self.start_fetch(key);
        let fetched = fetch.await?;
        let data = T::from_cached(&fetched.data)
            .ok_or_else(|| ApiError::parse(format!("unexpected data fetched for {}", key)))?;
        Ok(match fetched.stored_at {
            Some(cached_at) => Response::cache_miss(data, cached_at),
            None => Response::new(data),
        })
    }

    /// Returns the in-flight request for `key`, starting one if needed.
    ///
    /// The request runs on its own task, so it completes even if every
    /// caller stops waiting. The flag is `true` if a new request was started.
    fn start_fetch(&self, key: &CacheKey) -> (InFlight, bool) {
        let fetch = match self.inner.in_flight.entry(key.clone()) {
            Entry::Occupied(existing) => {
                debug!("joining in-flight request for {}", key);
                return (existing.get().clone(), false);
            }
            Entry::Vacant(slot) => {
                let version = self.inner.cache.version(key);
                let fetch = self
                    .clone()
                    .run_fetch(key.clone(), version)
                    .boxed()
                    .shared();
                slot.insert(fetch.clone());
                fetch
            }
        };
        self.emit(key.clone(), CacheEventKind::Fetching);
        tokio::spawn(fetch.clone());
        (fetch, true)
    }

    async fn run_fetch(self, key: CacheKey, version: u64) -> Result<Fetched, ApiError> {
        let outcome = match self.fetch_with_retry(&key).await {
            Ok(data) => {
                self.inner.failures.remove(&key);
                let stored = self.inner.cache.set_if_version(&key, data.clone(), version);
                if !stored {
                    debug!("discarding superseded response for {}", key);
                }
                Ok(Fetched {
                    data,
                    stored_at: stored.then(Utc::now),
                })
            }
            Err(err) => {
                warn!("fetching {} failed: {}", key, err);
                self.inner.failures.insert(key.clone(), err.clone());
                Err(err)
            }
        };

        self.inner.in_flight.remove(&key);
        let kind = match &outcome {
            Ok(_) => CacheEventKind::Updated,
            Err(_) => CacheEventKind::Failed,
        };
        self.emit(key, kind);
        outcome
    }

    async fn fetch_with_retry(&self, key: &CacheKey) -> Result<CachedData, ApiError> {
        let mut attempt = 0;
        loop {
            match self.fetch_once(key).await {
                Ok(data) => return Ok(data),
                Err(err) if self.inner.retry.should_retry(&err, attempt) => {
                    let delay = self.inner.retry.delay_for(attempt);
                    warn!("fetching {} failed ({}), retrying in {:?}", key, err, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn fetch_once(&self, key: &CacheKey) -> Result<CachedData, ApiError> {
        let source = &self.inner.source;
        Ok(match key {
            CacheKey::Products => CachedData::Products(Arc::new(source.list_products().await?)),
            CacheKey::Product(id) => CachedData::Product(Arc::new(source.get_product(*id).await?)),
            CacheKey::Categories => CachedData::Categories(Arc::new(source.list_categories().await?)),
        })
    }

    fn emit(&self, key: CacheKey, kind: CacheEventKind) {
        // No receivers is fine.
        let _ = self.inner.events.send(CacheEvent { key, kind });
    }
}

impl std::fmt::Debug for QueryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryClient")
            .field("entries", &self.inner.cache.len())
            .field("in_flight", &self.inner.in_flight.len())
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Builder for [`QueryClient`].
pub struct QueryClientBuilder {
    source: Arc<dyn ProductSource>,
    config: CacheConfig,
    retry: RetryConfig,
    event_capacity: usize,
}

impl QueryClientBuilder {
    fn new(source: Arc<dyn ProductSource>) -> Self {
        Self {
            source,
            config: CacheConfig::default(),
            retry: RetryConfig::default(),
            event_capacity: 64,
        }
    }

    /// Sets the cache configuration.
    pub fn cache_config(mut self, config: CacheConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the retry configuration for reads.
    pub fn retry_config(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Sets how many change events a slow subscriber may fall behind.
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(1);
        self
    }

    /// Builds the [`QueryClient`].
    pub fn build(self) -> QueryClient {
        let (events, _) = broadcast::channel(self.event_capacity);
        QueryClient {
            inner: Arc::new(QueryClientInner {
                source: self.source,
                cache: QueryCache::new(self.config.gc_time),
                config: self.config,
                retry: self.retry,
                in_flight: DashMap::new(),
                failures: DashMap::new(),
                events,
            }),
        }
    }
}
