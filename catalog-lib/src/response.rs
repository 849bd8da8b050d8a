//! Response wrapper with cache status

use chrono::DateTime;
use chrono::Utc;

/// A read result that carries where the data came from.
///
/// Every query (product list, single product, categories) returns this
/// wrapper so callers can tell fresh network data from cached or stale data.
///
/// # Example
///
/// ```ignore
/// let response = queries.product(ProductId(3)).await?;
///
/// if response.is_stale() {
///     println!("showing data cached at {:?}, refreshing", response.cached_at());
/// }
///
/// let product = response.into_inner();
/// ```
#[derive(Debug, Clone)]
pub struct Response<T> {
    data: T,
    /// Information about whether this response came from cache.
    pub cache: CacheStatus,
}

impl<T> Response<T> {
    /// Creates a new response with no cache involvement.
    pub fn new(data: T) -> Self {
        Self {
            data,
            cache: CacheStatus::None,
        }
    }

    /// Creates a new response indicating a cache miss (fresh fetch, now cached).
    pub fn cache_miss(data: T, cached_at: DateTime<Utc>) -> Self {
        Self {
            data,
            cache: CacheStatus::Miss { cached_at },
        }
    }

    /// Creates a new response indicating a fresh cache hit.
    pub fn cache_hit(data: T, cached_at: DateTime<Utc>) -> Self {
        Self {
            data,
            cache: CacheStatus::Hit { cached_at },
        }
    }

    /// Creates a new response served from a stale entry.
    pub fn stale(data: T, cached_at: DateTime<Utc>, revalidating: bool) -> Self {
        Self {
            data,
            cache: CacheStatus::Stale {
                cached_at,
                revalidating,
            },
        }
    }

    /// Returns `true` if this response came from the cache, fresh or stale.
    pub fn is_cached(&self) -> bool {
        matches!(self.cache, CacheStatus::Hit { .. } | CacheStatus::Stale { .. })
    }

    /// Returns `true` if this was a fresh fetch (cache miss or cache disabled).
    pub fn is_fresh(&self) -> bool {
        !self.is_cached()
    }

    /// Returns `true` if the data was served from a stale entry.
    pub fn is_stale(&self) -> bool {
        matches!(self.cache, CacheStatus::Stale { .. })
    }

    /// Returns when the data was cached, if applicable.
    pub fn cached_at(&self) -> Option<DateTime<Utc>> {
        match &self.cache {
            CacheStatus::None => None,
            CacheStatus::Miss { cached_at }
            | CacheStatus::Hit { cached_at }
            | CacheStatus::Stale { cached_at, .. } => Some(*cached_at),
        }
    }

    /// Returns a reference to the inner data.
    pub fn data(&self) -> &T {
        &self.data
    }

    /// Consumes the response and returns the inner data.
    pub fn into_inner(self) -> T {
        self.data
    }

    /// Maps the inner data using the provided function.
    pub fn map<U, F: FnOnce(T) -> U>(self, f: F) -> Response<U> {
        Response {
            data: f(self.data),
            cache: self.cache,
        }
    }
}

/// Cache status for a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    /// The response was not stored (the write was superseded by a newer value).
    None,
    /// Cache miss - data was freshly fetched and is now cached.
    Miss {
        /// When the data was cached.
        cached_at: DateTime<Utc>,
    },
    /// Fresh cache hit, no network call was made.
    Hit {
        /// When the data was cached.
        cached_at: DateTime<Utc>,
    },
    /// Stale cache hit.
    Stale {
        /// When the data was cached.
        cached_at: DateTime<Utc>,
        /// Whether a background revalidation is in flight.
        revalidating: bool,
    },
}

impl CacheStatus {
    /// Returns `true` if this is a fresh cache hit.
    pub fn is_hit(&self) -> bool {
        matches!(self, Self::Hit { .. })
    }

    /// Returns `true` if this is a cache miss.
    pub fn is_miss(&self) -> bool {
        matches!(self, Self::Miss { .. })
    }

    /// Returns `true` if stale data was served.
    pub fn is_stale(&self) -> bool {
        matches!(self, Self::Stale { .. })
    }

    /// Returns `true` if caching was not involved.
    pub fn is_none(&self) -> bool {
        matches!(self, Self::None)
    }
}
