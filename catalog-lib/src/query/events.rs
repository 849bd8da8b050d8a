use chrono::DateTime;
use chrono::Utc;

use crate::cache::CacheKey;
use crate::error::ApiError;

/// Environment changes that trigger revalidation of stale entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    /// The application window regained focus.
    FocusGained,
    /// Network connectivity came back.
    Reconnected,
}

/// A change to one cache key, broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEvent {
    pub key: CacheKey,
    pub kind: CacheEventKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheEventKind {
    /// A request for the key started.
    Fetching,
    /// New data was stored, by a fetch or a mutation.
    Updated,
    /// The entry was dropped.
    Removed,
    /// The entry was marked stale.
    Invalidated,
    /// A fetch failed; any cached data is kept.
    Failed,
}

/// Everything a consumer needs to render one key.
#[derive(Debug, Clone)]
pub struct QueryState<T> {
    /// Last known value, if any.
    pub data: Option<T>,
    /// Error of the most recent failed fetch, cleared on success.
    pub error: Option<ApiError>,
    /// `true` when there is no data or it is past its stale time.
    pub is_stale: bool,
    pub is_fetching: bool,
    pub updated_at: Option<DateTime<Utc>>,
}

impl<T> QueryState<T> {
    /// Nothing to show yet and a request is running.
    pub fn is_loading(&self) -> bool {
        self.data.is_none() && self.is_fetching
    }

    /// The last fetch failed and there is nothing cached to fall back to.
    pub fn is_error(&self) -> bool {
        self.data.is_none() && self.error.is_some()
    }
}
