//! Query cache storage
//!
//! Holds the last known result of every read, keyed by operation and
//! parameters. The cache itself only stores and evicts; freshness decisions
//! and network coordination live in [`crate::query`].

mod config;
mod memory;

pub use config::*;
pub use memory::*;

use std::sync::Arc;

use chrono::DateTime;
use chrono::Utc;
use tokio::time::Instant;

use crate::model::Category;
use crate::model::Product;
use crate::model::ProductId;

/// Identifies a distinct fetchable resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CacheKey {
    /// `GET /products`
    Products,
    /// `GET /products/{id}`
    Product(ProductId),
    /// `GET /products/categories`
    Categories,
}

impl CacheKey {
    /// The operation name part of the key.
    pub fn operation(&self) -> &'static str {
        match self {
            Self::Products => "products",
            Self::Product(_) => "product",
            Self::Categories => "categories",
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Product(id) => write!(f, "product:{}", id),
            other => f.write_str(other.operation()),
        }
    }
}

/// A cached query result.
#[derive(Debug, Clone, PartialEq)]
pub enum CachedData {
    Products(Arc<Vec<Product>>),
    Product(Arc<Product>),
    Categories(Arc<Vec<Category>>),
}

/// Typed access to [`CachedData`].
pub trait QueryData: Clone + Send + Sync + 'static {
    /// Extracts the typed value, or `None` if the variant does not match.
    fn from_cached(data: &CachedData) -> Option<Self>;
}

impl QueryData for Arc<Vec<Product>> {
    fn from_cached(data: &CachedData) -> Option<Self> {
        match data {
            CachedData::Products(products) => Some(products.clone()),
            _ => None,
        }
    }
}

impl QueryData for Arc<Product> {
    fn from_cached(data: &CachedData) -> Option<Self> {
        match data {
            CachedData::Product(product) => Some(product.clone()),
            _ => None,
        }
    }
}

impl QueryData for Arc<Vec<Category>> {
    fn from_cached(data: &CachedData) -> Option<Self> {
        match data {
            CachedData::Categories(categories) => Some(categories.clone()),
            _ => None,
        }
    }
}

/// A cached value with the metadata needed for stale-while-revalidate.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    /// The cached data.
    pub data: CachedData,
    /// Wall-clock time the data was stored, for display.
    pub cached_at: DateTime<Utc>,
    updated_at: Instant,
    evict_at: Instant,
    invalidated: bool,
}

impl CacheEntry {
    fn new(data: CachedData, now: Instant, gc_time: std::time::Duration) -> Self {
        Self {
            data,
            cached_at: Utc::now(),
            updated_at: now,
            evict_at: now + gc_time,
            invalidated: false,
        }
    }

    /// Returns `true` if the entry needs revalidation at `now`.
    pub fn is_stale(&self, now: Instant, stale_time: std::time::Duration) -> bool {
        self.invalidated || now.saturating_duration_since(self.updated_at) >= stale_time
    }

    /// Returns `true` if the entry was explicitly marked stale.
    pub fn is_invalidated(&self) -> bool {
        self.invalidated
    }

    /// Returns `true` if the entry is past its eviction deadline.
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.evict_at
    }

    /// Monotonic time of the last write.
    pub fn updated_at(&self) -> Instant {
        self.updated_at
    }
}
