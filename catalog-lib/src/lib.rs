//! Product catalog client library
//!
//! An async client for a product catalog REST service with a query cache
//! in front of it: stale-while-revalidate reads, request deduplication and
//! cache-synchronising writes.
//!
//! ```ignore
//! use catalog_lib::{CatalogClient, DEFAULT_BASE_URL};
//! use catalog_lib::query::QueryClient;
//!
//! let client = CatalogClient::builder().url(DEFAULT_BASE_URL).build()?;
//! let queries = QueryClient::new(client);
//! let products = queries.products().await?;
//! ```

pub mod api;
pub mod cache;
pub mod error;
pub mod model;
pub mod query;
pub mod response;
pub mod retry;
pub mod session;
pub mod view;

mod client;

pub use client::*;
pub use query::QueryClient;
pub use response::CacheStatus;
pub use response::Response;
