//! Remote product service operations
//!
//! Five request/response calls against the product REST API. The
//! [`ProductSource`] trait is the seam the query client talks to, so the
//! cache can be driven by any implementation (the HTTP client in
//! production, scripted sources in tests).

mod categories;
mod decode;
mod products;

use async_trait::async_trait;

use crate::CatalogClient;
use crate::error::ApiError;
use crate::model::Category;
use crate::model::Product;
use crate::model::ProductId;
use crate::model::ProductUpdate;

/// The operations the query client needs from the product service.
///
/// Implementations hold no state and perform exactly one round trip per
/// call. Retries are the caller's concern.
#[async_trait]
pub trait ProductSource: Send + Sync {
    /// `GET /products`
    async fn list_products(&self) -> Result<Vec<Product>, ApiError>;

    /// `GET /products/{id}`
    async fn get_product(&self, id: ProductId) -> Result<Product, ApiError>;

    /// `GET /products/categories`
    async fn list_categories(&self) -> Result<Vec<Category>, ApiError>;

    /// `PUT /products/{id}`, returning the server's representation.
    async fn update_product(&self, id: ProductId, update: &ProductUpdate) -> Result<Product, ApiError>;

    /// `DELETE /products/{id}`
    async fn delete_product(&self, id: ProductId) -> Result<(), ApiError>;
}

#[async_trait]
impl ProductSource for CatalogClient {
    async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        CatalogClient::list_products(self).await
    }

    async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        CatalogClient::get_product(self, id).await
    }

    async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        CatalogClient::list_categories(self).await
    }

    async fn update_product(&self, id: ProductId, update: &ProductUpdate) -> Result<Product, ApiError> {
        CatalogClient::update_product(self, id, update).await
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), ApiError> {
        CatalogClient::delete_product(self, id).await
    }
}
