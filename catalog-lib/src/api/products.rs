//! Product endpoints

use reqwest::Method;

use super::decode::decode_json;
use super::decode::is_empty_body;
use super::decode::is_success;
use super::decode::read_body;
use super::decode::read_error;
use super::decode::write_error;
use crate::CatalogClient;
use crate::error::ApiError;
use crate::model::Product;
use crate::model::ProductId;
use crate::model::ProductUpdate;

impl CatalogClient {
    /// Lists all products, in service order.
    ///
    /// # Errors
    ///
    /// [`ApiError::Network`] / [`ApiError::Timeout`] without a response,
    /// [`ApiError::Http`] on a non-success status, [`ApiError::Parse`] if a
    /// product does not match the schema.
    pub async fn list_products(&self) -> Result<Vec<Product>, ApiError> {
        let response = self.send(self.request(Method::GET, "products")).await?;
        let (status, body) = read_body(response).await?;

        if !is_success(status) {
            return Err(read_error(status, body, "products"));
        }

        let products: Vec<Product> = decode_json(&body, "product list")?;
        for product in &products {
            product.validate()?;
        }
        Ok(products)
    }

    /// Fetches a single product.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if the service has no such id, otherwise as
    /// [`CatalogClient::list_products`].
    pub async fn get_product(&self, id: ProductId) -> Result<Product, ApiError> {
        let resource = format!("product {}", id);
        let response = self
            .send(self.request(Method::GET, &format!("products/{}", id)))
            .await?;
        let (status, body) = read_body(response).await?;

        if !is_success(status) {
            return Err(read_error(status, body, &resource));
        }
        if is_empty_body(&body) {
            return Err(ApiError::not_found(resource));
        }

        let product: Product = decode_json(&body, &resource)?;
        product.validate()?;
        Ok(product)
    }

    /// Replaces the editable fields of a product.
    ///
    /// The payload is validated locally first; an invalid payload never
    /// reaches the network. Any non-success status is an error, there is no
    /// partial success.
    ///
    /// # Errors
    ///
    /// [`ApiError::Validation`] if the payload is rejected locally or by the
    /// service, [`ApiError::NotFound`] on `404`, otherwise
    /// [`ApiError::Http`] / [`ApiError::Network`].
    pub async fn update_product(&self, id: ProductId, update: &ProductUpdate) -> Result<Product, ApiError> {
        update.validate().map_err(ApiError::invalid_fields)?;

        let resource = format!("product {}", id);
        let request = self
            .request(Method::PUT, &format!("products/{}", id))
            .json(update);
        let response = self.send(request).await?;
        let (status, body) = read_body(response).await?;

        if !is_success(status) {
            return Err(write_error(status, body, &resource));
        }

        let product: Product = decode_json(&body, &resource)?;
        product.validate()?;
        Ok(product)
    }

    /// Deletes a product.
    ///
    /// # Errors
    ///
    /// [`ApiError::NotFound`] if the service has no such id, otherwise
    /// [`ApiError::Http`] / [`ApiError::Network`].
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ApiError> {
        let resource = format!("product {}", id);
        let response = self
            .send(self.request(Method::DELETE, &format!("products/{}", id)))
            .await?;
        let (status, body) = read_body(response).await?;

        if !is_success(status) {
            return Err(write_error(status, body, &resource));
        }
        if status != 204 && is_empty_body(&body) {
            return Err(ApiError::not_found(resource));
        }
        Ok(())
    }
}
