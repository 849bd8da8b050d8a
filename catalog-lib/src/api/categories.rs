//! Category endpoint

use reqwest::Method;

use super::decode::decode_json;
use super::decode::is_success;
use super::decode::read_body;
use super::decode::read_error;
use crate::CatalogClient;
use crate::error::ApiError;
use crate::model::Category;

impl CatalogClient {
    /// Lists the category labels known to the service.
    pub async fn list_categories(&self) -> Result<Vec<Category>, ApiError> {
        let response = self
            .send(self.request(Method::GET, "products/categories"))
            .await?;
        let (status, body) = read_body(response).await?;

        if !is_success(status) {
            return Err(read_error(status, body, "categories"));
        }

        decode_json(&body, "category list")
    }
}
