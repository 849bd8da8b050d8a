use std::sync::Arc;

use log::debug;
use log::info;
use log::warn;

use super::CacheEventKind;
use super::QueryClient;
use super::rules;
use crate::cache::CacheKey;
use crate::error::ApiError;
use crate::error::Error;
use crate::model::Product;
use crate::model::ProductId;
use crate::model::ProductUpdate;

impl QueryClient {
    /// Updates a product and synchronises the cache with the result.
    ///
    /// Not optimistic: the cache is only touched after the service accepts
    /// the update. Writes are never retried.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] without a network call when the
    /// fields fail local validation, and the service error otherwise. The
    /// cache is left untouched on every error path.
    pub async fn update_product(&self, id: ProductId, update: &ProductUpdate) -> Result<Arc<Product>, Error> {
        update.validate().map_err(ApiError::invalid_fields)?;

        let server = self.inner.source.update_product(id, update).await.map_err(|err| {
            warn!("updating product {} failed: {}", id, err);
            err
        })?;
        info!("updated product {}", id);

        for key in rules::apply_update(&self.inner.cache, id, &server) {
            debug!("update of product {} patched {}", id, key);
            self.emit(key, CacheEventKind::Updated);
        }

        let state = self.query_state::<Arc<Product>>(&CacheKey::Product(id));
        Ok(state.data.unwrap_or_else(|| Arc::new(server)))
    }

    /// Deletes a product and drops it from the cache.
    ///
    /// # Errors
    ///
    /// Returns the service error; the cache is left untouched.
    pub async fn delete_product(&self, id: ProductId) -> Result<(), Error> {
        self.inner.source.delete_product(id).await.map_err(|err| {
            warn!("deleting product {} failed: {}", id, err);
            err
        })?;
        info!("deleted product {}", id);

        for key in rules::apply_delete(&self.inner.cache, id) {
            debug!("delete of product {} touched {}", id, key);
            let kind = match key {
                CacheKey::Product(_) => CacheEventKind::Removed,
                _ => CacheEventKind::Updated,
            };
            self.emit(key, kind);
        }
        self.inner.failures.remove(&CacheKey::Product(id));

        Ok(())
    }
}
