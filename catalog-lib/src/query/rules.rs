//! Cache rules applied after a successful mutation
//!
//! Each rule is a plain function over the [`QueryCache`] so it can be tested
//! without a network source. Rules only run once the service has accepted the
//! mutation; a failed mutation never reaches them.

use std::sync::Arc;

use crate::cache::CacheKey;
use crate::cache::CachedData;
use crate::cache::QueryCache;
use crate::model::Product;
use crate::model::ProductId;

/// Update rule: patch, then mark stale.
///
/// - the single-product entry becomes the server representation merged onto
///   the prior value (the product entry, else the list element),
/// - the matching list element is patched in place,
/// - both entries are marked stale for background reconciliation.
///
/// Returns the keys that were touched.
pub fn apply_update(cache: &QueryCache, id: ProductId, server: &Product) -> Vec<CacheKey> {
    let product_key = CacheKey::Product(id);
    let prior = cache
        .peek(&product_key)
        .and_then(|entry| match entry.data {
            CachedData::Product(product) => Some(product),
            _ => None,
        })
        .or_else(|| find_in_list(cache, id).map(Arc::new));

    let merged = match prior {
        Some(prior) => prior.merged(server),
        None => Product {
            id,
            ..server.clone()
        },
    };

    let mut touched = Vec::with_capacity(2);

    cache.set(&product_key, CachedData::Product(Arc::new(merged.clone())));
    cache.invalidate(&product_key);
    touched.push(product_key);

    let patched = cache.update(&CacheKey::Products, |data| {
        if let CachedData::Products(products) = data
            && let Some(existing) = Arc::make_mut(products).iter_mut().find(|p| p.id == id)
        {
            existing.merge(&merged);
        }
    });
    if patched {
        cache.invalidate(&CacheKey::Products);
        touched.push(CacheKey::Products);
    }

    touched
}

/// Delete rule: remove, then mark stale.
///
/// - the element is dropped from the list entry,
/// - the single-product entry is removed so the next read is a miss,
/// - the list entry is marked stale for background reconciliation.
///
/// Returns the keys that were touched.
pub fn apply_delete(cache: &QueryCache, id: ProductId) -> Vec<CacheKey> {
    let mut touched = Vec::with_capacity(2);

    let product_key = CacheKey::Product(id);
    if cache.remove(&product_key).is_some() {
        touched.push(product_key);
    }

    let patched = cache.update(&CacheKey::Products, |data| {
        if let CachedData::Products(products) = data {
            Arc::make_mut(products).retain(|p| p.id != id);
        }
    });
    if patched {
        cache.invalidate(&CacheKey::Products);
        touched.push(CacheKey::Products);
    }

    touched
}

fn find_in_list(cache: &QueryCache, id: ProductId) -> Option<Product> {
    match cache.peek(&CacheKey::Products)?.data {
        CachedData::Products(products) => products.iter().find(|p| p.id == id).cloned(),
        _ => None,
    }
}
