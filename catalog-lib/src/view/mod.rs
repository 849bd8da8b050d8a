//! Catalog view-model
//!
//! Front-end independent state of the product grid and its dialogs. A front
//! end renders from the accessors and forwards user actions to the methods;
//! all data access goes through the [`QueryClient`].

mod filter;
mod form;
mod format;

pub use filter::*;
pub use form::*;
pub use format::*;

use std::sync::Arc;

use log::debug;

use crate::cache::CacheKey;
use crate::error::Error;
use crate::model::Category;
use crate::model::Product;
use crate::model::ProductId;
use crate::query::QueryClient;

/// Modal dialog over the product grid.
#[derive(Debug, Clone, Default)]
pub enum Dialog {
    #[default]
    Closed,
    /// Product details; `product` is `None` while loading or after an error.
    Detail {
        id: ProductId,
        product: Option<Arc<Product>>,
        error: Option<Error>,
    },
    Editing {
        id: ProductId,
        form: EditForm,
        error: Option<Error>,
    },
    ConfirmDelete {
        id: ProductId,
        title: Option<String>,
        error: Option<Error>,
    },
}

impl Dialog {
    /// Product the dialog is open for.
    pub fn product_id(&self) -> Option<ProductId> {
        match self {
            Self::Closed => None,
            Self::Detail { id, .. } | Self::Editing { id, .. } | Self::ConfirmDelete { id, .. } => Some(*id),
        }
    }

    pub fn error(&self) -> Option<&Error> {
        match self {
            Self::Closed => None,
            Self::Detail { error, .. } | Self::Editing { error, .. } | Self::ConfirmDelete { error, .. } => {
                error.as_ref()
            }
        }
    }

    pub fn is_open(&self) -> bool {
        !matches!(self, Self::Closed)
    }
}

/// State of the product grid and its dialogs.
#[derive(Debug)]
pub struct CatalogView {
    queries: QueryClient,
    products: Option<Arc<Vec<Product>>>,
    categories: Option<Arc<Vec<Category>>>,
    error: Option<Error>,
    search: String,
    category: CategoryFilter,
    dialog: Dialog,
    notice: Option<String>,
}

impl CatalogView {
    pub fn new(queries: QueryClient) -> Self {
        Self {
            queries,
            products: None,
            categories: None,
            error: None,
            search: String::new(),
            category: CategoryFilter::All,
            dialog: Dialog::Closed,
            notice: None,
        }
    }

    pub fn queries(&self) -> &QueryClient {
        &self.queries
    }

    // =========================================================================
    // Grid
    // =========================================================================

    /// Reads the product list and categories through the cache.
    ///
    /// A failed read keeps whatever was shown before and records the error.
    pub async fn load(&mut self) -> Result<(), Error> {
        let products = self.queries.products().await;
        self.apply_products(products.map(|r| r.into_inner()))?;

        match self.queries.categories().await {
            Ok(categories) => self.categories = Some(categories.into_inner()),
            // The filter falls back to categories seen in the product list.
            Err(err) => debug!("category list unavailable: {}", err),
        }
        Ok(())
    }

    /// Manual "try again": refetches the product list from the network.
    pub async fn retry(&mut self) -> Result<(), Error> {
        let products = self.queries.refetch_products().await;
        self.apply_products(products.map(|r| r.into_inner()))
    }

    /// Picks up background revalidations that finished since the last read.
    ///
    /// Returns `true` if anything shown by the grid changed.
    pub fn sync(&mut self) -> bool {
        let state = self.queries.query_state::<Arc<Vec<Product>>>(&CacheKey::Products);
        let mut changed = false;
        if let Some(products) = state.data
            && self.products.as_ref().is_none_or(|shown| !Arc::ptr_eq(shown, &products))
        {
            self.products = Some(products);
            changed = true;
        }
        // Mirrors the query client: a later successful fetch clears the list error.
        let error = state.error.map(Error::from);
        if self.error.is_some() != error.is_some() {
            changed = true;
        }
        self.error = error;
        if let Some(categories) = self
            .queries
            .query_state::<Arc<Vec<Category>>>(&CacheKey::Categories)
            .data
        {
            self.categories = Some(categories);
        }
        changed
    }

    fn apply_products(&mut self, result: Result<Arc<Vec<Product>>, Error>) -> Result<(), Error> {
        match result {
            Ok(products) => {
                self.products = Some(products);
                self.error = None;
                Ok(())
            }
            Err(err) => {
                self.error = Some(err.clone());
                Err(err)
            }
        }
    }

    /// All products, unfiltered. `None` until the first successful load.
    pub fn products(&self) -> Option<&[Product]> {
        self.products.as_deref().map(Vec::as_slice)
    }

    /// Error of the last failed list read.
    pub fn error(&self) -> Option<&Error> {
        self.error.as_ref()
    }

    /// Categories for the filter selector.
    pub fn categories(&self) -> Vec<Category> {
        match &self.categories {
            Some(categories) => categories.as_ref().clone(),
            None => {
                let mut seen: Vec<Category> = self
                    .products()
                    .unwrap_or_default()
                    .iter()
                    .map(|p| p.category.clone())
                    .collect();
                seen.sort();
                seen.dedup();
                seen
            }
        }
    }

    /// Products matching the current search and category filter.
    pub fn visible_products(&self) -> Vec<&Product> {
        filter_products(self.products().unwrap_or_default(), &self.search, &self.category)
    }

    /// `(shown, total)` product counts.
    pub fn counts(&self) -> (usize, usize) {
        let total = self.products().map_or(0, <[Product]>::len);
        (self.visible_products().len(), total)
    }

    /// Result counter line, e.g. `Showing 3 of 20 products`.
    pub fn summary(&self) -> String {
        let (shown, total) = self.counts();
        format!("Showing {} of {} products", shown, total)
    }

    pub fn search(&self) -> &str {
        &self.search
    }

    pub fn set_search(&mut self, search: impl Into<String>) {
        self.search = search.into();
    }

    pub fn category(&self) -> &CategoryFilter {
        &self.category
    }

    pub fn set_category(&mut self, category: CategoryFilter) {
        self.category = category;
    }

    pub fn clear_search(&mut self) {
        self.search.clear();
    }

    /// Resets both the search text and the category filter.
    pub fn clear_filters(&mut self) {
        self.search.clear();
        self.category = CategoryFilter::All;
    }

    pub fn has_filters(&self) -> bool {
        !self.search.trim().is_empty() || !self.category.is_all()
    }

    /// Takes the pending success notice, if any.
    pub fn take_notice(&mut self) -> Option<String> {
        self.notice.take()
    }

    // =========================================================================
    // Dialogs
    // =========================================================================

    pub fn dialog(&self) -> &Dialog {
        &self.dialog
    }

    /// Opens the detail dialog for a product.
    pub async fn open_product(&mut self, id: ProductId) {
        let (product, error) = match self.queries.product(id).await {
            Ok(response) => (Some(response.into_inner()), None),
            Err(err) => (None, Some(err)),
        };
        self.dialog = Dialog::Detail { id, product, error };
    }

    /// Switches the detail dialog to the edit form.
    ///
    /// Returns `false` if there is no loaded product to edit.
    pub fn start_edit(&mut self) -> bool {
        let Dialog::Detail {
            id,
            product: Some(product),
            ..
        } = &self.dialog
        else {
            return false;
        };
        self.dialog = Dialog::Editing {
            id: *id,
            form: EditForm::from_product(product),
            error: None,
        };
        true
    }

    /// The form being edited, if the edit dialog is open.
    pub fn form_mut(&mut self) -> Option<&mut EditForm> {
        match &mut self.dialog {
            Dialog::Editing { form, .. } => Some(form),
            _ => None,
        }
    }

    /// Submits the edit form.
    ///
    /// On success the dialog returns to the detail view showing the updated
    /// product and a notice is queued. On failure the form stays open with
    /// the error.
    pub async fn submit_edit(&mut self) -> Result<(), Error> {
        let Dialog::Editing { id, form, .. } = &self.dialog else {
            return Ok(());
        };
        let id = *id;

        let result = match form.to_update() {
            Ok(update) => self.queries.update_product(id, &update).await,
            Err(err) => Err(err.into()),
        };

        match result {
            Ok(product) => {
                self.dialog = Dialog::Detail {
                    id,
                    product: Some(product),
                    error: None,
                };
                self.notice = Some("Product updated successfully".to_string());
                self.sync();
                Ok(())
            }
            Err(err) => {
                if let Dialog::Editing { error, .. } = &mut self.dialog {
                    *error = Some(err.clone());
                }
                Err(err)
            }
        }
    }

    /// Switches the detail dialog to the delete confirmation.
    pub fn request_delete(&mut self) -> bool {
        let Dialog::Detail { id, product, .. } = &self.dialog else {
            return false;
        };
        self.dialog = Dialog::ConfirmDelete {
            id: *id,
            title: product.as_ref().map(|p| p.title.clone()),
            error: None,
        };
        true
    }

    /// Confirms the pending delete.
    ///
    /// On success the dialog closes and the list is reloaded from the
    /// (already patched) cache. On failure the confirmation stays open with
    /// the error.
    pub async fn confirm_delete(&mut self) -> Result<(), Error> {
        let Dialog::ConfirmDelete { id, .. } = &self.dialog else {
            return Ok(());
        };
        let id = *id;

        match self.queries.delete_product(id).await {
            Ok(()) => {
                self.dialog = Dialog::Closed;
                self.notice = Some("Product deleted".to_string());
                // A failed reload shows on the grid, the delete itself succeeded.
                let _ = self.load().await;
                Ok(())
            }
            Err(err) => {
                if let Dialog::ConfirmDelete { error, .. } = &mut self.dialog {
                    *error = Some(err.clone());
                }
                Err(err)
            }
        }
    }

    /// Steps back one level: edit or confirm to detail, detail to closed.
    pub fn back(&mut self) {
        self.dialog = match std::mem::take(&mut self.dialog) {
            Dialog::Closed | Dialog::Detail { .. } => Dialog::Closed,
            Dialog::Editing { id, .. } | Dialog::ConfirmDelete { id, .. } => Dialog::Detail {
                id,
                product: self.cached_product(id),
                error: None,
            },
        };
    }

    pub fn close(&mut self) {
        self.dialog = Dialog::Closed;
    }

    fn cached_product(&self, id: ProductId) -> Option<Arc<Product>> {
        self.queries
            .query_state::<Arc<Product>>(&CacheKey::Product(id))
            .data
            .or_else(|| {
                self.products()?
                    .iter()
                    .find(|p| p.id == id)
                    .map(|p| Arc::new(p.clone()))
            })
    }
}
