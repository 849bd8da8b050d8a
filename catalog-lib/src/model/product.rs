//! Product types
//!
//! Products are owned by the remote service. The local copies held by the
//! query cache are validated when they cross the service boundary so a
//! malformed payload fails fast instead of leaking half-populated values.

use rust_decimal::Decimal;
use serde::Deserialize;
use serde::Serialize;
use url::Url;

use super::Category;
use crate::error::ApiError;
use crate::error::FieldValidationError;
use crate::error::ProductField;
use crate::error::Violation;

/// Identifier assigned to a product by the remote service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(pub u64);

impl std::fmt::Display for ProductId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for ProductId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl std::str::FromStr for ProductId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Server-assigned review summary. Read-only.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// Average score, 0 to 5.
    pub rate: f64,
    /// Number of reviews.
    pub count: u32,
}

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub description: String,
    pub category: Category,
    /// Image URL.
    pub image: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<Rating>,
}

impl Product {
    /// Checks the invariants the service is expected to uphold.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Parse`] describing the first violation.
    pub fn validate(&self) -> Result<(), ApiError> {
        if self.price.is_sign_negative() && !self.price.is_zero() {
            return Err(ApiError::parse(format!(
                "product {} has negative price {}",
                self.id, self.price
            )));
        }
        if let Some(rating) = &self.rating {
            if !(0.0..=5.0).contains(&rating.rate) {
                return Err(ApiError::parse(format!(
                    "product {} has rating {} outside 0-5",
                    self.id, rating.rate
                )));
            }
        }
        Ok(())
    }

    /// Merges a server representation onto this product.
    ///
    /// Every editable field is taken from `other`; the rating is kept when
    /// `other` does not carry one (write responses omit it).
    pub fn merge(&mut self, other: &Product) {
        self.title.clone_from(&other.title);
        self.price = other.price;
        self.description.clone_from(&other.description);
        self.category = other.category.clone();
        self.image.clone_from(&other.image);
        if other.rating.is_some() {
            self.rating = other.rating;
        }
    }

    /// Returns a copy of this product with `other` merged on top.
    pub fn merged(&self, other: &Product) -> Product {
        let mut merged = self.clone();
        merged.merge(other);
        merged
    }
}

/// The editable fields sent with `PUT /products/{id}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub title: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub description: String,
    pub category: Category,
    pub image: String,
}

impl ProductUpdate {
    /// Captures the editable fields of an existing product.
    pub fn from_product(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            price: product.price,
            description: product.description.clone(),
            category: product.category.clone(),
            image: product.image.clone(),
        }
    }

    /// Validates the payload before it is sent.
    ///
    /// All failing fields are reported, not just the first.
    pub fn validate(&self) -> Result<(), Vec<FieldValidationError>> {
        let mut errors = Vec::new();

        if self.title.trim().is_empty() {
            errors.push(FieldValidationError::missing(ProductField::Title));
        }
        if self.price.is_sign_negative() && !self.price.is_zero() {
            errors.push(FieldValidationError::new(ProductField::Price, Violation::Negative));
        }
        if self.description.trim().is_empty() {
            errors.push(FieldValidationError::missing(ProductField::Description));
        }
        if self.category.as_str().trim().is_empty() {
            errors.push(FieldValidationError::missing(ProductField::Category));
        }
        match Url::parse(self.image.trim()) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => {}
            Ok(_) => errors.push(FieldValidationError::new(ProductField::Image, Violation::NotHttp)),
            Err(_) => errors.push(FieldValidationError::new(ProductField::Image, Violation::NotAUrl)),
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}
