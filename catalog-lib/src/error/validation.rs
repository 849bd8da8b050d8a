//! Product field validation errors

/// An editable field of a product payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProductField {
    Title,
    Price,
    Description,
    Category,
    Image,
}

impl ProductField {
    /// Field name as it appears in the JSON payload.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Price => "price",
            Self::Description => "description",
            Self::Category => "category",
            Self::Image => "image",
        }
    }
}

impl std::fmt::Display for ProductField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The rule a field broke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Violation {
    /// Empty or whitespace-only text.
    Missing,
    /// Price below zero.
    Negative,
    /// Not parseable as a URL.
    NotAUrl,
    /// A URL, but not `http` or `https`.
    NotHttp,
}

impl Violation {
    pub fn message(&self) -> &'static str {
        match self {
            Self::Missing => "is required",
            Self::Negative => "must not be negative",
            Self::NotAUrl => "must be a valid URL",
            Self::NotHttp => "must be an http(s) URL",
        }
    }
}

/// A product field that failed local validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldValidationError {
    pub field: ProductField,
    pub violation: Violation,
}

impl FieldValidationError {
    pub fn new(field: ProductField, violation: Violation) -> Self {
        Self { field, violation }
    }

    pub fn missing(field: ProductField) -> Self {
        Self::new(field, Violation::Missing)
    }

    /// Human-readable message, without the field name.
    pub fn message(&self) -> &'static str {
        self.violation.message()
    }
}

impl std::fmt::Display for FieldValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_uses_payload_field_names() {
        assert_eq!(FieldValidationError::missing(ProductField::Description).to_string(), "description: is required");
        assert_eq!(
            FieldValidationError::new(ProductField::Image, Violation::NotHttp).to_string(),
            "image: must be an http(s) URL"
        );
    }
}
