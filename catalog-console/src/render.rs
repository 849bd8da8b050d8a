//! Plain-text rendering of the catalog view

use std::fmt::Write;

use catalog_lib::error::ApiError;
use catalog_lib::error::Error;
use catalog_lib::model::Product;
use catalog_lib::view::CatalogView;
use catalog_lib::view::Dialog;
use catalog_lib::view::EditForm;
use catalog_lib::view::FormField;
use catalog_lib::view::category_label;
use catalog_lib::view::format_price;
use catalog_lib::view::star_bar;

const TITLE_WIDTH: usize = 48;

/// The product grid with its filter line and result counter.
pub fn grid(view: &CatalogView) -> String {
    let mut out = String::new();

    if view.products().is_none() {
        match view.error() {
            Some(err) => {
                let _ = writeln!(out, "Error loading products: {}", error_message(err));
                let _ = writeln!(out, "Type 'retry' to try again.");
            }
            None => {
                let _ = writeln!(out, "Loading products...");
            }
        }
        return out;
    }

    let _ = writeln!(
        out,
        "Search: {:<20} Category: {}",
        if view.search().is_empty() { "-" } else { view.search() },
        view.category()
    );

    let visible = view.visible_products();
    if visible.is_empty() {
        let _ = writeln!(out, "\nNo products found.");
        if view.has_filters() {
            let _ = writeln!(out, "Try 'clear' to reset the filters.");
        }
    } else {
        let _ = writeln!(out);
        for product in visible {
            let _ = writeln!(out, "{}", row(product));
        }
    }

    let _ = writeln!(out, "\n{}", view.summary());
    if let Some(err) = view.error() {
        let _ = writeln!(out, "(last refresh failed: {})", error_message(err));
    }
    out
}

fn row(product: &Product) -> String {
    let rating = match product.rating {
        Some(rating) => format!("{:.1}", rating.rate),
        None => "-".to_string(),
    };
    format!(
        "{:>4}  {:<width$}  {:>10}  {:>4}  {}",
        product.id,
        truncate(&product.title, TITLE_WIDTH),
        format_price(product.price),
        rating,
        category_label(&product.category),
        width = TITLE_WIDTH
    )
}

/// The open dialog, if any.
pub fn dialog(dialog: &Dialog) -> Option<String> {
    let mut out = String::new();
    match dialog {
        Dialog::Closed => return None,
        Dialog::Detail {
            id,
            product: None,
            error,
        } => {
            let _ = match error {
                Some(err) => writeln!(out, "Product {}: {}", id, error_message(err)),
                None => writeln!(out, "Loading product {}...", id),
            };
        }
        Dialog::Detail {
            product: Some(product),
            ..
        } => out.push_str(&detail(product)),
        Dialog::Editing { id, form, error } => {
            let _ = writeln!(out, "Editing product {}", id);
            out.push_str(&form_summary(form));
            if let Some(err) = error {
                let _ = writeln!(out, "Update failed: {}", error_message(err));
            }
        }
        Dialog::ConfirmDelete { id, title, error } => {
            let _ = writeln!(
                out,
                "Delete \"{}\"? This cannot be undone.",
                title.clone().unwrap_or_else(|| format!("product {}", id))
            );
            if let Some(err) = error {
                let _ = writeln!(out, "Delete failed: {}", error_message(err));
            }
        }
    }
    Some(out)
}

fn detail(product: &Product) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "#{} {}", product.id, product.title);
    let _ = writeln!(out, "{}", category_label(&product.category));
    let _ = writeln!(out, "Price: {}", format_price(product.price));
    if let Some(rating) = product.rating {
        let _ = writeln!(
            out,
            "Rating: {} {} (based on {} customer reviews)",
            star_bar(rating.rate),
            rating.rate,
            rating.count
        );
    }
    let _ = writeln!(out, "Image: {}", product.image);
    let _ = writeln!(out, "\n{}", product.description);
    let _ = writeln!(out, "\nType 'edit', 'delete' or 'back'.");
    out
}

fn form_summary(form: &EditForm) -> String {
    let mut out = String::new();
    for field in FormField::ALL {
        let _ = writeln!(out, "  {:<14} {}", field.label(), form.value(field));
    }
    out
}

/// Human-readable error text, listing invalid fields when known.
pub fn error_message(err: &Error) -> String {
    match err.as_api() {
        Some(ApiError::Validation { fields, .. }) if !fields.is_empty() => fields
            .iter()
            .map(|f| format!("{} {}", f.field, f.message()))
            .collect::<Vec<_>>()
            .join(", "),
        _ => err.to_string(),
    }
}

fn truncate(text: &str, width: usize) -> String {
    if text.chars().count() <= width {
        return text.to_string();
    }
    let mut cut: String = text.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}

#[cfg(test)]
mod tests {
    use catalog_lib::error::FieldValidationError;
    use catalog_lib::error::ProductField;
    use catalog_lib::error::Violation;
    use catalog_lib::model::Category;
    use catalog_lib::model::ProductId;
    use rust_decimal::Decimal;

    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long product title", 10), "a very ...");
    }

    #[test]
    fn test_row() {
        let product = Product {
            id: ProductId(3),
            title: "Cotton Jacket".into(),
            price: Decimal::new(5599, 2),
            description: String::new(),
            category: Category::new("men's clothing"),
            image: String::new(),
            rating: None,
        };
        let line = row(&product);
        assert!(line.contains("$55.99"));
        assert!(line.contains("Men's Clothing"));
    }

    #[test]
    fn test_validation_message_lists_fields() {
        let err = Error::from(ApiError::invalid_fields(vec![
            FieldValidationError::missing(ProductField::Title),
            FieldValidationError::new(ProductField::Image, Violation::NotAUrl),
        ]));
        assert_eq!(error_message(&err), "title is required, image must be a valid URL");
    }
}
