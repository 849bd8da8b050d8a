//! Edit form

use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;

use crate::error::ApiError;
use crate::model::Product;
use crate::model::ProductUpdate;

/// A field of the edit form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Title,
    Price,
    Description,
    Category,
    Image,
}

impl FormField {
    pub const ALL: [FormField; 5] = [
        FormField::Title,
        FormField::Price,
        FormField::Description,
        FormField::Category,
        FormField::Image,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Title => "Product Title",
            Self::Price => "Price ($)",
            Self::Description => "Description",
            Self::Category => "Category",
            Self::Image => "Image URL",
        }
    }
}

/// Edit form state, seeded from the product being edited.
#[derive(Debug, Clone, PartialEq)]
pub struct EditForm {
    pub title: String,
    pub price: Decimal,
    pub description: String,
    pub category: String,
    pub image: String,
}

impl EditForm {
    pub fn from_product(product: &Product) -> Self {
        Self {
            title: product.title.clone(),
            price: product.price,
            description: product.description.clone(),
            category: product.category.to_string(),
            image: product.image.clone(),
        }
    }

    /// Current value of a field as shown in the input.
    pub fn value(&self, field: FormField) -> String {
        match field {
            FormField::Title => self.title.clone(),
            FormField::Price => self.price.to_string(),
            FormField::Description => self.description.clone(),
            FormField::Category => self.category.clone(),
            FormField::Image => self.image.clone(),
        }
    }

    /// Applies user input to a field.
    ///
    /// Text fields take the input as typed. The price keeps the leading
    /// number of the input and falls back to zero when there is none.
    pub fn set(&mut self, field: FormField, input: &str) {
        match field {
            FormField::Title => self.title = input.to_string(),
            FormField::Price => self.price = parse_price(input),
            FormField::Description => self.description = input.to_string(),
            FormField::Category => self.category = input.to_string(),
            FormField::Image => self.image = input.to_string(),
        }
    }

    /// Converts the form into a validated update payload.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Validation`] listing every invalid field.
    pub fn to_update(&self) -> Result<ProductUpdate, ApiError> {
        let update = ProductUpdate {
            title: self.title.clone(),
            price: self.price,
            description: self.description.clone(),
            category: self.category.as_str().into(),
            image: self.image.clone(),
        };
        update.validate().map_err(ApiError::invalid_fields)?;
        Ok(update)
    }
}

/// Parses the longest numeric prefix of `input`, or zero.
///
/// The prefix may carry an exponent (`1e3` is 1000). A number outside the
/// range of [`Decimal`] also yields zero.
pub fn parse_price(input: &str) -> Decimal {
    let input = input.trim_start();
    let mut end = 0;
    let mut seen_digit = false;
    let mut seen_dot = false;

    for (i, c) in input.char_indices() {
        match c {
            '+' | '-' if i == 0 => {}
            '0'..='9' => seen_digit = true,
            '.' if !seen_dot => seen_dot = true,
            _ => break,
        }
        end = i + c.len_utf8();
    }

    if !seen_digit {
        return Decimal::ZERO;
    }
    let mantissa = input[..end].trim_end_matches('.');
    let mantissa = mantissa.strip_prefix('+').unwrap_or(mantissa);
    let (sign, digits) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    let zero = if digits.starts_with('.') { "0" } else { "" };
    let mantissa = format!("{}{}{}", sign, zero, digits);

    let parsed = match exponent(&input[end..]) {
        Some(exp) => Decimal::from_scientific(&format!("{}e{}", mantissa, exp)),
        None => Decimal::from_str(&mantissa),
    };
    parsed
        .ok()
        .or_else(|| {
            let exp = exponent(&input[end..]).unwrap_or("0");
            format!("{}e{}", mantissa, exp).parse::<f64>().ok().and_then(Decimal::from_f64)
        })
        .unwrap_or(Decimal::ZERO)
}

/// Exponent digits (with optional sign) following a mantissa, e.g. `-2` in `e-2x`.
fn exponent(rest: &str) -> Option<&str> {
    let exp = rest.strip_prefix(['e', 'E'])?;
    let sign = usize::from(exp.starts_with(['+', '-']));
    let digits = exp[sign..].bytes().take_while(u8::is_ascii_digit).count();
    (digits > 0).then(|| &exp[..sign + digits])
}
