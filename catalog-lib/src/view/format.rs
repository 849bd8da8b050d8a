//! Presentation helpers

use rust_decimal::Decimal;
use rust_decimal::RoundingStrategy;

use crate::model::Category;

/// Formats a price as US dollars, e.g. `$1,234.50`.
pub fn format_price(price: Decimal) -> String {
    let rounded = price.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    let sign = if rounded.is_sign_negative() && !rounded.is_zero() { "-" } else { "" };
    let plain = format!("{:.2}", rounded.abs());
    let (whole, cents) = plain.split_once('.').unwrap_or((plain.as_str(), "00"));

    let mut grouped = String::with_capacity(whole.len() + whole.len() / 3);
    for (i, digit) in whole.chars().enumerate() {
        if i > 0 && (whole.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    format!("{}${}.{}", sign, grouped, cents)
}

/// Capitalises every word of a category, e.g. `Men's Clothing`.
pub fn category_label(category: &Category) -> String {
    category
        .as_str()
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Number of filled stars (out of five) for a rating.
pub fn star_count(rate: f64) -> u8 {
    if rate.is_nan() {
        return 0;
    }
    rate.round().clamp(0.0, 5.0) as u8
}

/// Five-character star bar, e.g. `★★★★☆`.
pub fn star_bar(rate: f64) -> String {
    let filled = star_count(rate) as usize;
    format!("{}{}", "★".repeat(filled), "☆".repeat(5 - filled))
}
