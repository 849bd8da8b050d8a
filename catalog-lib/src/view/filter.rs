//! Search and category filtering of the product grid

use crate::model::Category;
use crate::model::Product;

/// Category selector of the product grid.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

impl CategoryFilter {
    /// Parses the selector as typed by the user; `all` (any case) or an
    /// empty string selects every category.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() || input.eq_ignore_ascii_case("all") {
            Self::All
        } else {
            Self::Only(Category::new(input))
        }
    }

    pub fn matches(&self, category: &Category) -> bool {
        match self {
            Self::All => true,
            Self::Only(expected) => expected == category,
        }
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }
}

impl std::fmt::Display for CategoryFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::All => f.write_str("all"),
            Self::Only(category) => write!(f, "{}", category),
        }
    }
}

/// Products whose title contains `search` (case-insensitive) and whose
/// category matches `category`, in list order.
///
/// The search text is matched as typed, surrounding whitespace included.
pub fn filter_products<'a>(products: &'a [Product], search: &str, category: &CategoryFilter) -> Vec<&'a Product> {
    let needle = search.to_lowercase();
    products
        .iter()
        .filter(|p| needle.is_empty() || p.title.to_lowercase().contains(&needle))
        .filter(|p| category.matches(&p.category))
        .collect()
}
