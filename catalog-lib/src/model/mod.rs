//! Data model types

mod category;
mod product;

pub use category::*;
pub use product::*;
