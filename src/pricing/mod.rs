//! Unit price catalogs
//!
//! A `PricingCatalog` is filled from one or more filtered loads against a
//! `PricingSource` and is immutable once its calculator has been initialized.

pub mod catalog;
pub mod price_list;

pub use catalog::{PriceCatalogEntry, PriceFamily, PricingCatalog};
pub use price_list::parse_price_list;
