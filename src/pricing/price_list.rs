//! Decoding of AWS price list documents
//!
//! The pricing API returns each product as a JSON document holding the
//! product attributes and its terms. Every on-demand price dimension becomes
//! one `PriceCatalogEntry`.

use crate::error::{CostError, Result};
use crate::pricing::PriceCatalogEntry;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Deserialize)]
struct PriceListDocument {
    product: Product,
    #[serde(default)]
    terms: Terms,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Product {
    #[serde(default)]
    product_family: String,
    #[serde(default)]
    attributes: BTreeMap<String, String>,
}

#[derive(Debug, Default, Deserialize)]
struct Terms {
    #[serde(rename = "OnDemand", default)]
    on_demand: BTreeMap<String, Term>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Term {
    #[serde(default)]
    price_dimensions: BTreeMap<String, PriceDimension>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceDimension {
    unit: String,
    price_per_unit: BTreeMap<String, String>,
    #[serde(default)]
    begin_range: Option<String>,
    #[serde(default)]
    end_range: Option<String>,
}

/// Parse one price list document into catalog entries.
pub fn parse_price_list(document: &str) -> Result<Vec<PriceCatalogEntry>> {
    let doc: PriceListDocument = serde_json::from_str(document)
        .map_err(|e| CostError::Pricing(format!("Malformed price list document: {}", e)))?;

    let mut entries = Vec::new();
    for term in doc.terms.on_demand.values() {
        for dimension in term.price_dimensions.values() {
            let begin_range = match dimension.begin_range.as_deref() {
                Some(raw) => parse_bound(raw)?.unwrap_or(0.0),
                None => 0.0,
            };
            let end_range = match dimension.end_range.as_deref() {
                Some(raw) => parse_bound(raw)?,
                None => None,
            };

            for (currency, raw_price) in &dimension.price_per_unit {
                let price_per_unit = raw_price.parse::<f64>().map_err(|_| {
                    CostError::Pricing(format!(
                        "Invalid price '{}' for unit {}",
                        raw_price, dimension.unit
                    ))
                })?;
                entries.push(PriceCatalogEntry {
                    unit: dimension.unit.clone(),
                    price_per_unit,
                    currency: currency.clone(),
                    product_family: doc.product.product_family.clone(),
                    attributes: doc.product.attributes.clone(),
                    begin_range,
                    end_range,
                });
            }
        }
    }
    // Rate codes carry no order; list tiers from the lowest range up.
    entries.sort_by(|a, b| a.begin_range.total_cmp(&b.begin_range));
    Ok(entries)
}

/// Range bounds are decimal strings, with "Inf" for an open upper end.
fn parse_bound(raw: &str) -> Result<Option<f64>> {
    if raw.eq_ignore_ascii_case("inf") {
        return Ok(None);
    }
    raw.parse::<f64>()
        .map(Some)
        .map_err(|_| CostError::Pricing(format!("Invalid range bound '{}'", raw)))
}
