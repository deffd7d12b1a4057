//! Filtered unit price catalog

use crate::error::{CostError, Result};
use crate::provider::{PriceFilter, PricingSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

pub const DEFAULT_CURRENCY: &str = "USD";

/// A priced unit for a cloud service product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceCatalogEntry {
    pub unit: String,
    pub price_per_unit: f64,
    pub currency: String,
    pub product_family: String,
    /// Product attributes as reported by the pricing source
    #[serde(default)]
    pub attributes: BTreeMap<String, String>,
    /// Lower bound of the usage tier this price applies to
    #[serde(default)]
    pub begin_range: f64,
    /// Upper bound of the tier, `None` when unbounded
    #[serde(default)]
    pub end_range: Option<f64>,
}

impl PriceCatalogEntry {
    pub fn new(
        unit: impl Into<String>,
        price_per_unit: f64,
        currency: impl Into<String>,
        product_family: impl Into<String>,
    ) -> Self {
        Self {
            unit: unit.into(),
            price_per_unit,
            currency: currency.into(),
            product_family: product_family.into(),
            attributes: BTreeMap::new(),
            begin_range: 0.0,
            end_range: None,
        }
    }

    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    pub fn with_range(mut self, begin: f64, end: Option<f64>) -> Self {
        self.begin_range = begin;
        self.end_range = end;
        self
    }

    fn has_attribute(&self, key: &str, value: &str) -> bool {
        self.attributes.get(key).map(String::as_str) == Some(value)
    }
}

/// One filtered load contributing to a catalog
#[derive(Debug, Clone)]
pub struct PriceFamily {
    pub name: &'static str,
    pub filters: Vec<PriceFilter>,
    pub required: bool,
}

impl PriceFamily {
    pub fn required(name: &'static str, filters: Vec<PriceFilter>) -> Self {
        Self {
            name,
            filters,
            required: true,
        }
    }

    pub fn optional(name: &'static str, filters: Vec<PriceFilter>) -> Self {
        Self {
            name,
            filters,
            required: false,
        }
    }
}

/// Unit prices for one `(service_code, region)` pair
#[derive(Debug, Clone)]
pub struct PricingCatalog {
    service_code: String,
    region: String,
    entries: Vec<PriceCatalogEntry>,
    loaded: bool,
}

impl PricingCatalog {
    pub fn new(service_code: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            service_code: service_code.into(),
            region: region.into(),
            entries: Vec::new(),
            loaded: false,
        }
    }

    pub fn from_entries(
        service_code: impl Into<String>,
        region: impl Into<String>,
        entries: Vec<PriceCatalogEntry>,
    ) -> Self {
        let mut catalog = Self::new(service_code, region);
        catalog.extend(entries);
        catalog
    }

    /// Fetch the entries matching `filters`. No match is an empty list.
    pub async fn load(
        source: &dyn PricingSource,
        filters: &[PriceFilter],
        region: &str,
        service_code: &str,
    ) -> Result<Vec<PriceCatalogEntry>> {
        let entries = source.get_products(filters, region, service_code).await?;
        debug!(
            "Loaded {} price entries for {} in {} ({:?})",
            entries.len(),
            service_code,
            region,
            filters
        );
        Ok(entries)
    }

    /// Load every family concurrently into one catalog.
    ///
    /// A required family that returns no entries fails with
    /// `MissingPriceFamily`; optional families may come back empty.
    pub async fn init(
        source: &dyn PricingSource,
        service_code: &str,
        region: &str,
        families: &[PriceFamily],
    ) -> Result<Self> {
        let loads = families
            .iter()
            .map(|family| Self::load(source, &family.filters, region, service_code));
        let results = futures::future::try_join_all(loads).await?;

        let mut catalog = Self::new(service_code, region);
        for (family, entries) in families.iter().zip(results) {
            if entries.is_empty() && family.required {
                return Err(CostError::MissingPriceFamily {
                    service_code: service_code.to_string(),
                    family: family.name.to_string(),
                    region: region.to_string(),
                });
            }
            catalog.extend(entries);
        }
        Ok(catalog)
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = PriceCatalogEntry>) {
        self.entries.extend(entries);
        self.loaded = true;
    }

    pub fn service_code(&self) -> &str {
        &self.service_code
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn entries(&self) -> &[PriceCatalogEntry] {
        &self.entries
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn currency(&self) -> &str {
        self.entries
            .first()
            .map(|e| e.currency.as_str())
            .unwrap_or(DEFAULT_CURRENCY)
    }

    pub fn has_unit(&self, unit: &str) -> bool {
        self.entries.iter().any(|e| e.unit == unit)
    }

    /// Unit price for `unit`.
    ///
    /// Tiered rows resolve to the lowest tier that charges anything, so a free
    /// allowance does not mask the paid rate. Otherwise the first entry wins;
    /// filters must be specific enough to avoid ambiguous prices.
    pub fn price_per_unit(&self, unit: &str) -> Result<f64> {
        first_paid_tier(self.entries.iter().filter(|e| e.unit == unit))
            .ok_or_else(|| CostError::price_not_found(unit))
    }

    /// `price_per_unit` restricted to entries carrying `attribute == value`.
    pub fn price_per_unit_where(&self, unit: &str, attribute: &str, value: &str) -> Result<f64> {
        first_paid_tier(
            self.entries
                .iter()
                .filter(|e| e.unit == unit && e.has_attribute(attribute, value)),
        )
        .ok_or_else(|| CostError::price_not_found(format!("{} ({}={})", unit, attribute, value)))
    }

    /// Cost of `quantity` units charged across the unit's volume tiers.
    pub fn tiered_cost(&self, unit: &str, quantity: f64) -> Result<f64> {
        let tiers: Vec<&PriceCatalogEntry> = self.entries.iter().filter(|e| e.unit == unit).collect();
        tiered(unit, tiers, quantity)
    }

    /// `tiered_cost` restricted to entries carrying `attribute == value`.
    pub fn tiered_cost_where(
        &self,
        unit: &str,
        attribute: &str,
        value: &str,
        quantity: f64,
    ) -> Result<f64> {
        let tiers: Vec<&PriceCatalogEntry> = self
            .entries
            .iter()
            .filter(|e| e.unit == unit && e.has_attribute(attribute, value))
            .collect();
        tiered(&format!("{} ({}={})", unit, attribute, value), tiers, quantity)
    }
}

fn first_paid_tier<'a>(matches: impl Iterator<Item = &'a PriceCatalogEntry>) -> Option<f64> {
    let matches: Vec<&PriceCatalogEntry> = matches.collect();
    matches
        .iter()
        .filter(|e| e.price_per_unit > 0.0)
        .min_by(|a, b| a.begin_range.total_cmp(&b.begin_range))
        .or_else(|| matches.first())
        .map(|e| e.price_per_unit)
}

fn tiered(label: &str, mut tiers: Vec<&PriceCatalogEntry>, quantity: f64) -> Result<f64> {
    if tiers.is_empty() {
        return Err(CostError::price_not_found(label));
    }
    tiers.sort_by(|a, b| a.begin_range.total_cmp(&b.begin_range));

    let mut cost = 0.0;
    for tier in tiers {
        if quantity <= tier.begin_range {
            break;
        }
        let upper = tier.end_range.unwrap_or(f64::INFINITY);
        let in_tier = quantity.min(upper) - tier.begin_range;
        if in_tier > 0.0 {
            cost += in_tier * tier.price_per_unit;
        }
    }
    Ok(cost)
}
