//! Key-value table pricing (on-demand request units plus indexed storage)

use crate::calculator::PricingResult;
use crate::dimension::MetricDimension;
use crate::error::Result;
use crate::pricing::{PriceFamily, PricingCatalog};
use crate::provider::{PriceFilter, PricingSource};
use std::sync::Arc;

pub const SERVICE_CODE: &str = "AmazonDynamoDB";
pub const REQUEST_FAMILY: &str = "Amazon DynamoDB PayPerRequest Throughput";
pub const STORAGE_FAMILY: &str = "Database Storage";
pub const STORAGE_VOLUME_TYPE: &str = "Amazon DynamoDB - Indexed DataStore";

pub const READ_UNIT: &str = "ReadRequestUnits";
pub const WRITE_UNIT: &str = "WriteRequestUnits";
pub const STORAGE_UNIT: &str = "GB-Mo";

/// Bytes of storage overhead billed per write request unit
pub const WRITE_OVERHEAD_BYTES: f64 = 4.0 * 1000.0;

const BYTES_PER_GB: f64 = 1e9;

#[derive(Debug, Clone)]
pub struct StorageTableCost {
    catalog: Arc<PricingCatalog>,
    read_request_price: f64,
    write_request_price: f64,
    monthly_storage_price: f64,
}

impl StorageTableCost {
    pub async fn init(pricing: &dyn PricingSource, region: &str) -> Result<Self> {
        let families = [
            PriceFamily::required(
                REQUEST_FAMILY,
                vec![PriceFilter::new("productFamily", REQUEST_FAMILY)],
            ),
            PriceFamily::required(
                STORAGE_FAMILY,
                vec![
                    PriceFilter::new("productFamily", STORAGE_FAMILY),
                    PriceFilter::new("volumeType", STORAGE_VOLUME_TYPE),
                ],
            ),
        ];
        let catalog = PricingCatalog::init(pricing, SERVICE_CODE, region, &families).await?;
        Self::from_catalog(catalog)
    }

    /// Resolve the unit prices from an already loaded catalog.
    pub fn from_catalog(catalog: PricingCatalog) -> Result<Self> {
        Ok(Self {
            read_request_price: catalog.price_per_unit(READ_UNIT)?,
            write_request_price: catalog.price_per_unit(WRITE_UNIT)?,
            monthly_storage_price: catalog.price_per_unit(STORAGE_UNIT)?,
            catalog: Arc::new(catalog),
        })
    }

    pub fn read_request_price(&self) -> f64 {
        self.read_request_price
    }

    pub fn write_request_price(&self) -> f64 {
        self.write_request_price
    }

    pub fn monthly_storage_price(&self) -> f64 {
        self.monthly_storage_price
    }

    pub fn catalog(&self) -> &PricingCatalog {
        &self.catalog
    }

    pub fn calculate_for_dimension(&self, dimension: &MetricDimension) -> Result<PricingResult> {
        let window = dimension.window();
        let cost_window_seconds = window.cost_window_seconds()?;
        let seconds_in_month = window.seconds_in_month();

        // Capacity units are per-minute averages over the window.
        let read_cost = dimension.read_capacity_units() * self.read_request_price;
        let write_cost = dimension.write_capacity_units() * self.write_request_price;

        let storage_gb = (dimension.storage_bytes()
            + dimension.write_capacity_units() * WRITE_OVERHEAD_BYTES)
            / BYTES_PER_GB;
        let storage_cost =
            storage_gb * self.monthly_storage_price * cost_window_seconds / seconds_in_month;

        Ok(PricingResult::from_components(
            &[
                ("readRequestCharges", read_cost),
                ("writeRequestCharges", write_cost),
                ("storageCharges", storage_cost),
            ],
            self.catalog.currency(),
            cost_window_seconds,
            seconds_in_month,
        ))
    }
}
