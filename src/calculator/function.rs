//! Compute function pricing (invocations, GB-seconds and outbound transfer)

use crate::calculator::PricingResult;
use crate::dimension::{Metric, MetricDimension};
use crate::error::Result;
use crate::pricing::{PriceFamily, PricingCatalog};
use crate::provider::{PriceFilter, PricingSource};
use std::sync::Arc;

pub const SERVICE_CODE: &str = "AWSLambda";
pub const FAMILY: &str = "Serverless";
pub const REQUEST_GROUP: &str = "AWS-Lambda-Requests";
pub const DURATION_GROUP: &str = "AWS-Lambda-Duration";
pub const REQUEST_UNIT: &str = "Requests";
pub const DURATION_UNIT: &str = "Lambda-GB-Second";

pub const TRANSFER_SERVICE_CODE: &str = "AWSDataTransfer";
pub const TRANSFER_FAMILY: &str = "Data Transfer";
pub const TRANSFER_UNIT: &str = "GB";
pub const TRANSFER_TYPE: &str = "transferType";
pub const INTERNET_TRANSFER: &str = "AWS Outbound";
pub const INTRA_REGION_TRANSFER: &str = "IntraRegion";
pub const INTER_REGION_TRANSFER: &str = "InterRegion Outbound";

#[derive(Debug, Clone)]
pub struct ComputeFunctionCost {
    catalog: Arc<PricingCatalog>,
    transfer: Arc<PricingCatalog>,
    request_price: f64,
    gb_second_price: f64,
}

impl ComputeFunctionCost {
    pub async fn init(pricing: &dyn PricingSource, region: &str) -> Result<Self> {
        let compute_families = [
            PriceFamily::required(
                REQUEST_GROUP,
                vec![
                    PriceFilter::new("productFamily", FAMILY),
                    PriceFilter::new("group", REQUEST_GROUP),
                ],
            ),
            PriceFamily::required(
                DURATION_GROUP,
                vec![
                    PriceFilter::new("productFamily", FAMILY),
                    PriceFilter::new("group", DURATION_GROUP),
                ],
            ),
        ];
        // Transfer prices only matter for functions that send data out.
        let transfer_families = [PriceFamily::optional(
            TRANSFER_FAMILY,
            vec![
                PriceFilter::new("productFamily", TRANSFER_FAMILY),
                PriceFilter::new("fromRegionCode", region),
            ],
        )];

        let (catalog, transfer) = tokio::try_join!(
            PricingCatalog::init(pricing, SERVICE_CODE, region, &compute_families),
            PricingCatalog::init(pricing, TRANSFER_SERVICE_CODE, region, &transfer_families),
        )?;
        Self::from_catalogs(catalog, transfer)
    }

    pub fn from_catalogs(catalog: PricingCatalog, transfer: PricingCatalog) -> Result<Self> {
        Ok(Self {
            request_price: catalog.price_per_unit(REQUEST_UNIT)?,
            gb_second_price: catalog.price_per_unit(DURATION_UNIT)?,
            catalog: Arc::new(catalog),
            transfer: Arc::new(transfer),
        })
    }

    pub fn request_price(&self) -> f64 {
        self.request_price
    }

    pub fn gb_second_price(&self) -> f64 {
        self.gb_second_price
    }

    pub fn calculate_for_dimension(&self, dimension: &MetricDimension) -> Result<PricingResult> {
        let window = dimension.window();
        let cost_window_seconds = window.cost_window_seconds()?;
        let seconds_in_month = window.seconds_in_month();

        let requests = dimension.request_count();
        let request_cost = requests * self.request_price;

        let gb_seconds =
            requests * (dimension.average_duration_ms() / 1000.0) * (dimension.memory_mb() / 1024.0);
        let duration_cost = gb_seconds * self.gb_second_price;

        let transfer_cost = self.transfer_cost(dimension)?;

        Ok(PricingResult::from_components(
            &[
                ("requestCharges", request_cost),
                ("durationCharges", duration_cost),
                ("dataTransferCharges", transfer_cost),
            ],
            self.catalog.currency(),
            cost_window_seconds,
            seconds_in_month,
        ))
    }

    /// Outbound transfer, priced only for volumes that are actually present.
    fn transfer_cost(&self, dimension: &MetricDimension) -> Result<f64> {
        let mut cost = 0.0;

        let internet = dimension.get(Metric::DataTransferOutInternetGb);
        if internet > 0.0 {
            cost += self.transfer.tiered_cost_where(
                TRANSFER_UNIT,
                TRANSFER_TYPE,
                INTERNET_TRANSFER,
                internet,
            )?;
        }

        let intra = dimension.get(Metric::DataTransferOutIntraRegionGb);
        if intra > 0.0 {
            cost += intra
                * self
                    .transfer
                    .price_per_unit_where(TRANSFER_UNIT, TRANSFER_TYPE, INTRA_REGION_TRANSFER)?;
        }

        let inter = dimension.get(Metric::DataTransferOutInterRegionGb);
        if inter > 0.0 {
            cost += inter
                * self
                    .transfer
                    .price_per_unit_where(TRANSFER_UNIT, TRANSFER_TYPE, INTER_REGION_TRANSFER)?;
        }

        Ok(cost)
    }
}
