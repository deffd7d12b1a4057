//! AWS Price List API source

use crate::error::{CostError, Result};
use crate::pricing::{parse_price_list, PriceCatalogEntry};
use crate::provider::{PriceFilter, PricingSource};
use crate::retry::{ExponentialBackoffPolicy, RetryPolicy};
use async_trait::async_trait;
use aws_sdk_pricing::types::{Filter, FilterType};
use aws_sdk_pricing::Client as PricingClient;
use tracing::debug;

const FORMAT_VERSION: &str = "aws_v1";

pub struct AwsPricing {
    client: PricingClient,
}

impl AwsPricing {
    pub fn new(client: PricingClient) -> Self {
        Self { client }
    }
}

/// The filters sent for one lookup: the caller's, plus the region unless the
/// caller already pinned one.
pub fn request_filters(filters: &[PriceFilter], region: &str) -> Vec<PriceFilter> {
    let mut all = filters.to_vec();
    let pinned = filters
        .iter()
        .any(|f| f.field == "regionCode" || f.field == "fromRegionCode");
    if !pinned {
        all.push(PriceFilter::new("regionCode", region));
    }
    all
}

fn to_sdk_filter(filter: &PriceFilter) -> Result<Filter> {
    Filter::builder()
        .r#type(FilterType::TermMatch)
        .field(&filter.field)
        .value(&filter.value)
        .build()
        .map_err(|e| CostError::Pricing(format!("Invalid filter {}={}: {}", filter.field, filter.value, e)))
}

#[async_trait]
impl PricingSource for AwsPricing {
    async fn get_products(
        &self,
        filters: &[PriceFilter],
        region: &str,
        service_code: &str,
    ) -> Result<Vec<PriceCatalogEntry>> {
        let sdk_filters = request_filters(filters, region)
            .iter()
            .map(to_sdk_filter)
            .collect::<Result<Vec<_>>>()?;

        let mut entries = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0;
        loop {
            let token = next_token.clone();
            let response = ExponentialBackoffPolicy::for_cloud_api()
                .execute_with_retry(|| async {
                    self.client
                        .get_products()
                        .service_code(service_code)
                        .format_version(FORMAT_VERSION)
                        .set_filters(Some(sdk_filters.clone()))
                        .set_next_token(token.clone())
                        .send()
                        .await
                        .map_err(|e| {
                            CostError::Pricing(format!(
                                "GetProducts failed for {} in {}: {}",
                                service_code, region, e
                            ))
                        })
                })
                .await?;

            for document in response.price_list() {
                entries.extend(parse_price_list(document)?);
            }
            pages += 1;

            match response.next_token() {
                Some(token) if !token.is_empty() => next_token = Some(token.to_string()),
                _ => break,
            }
        }

        debug!(
            "GetProducts {} in {}: {} entries over {} pages",
            service_code,
            region,
            entries.len(),
            pages
        );
        Ok(entries)
    }
}
