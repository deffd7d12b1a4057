//! Managed database instance pricing (instance hours, provisioned storage, I/O)

use crate::calculator::PricingResult;
use crate::config::PricingConfig;
use crate::dimension::MetricDimension;
use crate::error::{CostError, Result};
use crate::pricing::{PriceFamily, PricingCatalog};
use crate::provider::{PriceFilter, PricingSource};
use std::sync::Arc;
use tracing::debug;

pub const SERVICE_CODE: &str = "AmazonRDS";
pub const INSTANCE_FAMILY: &str = "Database Instance";
pub const STORAGE_FAMILY: &str = "Database Storage";
pub const IO_FAMILY: &str = "System Operation";

pub const INSTANCE_UNIT: &str = "Hrs";
pub const STORAGE_UNIT: &str = "GB-Mo";
pub const IO_UNIT: &str = "IOs";
pub const INSTANCE_TYPE: &str = "instanceType";

const SECONDS_PER_HOUR: f64 = 3600.0;
const BYTES_PER_GB: f64 = 1e9;

#[derive(Debug, Clone)]
pub struct DatabaseInstanceCost {
    catalog: Arc<PricingCatalog>,
    monthly_storage_price: f64,
    io_price: Option<f64>,
}

impl DatabaseInstanceCost {
    pub async fn init(
        pricing: &dyn PricingSource,
        region: &str,
        settings: &PricingConfig,
    ) -> Result<Self> {
        let engine = PriceFilter::new("databaseEngine", settings.database_engine.clone());
        let deployment = PriceFilter::new("deploymentOption", settings.database_deployment.clone());
        let families = [
            PriceFamily::required(
                INSTANCE_FAMILY,
                vec![
                    PriceFilter::new("productFamily", INSTANCE_FAMILY),
                    engine.clone(),
                    deployment.clone(),
                ],
            ),
            PriceFamily::required(
                STORAGE_FAMILY,
                vec![
                    PriceFilter::new("productFamily", STORAGE_FAMILY),
                    PriceFilter::new("volumeType", settings.database_volume_type.clone()),
                    deployment,
                ],
            ),
            // Provisioned-IOPS and gp3 volumes have no per-request price.
            PriceFamily::optional(
                IO_FAMILY,
                vec![
                    PriceFilter::new("productFamily", IO_FAMILY),
                    PriceFilter::new("group", "Aurora I/O Operation"),
                ],
            ),
        ];
        let catalog = PricingCatalog::init(pricing, SERVICE_CODE, region, &families).await?;
        Self::from_catalog(catalog)
    }

    pub fn from_catalog(catalog: PricingCatalog) -> Result<Self> {
        let io_price = if catalog.has_unit(IO_UNIT) {
            Some(catalog.price_per_unit(IO_UNIT)?)
        } else {
            None
        };
        Ok(Self {
            monthly_storage_price: catalog.price_per_unit(STORAGE_UNIT)?,
            io_price,
            catalog: Arc::new(catalog),
        })
    }

    pub fn monthly_storage_price(&self) -> f64 {
        self.monthly_storage_price
    }

    pub fn io_price(&self) -> Option<f64> {
        self.io_price
    }

    /// Hourly on-demand price of an instance class.
    pub fn hourly_price(&self, instance_class: &str) -> Result<f64> {
        self.catalog
            .price_per_unit_where(INSTANCE_UNIT, INSTANCE_TYPE, instance_class)
    }

    pub fn calculate_for_dimension(&self, dimension: &MetricDimension) -> Result<PricingResult> {
        let window = dimension.window();
        let cost_window_seconds = window.cost_window_seconds()?;
        let seconds_in_month = window.seconds_in_month();

        let instance_class = dimension.instance_class().ok_or_else(|| CostError::Attribute {
            resource_id: dimension.resource().id.clone(),
            message: "instance class unknown".to_string(),
        })?;
        let instance_cost =
            self.hourly_price(instance_class)? * cost_window_seconds / SECONDS_PER_HOUR;

        let storage_gb = dimension.storage_bytes() / BYTES_PER_GB;
        let storage_cost =
            storage_gb * self.monthly_storage_price * cost_window_seconds / seconds_in_month;

        // Volume types without an I/O price include requests in the storage rate.
        let io_cost = match self.io_price {
            Some(price) => dimension.io_requests() * price,
            None => {
                if dimension.io_requests() > 0.0 {
                    debug!(
                        "{}: no I/O price for volume type, {} requests billed with storage",
                        dimension.resource().id,
                        dimension.io_requests()
                    );
                }
                0.0
            }
        };

        Ok(PricingResult::from_components(
            &[
                ("instanceCharges", instance_cost),
                ("storageCharges", storage_cost),
                ("ioCharges", io_cost),
            ],
            self.catalog.currency(),
            cost_window_seconds,
            seconds_in_month,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::dimension::Metric;
    use crate::pricing::PriceCatalogEntry;
    use crate::provider::{MockPricingSource, Resource, ServiceKind};
    use crate::window::TimeWindow;
    use chrono::{TimeZone, Utc};

    fn catalog(with_io: bool) -> PricingCatalog {
        let mut entries = vec![
            PriceCatalogEntry::new(INSTANCE_UNIT, 0.18, "USD", INSTANCE_FAMILY)
                .with_attribute(INSTANCE_TYPE, "db.t3.large"),
            PriceCatalogEntry::new(INSTANCE_UNIT, 0.36, "USD", INSTANCE_FAMILY)
                .with_attribute(INSTANCE_TYPE, "db.t3.xlarge"),
            PriceCatalogEntry::new(STORAGE_UNIT, 0.115, "USD", STORAGE_FAMILY),
        ];
        if with_io {
            entries.push(PriceCatalogEntry::new(IO_UNIT, 0.0000002, "USD", IO_FAMILY));
        }
        PricingCatalog::from_entries(SERVICE_CODE, "eu-west-1", entries)
    }

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 6, 10, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 10, 10, 5, 0).unwrap(),
        )
        .unwrap()
    }

    fn instance(class: Option<&str>, storage_gb: f64, ios: f64) -> MetricDimension {
        let mut builder = MetricDimension::builder(
            Resource::new("orders-db", ServiceKind::ManagedDatabaseInstance),
            window(),
        )
        .set(Metric::StorageBytes, storage_gb * BYTES_PER_GB)
        .set(Metric::IoRequests, ios);
        if let Some(class) = class {
            builder = builder.instance_class(class);
        }
        builder.build().unwrap()
    }

    #[test]
    fn test_instance_storage_and_io() {
        let calc = DatabaseInstanceCost::from_catalog(catalog(true)).unwrap();
        let result = calc
            .calculate_for_dimension(&instance(Some("db.t3.xlarge"), 100.0, 1_000_000.0))
            .unwrap();

        // One minute of a 0.36/hr instance
        assert!((result.component("instanceCharges") - 0.006).abs() < 1e-12);
        let expected_storage = 100.0 * 0.115 * 60.0 / 2_592_000.0;
        assert!((result.component("storageCharges") - expected_storage).abs() < 1e-12);
        assert!((result.component("ioCharges") - 0.2).abs() < 1e-12);
        assert!((result.total_cost - (0.006 + expected_storage + 0.2)).abs() < 1e-12);
    }

    #[test]
    fn test_io_bundled_with_storage_without_io_price() {
        let calc = DatabaseInstanceCost::from_catalog(catalog(false)).unwrap();
        assert_eq!(calc.io_price(), None);
        let result = calc
            .calculate_for_dimension(&instance(Some("db.t3.large"), 20.0, 5_000.0))
            .unwrap();
        assert_eq!(result.component("ioCharges"), 0.0);

        // The requests still show up as usage; only the separate charge is absent.
        let priced = DatabaseInstanceCost::from_catalog(catalog(true))
            .unwrap()
            .calculate_for_dimension(&instance(Some("db.t3.large"), 20.0, 5_000.0))
            .unwrap();
        assert!(priced.component("ioCharges") > 0.0);
        let without_io = priced.total_cost - priced.component("ioCharges");
        assert!((result.total_cost - without_io).abs() < 1e-12);
    }

    #[test]
    fn test_unknown_instance_class() {
        let calc = DatabaseInstanceCost::from_catalog(catalog(true)).unwrap();
        assert!(matches!(
            calc.calculate_for_dimension(&instance(Some("db.m5.24xlarge"), 20.0, 0.0)),
            Err(CostError::PriceNotFound { .. })
        ));
        assert!(matches!(
            calc.calculate_for_dimension(&instance(None, 20.0, 0.0)),
            Err(CostError::Attribute { .. })
        ));
    }

    #[tokio::test]
    async fn test_init_filters_on_engine_and_deployment() {
        let mut source = MockPricingSource::new();
        source
            .expect_get_products()
            .times(3)
            .returning(|filters: &[PriceFilter], _: &str, service: &str| {
                assert_eq!(service, SERVICE_CODE);
                let family = filters[0].value.as_str();
                if family != IO_FAMILY {
                    assert!(filters
                        .iter()
                        .any(|f| f.field == "deploymentOption" && f.value == "Single-AZ"));
                }
                match family {
                    INSTANCE_FAMILY => {
                        assert!(filters
                            .iter()
                            .any(|f| f.field == "databaseEngine" && f.value == "PostgreSQL"));
                        Ok(vec![PriceCatalogEntry::new(INSTANCE_UNIT, 0.18, "USD", family)
                            .with_attribute(INSTANCE_TYPE, "db.t3.large")])
                    }
                    STORAGE_FAMILY => {
                        Ok(vec![PriceCatalogEntry::new(STORAGE_UNIT, 0.115, "USD", family)])
                    }
                    _ => Ok(Vec::new()),
                }
            });

        let config = Config::default();
        let calc = DatabaseInstanceCost::init(&source, "eu-west-1", &config.pricing)
            .await
            .unwrap();
        assert_eq!(calc.hourly_price("db.t3.large").unwrap(), 0.18);
        assert_eq!(calc.monthly_storage_price(), 0.115);
        assert_eq!(calc.io_price(), None);
    }
}
