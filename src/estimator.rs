//! Per-resource cost estimation
//!
//! One run initializes a calculator per distinct service, fetches a
//! `MetricDimension` for every resource, prices it, and optionally publishes
//! each resource's window cost as a metric so `CostAggregator` can read it
//! back later.

use crate::calculator::{CostCalculator, PricingResult};
use crate::config::Config;
use crate::dimension::MetricDimension;
use crate::error::{CostError, Result};
use crate::provider::{
    CostDatum, MetricPublisher, MetricSource, PricingSource, Resource, ResourceAttributes,
    ServiceKind,
};
use crate::window::TimeWindow;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, info};

/// A priced resource
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceCost {
    pub resource: Resource,
    pub result: PricingResult,
}

/// Cost of the whole window, the figure published to the metric store.
///
/// `total_cost` covers one cost window; scaling it up to the full window
/// lets the aggregator extrapolate with `window.duration_seconds()` and land
/// on the same monthly charge as the per-resource estimate.
pub fn window_cost(result: &PricingResult, window: &TimeWindow) -> f64 {
    result.total_cost * window.duration_seconds() / result.cost_window_seconds
}

pub struct CostEstimator {
    pricing: Arc<dyn PricingSource>,
    metrics: Arc<dyn MetricSource>,
    attributes: Arc<dyn ResourceAttributes>,
    publisher: Option<Arc<dyn MetricPublisher>>,
    config: Arc<Config>,
}

impl CostEstimator {
    pub fn new(
        pricing: Arc<dyn PricingSource>,
        metrics: Arc<dyn MetricSource>,
        attributes: Arc<dyn ResourceAttributes>,
        config: Config,
    ) -> Self {
        Self {
            pricing,
            metrics,
            attributes,
            publisher: None,
            config: Arc::new(config),
        }
    }

    /// Publish each resource's cost to the metric store after pricing it.
    pub fn with_publisher(mut self, publisher: Arc<dyn MetricPublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    /// Build one calculator per distinct service, concurrently.
    pub async fn init_calculators(
        &self,
        services: &BTreeSet<ServiceKind>,
    ) -> Result<BTreeMap<ServiceKind, Arc<CostCalculator>>> {
        let region = self.config.aws.region.as_str();
        let settings = &self.config.pricing;
        let inits = services.iter().map(|service| async move {
            let calculator =
                CostCalculator::init(*service, self.pricing.as_ref(), region, settings).await?;
            debug!("Initialized {} calculator for {}", service, region);
            Ok::<_, CostError>((*service, Arc::new(calculator)))
        });
        let calculators = futures::future::try_join_all(inits).await?;
        Ok(calculators.into_iter().collect())
    }

    /// Price every resource over `window`.
    ///
    /// Results come back in the order of `resources`. Any failure fails the
    /// whole estimate.
    pub async fn estimate(
        &self,
        resources: &[Resource],
        window: TimeWindow,
    ) -> Result<Vec<ResourceCost>> {
        // Reject unusable windows before any collaborator is called.
        window.cost_window_seconds()?;

        let services: BTreeSet<ServiceKind> = resources.iter().map(|r| r.service).collect();
        let calculators = self.init_calculators(&services).await?;

        let mut handles = Vec::with_capacity(resources.len());
        for resource in resources {
            let calculator = calculators
                .get(&resource.service)
                .cloned()
                .ok_or_else(|| CostError::ServiceMismatch {
                    expected: "an initialized calculator".to_string(),
                    actual: resource.service.to_string(),
                })?;
            let resource = resource.clone();
            let metrics = Arc::clone(&self.metrics);
            let attributes = Arc::clone(&self.attributes);
            let publisher = self.publisher.clone();
            let config = Arc::clone(&self.config);

            handles.push(tokio::spawn(async move {
                let dimension = MetricDimension::fetch(
                    &resource,
                    window,
                    metrics.as_ref(),
                    attributes.as_ref(),
                    &config.metrics,
                )
                .await?;
                let result = calculator.calculate_for_dimension(&dimension)?;
                info!(
                    "{} {}: {:.6} {} per {}s window, {:.2} projected monthly",
                    resource.service,
                    resource.id,
                    result.total_cost,
                    result.currency,
                    result.cost_window_seconds,
                    result.estimated_monthly_charge
                );

                if let Some(publisher) = publisher {
                    publisher
                        .put_cost_metric(&CostDatum {
                            resource: resource.clone(),
                            value: window_cost(&result, &window),
                            timestamp: window.end(),
                        })
                        .await?;
                }

                Ok::<_, CostError>(ResourceCost { resource, result })
            }));
        }

        let mut costs = Vec::with_capacity(handles.len());
        for handle in handles {
            costs.push(handle.await??);
        }
        Ok(costs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::PriceCatalogEntry;
    use crate::provider::{
        MetricQuery, MockMetricPublisher, MockMetricSource, MockPricingSource,
        MockResourceAttributes, PriceFilter,
    };
    use chrono::{TimeZone, Utc};

    fn window() -> TimeWindow {
        TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 6, 10, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 10, 10, 5, 0).unwrap(),
        )
        .unwrap()
    }

    fn table_pricing() -> MockPricingSource {
        let mut pricing = MockPricingSource::new();
        pricing
            .expect_get_products()
            .returning(|filters: &[PriceFilter], _: &str, _: &str| {
                if filters.iter().any(|f| f.value == "Database Storage") {
                    Ok(vec![PriceCatalogEntry::new("GB-Mo", 0.25, "USD", "Database Storage")])
                } else {
                    Ok(vec![
                        PriceCatalogEntry::new("ReadRequestUnits", 0.00025, "USD", "Throughput"),
                        PriceCatalogEntry::new("WriteRequestUnits", 0.00125, "USD", "Throughput"),
                    ])
                }
            });
        pricing
    }

    fn table_metrics() -> MockMetricSource {
        let mut metrics = MockMetricSource::new();
        metrics
            .expect_get_statistics()
            .returning(|query: &MetricQuery| {
                let value = match query.metric_name.as_str() {
                    "ConsumedReadCapacityUnits" => 10.0,
                    "ConsumedWriteCapacityUnits" => 5.0,
                    other => panic!("unexpected metric {}", other),
                };
                Ok(vec![crate::provider::Datapoint {
                    timestamp: query.window.start(),
                    value,
                }])
            });
        metrics
    }

    fn table_attributes() -> MockResourceAttributes {
        let mut attributes = MockResourceAttributes::new();
        attributes
            .expect_table_size_bytes()
            .returning(|_| Ok(1_000_000_000.0));
        attributes
    }

    #[tokio::test]
    async fn test_estimate_and_publish() {
        let mut publisher = MockMetricPublisher::new();
        publisher
            .expect_put_cost_metric()
            .times(2)
            .returning(|datum: &CostDatum| {
                assert_eq!(datum.resource.service, ServiceKind::KeyValueTable);
                assert!(datum.value > 0.0);
                Ok(())
            });

        let estimator = CostEstimator::new(
            Arc::new(table_pricing()),
            Arc::new(table_metrics()),
            Arc::new(table_attributes()),
            Config::default(),
        )
        .with_publisher(Arc::new(publisher));

        let resources = vec![
            Resource::new("orders", ServiceKind::KeyValueTable),
            Resource::new("customers", ServiceKind::KeyValueTable),
        ];
        let costs = estimator.estimate(&resources, window()).await.unwrap();

        assert_eq!(costs.len(), 2);
        assert_eq!(costs[0].resource.id, "orders");
        assert_eq!(costs[1].resource.id, "customers");
        for cost in &costs {
            assert!((cost.result.component("readRequestCharges") - 0.0025).abs() < 1e-12);
            assert!((cost.result.component("writeRequestCharges") - 0.00625).abs() < 1e-12);
        }
    }

    #[tokio::test]
    async fn test_published_value_covers_whole_window() {
        let published = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&published);
        let mut publisher = MockMetricPublisher::new();
        publisher
            .expect_put_cost_metric()
            .times(1)
            .returning(move |datum: &CostDatum| {
                sink.lock().unwrap().push(datum.value);
                Ok(())
            });

        let estimator = CostEstimator::new(
            Arc::new(table_pricing()),
            Arc::new(table_metrics()),
            Arc::new(table_attributes()),
            Config::default(),
        )
        .with_publisher(Arc::new(publisher));

        let costs = estimator
            .estimate(&[Resource::new("orders", ServiceKind::KeyValueTable)], window())
            .await
            .unwrap();

        // Five one-minute cost windows in a five-minute window
        let value = published.lock().unwrap()[0];
        assert!((value - costs[0].result.total_cost * 5.0).abs() < 1e-12);
        assert!((value - window_cost(&costs[0].result, &window())).abs() < 1e-15);
    }

    #[tokio::test]
    async fn test_sub_minute_window_rejected_before_any_call() {
        let estimator = CostEstimator::new(
            Arc::new(MockPricingSource::new()),
            Arc::new(MockMetricSource::new()),
            Arc::new(MockResourceAttributes::new()),
            Config::default(),
        );
        let short = TimeWindow::new(
            Utc.with_ymd_and_hms(2024, 6, 10, 10, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 10, 10, 0, 30).unwrap(),
        )
        .unwrap();

        let result = estimator
            .estimate(&[Resource::new("orders", ServiceKind::KeyValueTable)], short)
            .await;
        assert!(matches!(result, Err(CostError::InvalidWindow(_))));
    }

    #[tokio::test]
    async fn test_missing_price_family_fails_estimate() {
        let mut pricing = MockPricingSource::new();
        pricing.expect_get_products().returning(|_, _, _| Ok(Vec::new()));

        let estimator = CostEstimator::new(
            Arc::new(pricing),
            Arc::new(MockMetricSource::new()),
            Arc::new(MockResourceAttributes::new()),
            Config::default(),
        );
        let result = estimator
            .estimate(&[Resource::new("orders", ServiceKind::KeyValueTable)], window())
            .await;
        assert!(matches!(result, Err(CostError::MissingPriceFamily { .. })));
    }

    #[tokio::test]
    async fn test_no_resources_is_empty() {
        let estimator = CostEstimator::new(
            Arc::new(MockPricingSource::new()),
            Arc::new(MockMetricSource::new()),
            Arc::new(MockResourceAttributes::new()),
            Config::default(),
        );
        let costs = estimator.estimate(&[], window()).await.unwrap();
        assert!(costs.is_empty());
    }
}
