//! Cross-service cost roll-up
//!
//! The aggregator does not price anything itself. It reads back the per-resource
//! cost metric that `CostEstimator` publishes, averages each series, and sums
//! the averages into one figure for the whole fleet.

use crate::calculator::monthly_estimate;
use crate::config::MetricsConfig;
use crate::error::Result;
use crate::provider::{average, MetricQuery, MetricSource, Resource, Statistic};
use crate::window::TimeWindow;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Summed cost of a set of resources over one window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AggregateCost {
    pub total_cost: f64,
    pub estimated_monthly_charge: f64,
    pub window: TimeWindow,
    pub resource_count: usize,
}

pub struct CostAggregator {
    metrics: Arc<dyn MetricSource>,
    config: MetricsConfig,
}

impl CostAggregator {
    pub fn new(metrics: Arc<dyn MetricSource>, config: MetricsConfig) -> Self {
        Self { metrics, config }
    }

    fn cost_query(&self, resource: &Resource, window: TimeWindow) -> MetricQuery {
        MetricQuery {
            namespace: self.config.namespace.clone(),
            metric_name: self.config.cost_metric_name.clone(),
            dimensions: vec![
                (
                    self.config.service_dimension.clone(),
                    resource.service.to_string(),
                ),
                (self.config.resource_dimension.clone(), resource.id.clone()),
            ],
            window,
            period_secs: self.config.period_secs,
            statistic: Statistic::Average,
        }
    }

    /// Sum the average cost contribution of every resource.
    ///
    /// All queries run concurrently. The first failure fails the whole
    /// aggregate; nothing partial is returned.
    pub async fn aggregate(&self, resources: &[Resource], window: TimeWindow) -> Result<AggregateCost> {
        let mut handles = Vec::with_capacity(resources.len());
        for resource in resources {
            let metrics = Arc::clone(&self.metrics);
            let query = self.cost_query(resource, window);
            let resource_id = resource.id.clone();
            handles.push(tokio::spawn(async move {
                let points = metrics.get_statistics(&query).await?;
                let contribution = average(&points);
                debug!(
                    "Cost contribution for {}: {} ({} datapoints)",
                    resource_id,
                    contribution,
                    points.len()
                );
                Ok::<f64, crate::error::CostError>(contribution)
            }));
        }

        let mut total_cost = 0.0;
        for handle in handles {
            total_cost += handle.await??;
        }

        // Published costs cover the whole window (see `estimator::window_cost`).
        let estimated_monthly_charge =
            monthly_estimate(total_cost, window.duration_seconds(), window.seconds_in_month());

        info!(
            "Aggregated {} resources: {} this window, {} projected monthly",
            resources.len(),
            total_cost,
            estimated_monthly_charge
        );

        Ok(AggregateCost {
            total_cost,
            estimated_monthly_charge,
            window,
            resource_count: resources.len(),
        })
    }
}
