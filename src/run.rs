//! Periodic entry points
//!
//! A scheduler invokes one of these per tick. Failures are logged and folded
//! into a `RunStatus`; nothing is retried and nothing partial is emitted.

use crate::aggregator::CostAggregator;
use crate::error::{CostError, Result};
use crate::estimator::CostEstimator;
use crate::provider::{CostRecord, CostSink, Resource};
use crate::window::TimeWindow;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub const STATUS_OK: u16 = 200;
pub const STATUS_FAILED: u16 = 400;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunStatus {
    pub status: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl RunStatus {
    pub fn ok() -> Self {
        Self {
            status: STATUS_OK,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_FAILED,
            message: Some(message.into()),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.status == STATUS_OK
    }

    fn from_result(result: Result<()>) -> Self {
        match result {
            Ok(()) => Self::ok(),
            Err(e) => {
                error!("Something went wrong: {}", e);
                Self::failed(e.to_string())
            }
        }
    }
}

/// Aggregate the fleet's published costs and emit the monthly projection.
pub async fn stream_costs(
    aggregator: &CostAggregator,
    sink: &dyn CostSink,
    resources: &[Resource],
    window: TimeWindow,
) -> RunStatus {
    let result = async {
        let aggregate = aggregator.aggregate(resources, window).await?;
        sink.emit(&CostRecord {
            cost: aggregate.estimated_monthly_charge,
            timestamp: window.end(),
        })
        .await?;
        info!(
            "Emitted monthly estimate {:.2} for {} resources",
            aggregate.estimated_monthly_charge, aggregate.resource_count
        );
        Ok::<(), CostError>(())
    }
    .await;
    RunStatus::from_result(result)
}

/// Price every resource and publish its window cost as a metric.
pub async fn publish_costs(
    estimator: &CostEstimator,
    resources: &[Resource],
    window: TimeWindow,
) -> RunStatus {
    let result = async {
        let costs = estimator.estimate(resources, window).await?;
        info!("Published costs for {} resources", costs.len());
        Ok::<(), CostError>(())
    }
    .await;
    RunStatus::from_result(result)
}
