//! Per-service cost calculators
//!
//! Each resource kind has one calculator variant. A calculator is built by
//! `init`, which loads the price families it needs and resolves the unit
//! prices up front: a missing family or unit fails here rather than on the
//! first calculation. After that, `calculate_for_dimension` is pure.
//!
//! All variants normalize the same way. Metrics are per-minute averages over
//! the window, so one cost window is `duration_seconds / duration_minutes`
//! long, and the monthly projection scales the window's cost by
//! `seconds_in_month / cost_window_seconds`.

pub mod database;
pub mod function;
pub mod table;

pub use database::DatabaseInstanceCost;
pub use function::ComputeFunctionCost;
pub use table::StorageTableCost;

use crate::config::PricingConfig;
use crate::dimension::MetricDimension;
use crate::error::{CostError, Result};
use crate::provider::{PricingSource, ServiceKind};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Itemized cost for one resource over one cost window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PricingResult {
    pub breakdown: BTreeMap<String, f64>,
    pub total_cost: f64,
    pub currency: String,
    pub cost_window_seconds: f64,
    pub estimated_monthly_charge: f64,
}

impl PricingResult {
    /// Build a result whose total is the sum of its components.
    pub fn from_components(
        components: &[(&str, f64)],
        currency: &str,
        cost_window_seconds: f64,
        seconds_in_month: f64,
    ) -> Self {
        let breakdown: BTreeMap<String, f64> = components
            .iter()
            .map(|(name, cost)| (name.to_string(), *cost))
            .collect();
        let total_cost: f64 = breakdown.values().sum();
        Self {
            breakdown,
            total_cost,
            currency: currency.to_string(),
            cost_window_seconds,
            estimated_monthly_charge: monthly_estimate(
                total_cost,
                cost_window_seconds,
                seconds_in_month,
            ),
        }
    }

    pub fn component(&self, name: &str) -> f64 {
        self.breakdown.get(name).copied().unwrap_or(0.0)
    }
}

/// Project the cost of one `cost_window_seconds` window onto a month.
pub fn monthly_estimate(total_cost: f64, cost_window_seconds: f64, seconds_in_month: f64) -> f64 {
    total_cost * (seconds_in_month / cost_window_seconds)
}

/// A calculator for one service kind
#[derive(Debug, Clone)]
pub enum CostCalculator {
    StorageTable(StorageTableCost),
    ComputeFunction(ComputeFunctionCost),
    DatabaseInstance(DatabaseInstanceCost),
}

impl CostCalculator {
    pub async fn init(
        service: ServiceKind,
        pricing: &dyn PricingSource,
        region: &str,
        settings: &PricingConfig,
    ) -> Result<Self> {
        let calculator = match service {
            ServiceKind::KeyValueTable => {
                CostCalculator::StorageTable(StorageTableCost::init(pricing, region).await?)
            }
            ServiceKind::ComputeFunction => {
                CostCalculator::ComputeFunction(ComputeFunctionCost::init(pricing, region).await?)
            }
            ServiceKind::ManagedDatabaseInstance => CostCalculator::DatabaseInstance(
                DatabaseInstanceCost::init(pricing, region, settings).await?,
            ),
        };
        Ok(calculator)
    }

    pub fn service(&self) -> ServiceKind {
        match self {
            CostCalculator::StorageTable(_) => ServiceKind::KeyValueTable,
            CostCalculator::ComputeFunction(_) => ServiceKind::ComputeFunction,
            CostCalculator::DatabaseInstance(_) => ServiceKind::ManagedDatabaseInstance,
        }
    }

    pub fn calculate_for_dimension(&self, dimension: &MetricDimension) -> Result<PricingResult> {
        let actual = dimension.resource().service;
        if actual != self.service() {
            return Err(CostError::ServiceMismatch {
                expected: self.service().to_string(),
                actual: actual.to_string(),
            });
        }
        match self {
            CostCalculator::StorageTable(c) => c.calculate_for_dimension(dimension),
            CostCalculator::ComputeFunction(c) => c.calculate_for_dimension(dimension),
            CostCalculator::DatabaseInstance(c) => c.calculate_for_dimension(dimension),
        }
    }
}
