//! coststream library
//!
//! Cost estimation core for serverless AWS resources: price catalogs, usage
//! dimensions, per-service calculators and the fleet-wide aggregator, plus
//! the AWS adapters the CLI wires them to.

pub mod aggregator;
pub mod aws;
pub mod calculator;
pub mod config;
pub mod dimension;
pub mod error;
pub mod estimator;
pub mod exit_codes;
pub mod pricing;
pub mod provider;
pub mod retry;
pub mod run;
pub mod sink;
pub mod utils;
pub mod window;

// Re-export commonly used types
pub use aggregator::{AggregateCost, CostAggregator};
pub use calculator::{CostCalculator, PricingResult};
pub use config::Config;
pub use dimension::{Metric, MetricDimension};
pub use error::{CostError, Result};
pub use estimator::{CostEstimator, ResourceCost};
pub use pricing::{PriceCatalogEntry, PricingCatalog};
pub use provider::{Resource, ServiceKind};
pub use window::TimeWindow;
