//! Collaborator contracts for the estimation core
//!
//! The core never talks to a cloud API directly. Metric queries, price
//! lookups, resource attribute lookups and emission all go through the traits
//! below; the AWS SDK implementations live in `src/aws/` and are assembled in
//! `main.rs`.

use crate::error::Result;
use crate::pricing::PriceCatalogEntry;
use crate::window::TimeWindow;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Resource identifier (function name, table name, DB instance identifier)
pub type ResourceId = String;

/// Kind of cloud service a resource belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    ComputeFunction,
    ManagedDatabaseInstance,
    KeyValueTable,
}

impl ServiceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceKind::ComputeFunction => "compute_function",
            ServiceKind::ManagedDatabaseInstance => "managed_database_instance",
            ServiceKind::KeyValueTable => "key_value_table",
        }
    }
}

impl fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ServiceKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "compute_function" | "lambda" | "function" => Ok(ServiceKind::ComputeFunction),
            "managed_database_instance" | "rds" | "database" => {
                Ok(ServiceKind::ManagedDatabaseInstance)
            }
            "key_value_table" | "dynamodb" | "table" => Ok(ServiceKind::KeyValueTable),
            other => Err(format!("unknown service kind: {}", other)),
        }
    }
}

/// A priced resource. Owned by discovery; read-only to the core.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resource {
    pub id: ResourceId,
    pub service: ServiceKind,
}

impl Resource {
    pub fn new(id: impl Into<String>, service: ServiceKind) -> Self {
        Self {
            id: id.into(),
            service,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Statistic {
    Average,
    Sum,
    Maximum,
    Minimum,
    SampleCount,
}

/// A statistics request against the metric collaborator
#[derive(Debug, Clone, PartialEq)]
pub struct MetricQuery {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<(String, String)>,
    pub window: TimeWindow,
    pub period_secs: u32,
    pub statistic: Statistic,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Datapoint {
    pub timestamp: DateTime<Utc>,
    pub value: f64,
}

/// Arithmetic mean of a series; an empty series is zero usage.
pub fn average(points: &[Datapoint]) -> f64 {
    if points.is_empty() {
        return 0.0;
    }
    points.iter().map(|p| p.value).sum::<f64>() / points.len() as f64
}

/// Product attribute filter for price lookups
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceFilter {
    pub field: String,
    pub value: String,
}

impl PriceFilter {
    pub fn new(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// One resource's cost over a whole window, as published to the metric store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostDatum {
    pub resource: Resource,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
}

/// The record handed to the emission sink
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostRecord {
    pub cost: f64,
    pub timestamp: DateTime<Utc>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricSource: Send + Sync {
    async fn get_statistics(&self, query: &MetricQuery) -> Result<Vec<Datapoint>>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MetricPublisher: Send + Sync {
    async fn put_cost_metric(&self, datum: &CostDatum) -> Result<()>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PricingSource: Send + Sync {
    /// Products matching every filter; no match is an empty list.
    async fn get_products(
        &self,
        filters: &[PriceFilter],
        region: &str,
        service_code: &str,
    ) -> Result<Vec<PriceCatalogEntry>>;
}

/// Sizing facts about a managed database instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInstanceInfo {
    pub instance_class: String,
    pub allocated_storage_gb: f64,
}

/// Facts about a resource that are not published as metrics
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ResourceAttributes: Send + Sync {
    async fn function_memory_mb(&self, function_id: &str) -> Result<f64>;

    async fn table_size_bytes(&self, table_id: &str) -> Result<f64>;

    async fn database_instance(&self, instance_id: &str) -> Result<DatabaseInstanceInfo>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CostSink: Send + Sync {
    async fn emit(&self, record: &CostRecord) -> Result<()>;
}
