//! Per-resource usage snapshots
//!
//! A `MetricDimension` holds the metric values one calculator needs for one
//! resource over one window. It is immutable once built; tests construct fixed
//! instances through `MetricDimension::builder`.

use crate::config::MetricsConfig;
use crate::error::{CostError, Result};
use crate::provider::{
    average, MetricQuery, MetricSource, Resource, ResourceAttributes, ServiceKind, Statistic,
};
use crate::window::TimeWindow;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::info;

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Calculators price usage per minute.
const SECONDS_PER_MINUTE: f64 = 60.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    RequestCount,
    AverageDurationMs,
    MemoryMb,
    ReadCapacityUnits,
    WriteCapacityUnits,
    StorageBytes,
    IoRequests,
    DataTransferOutInternetGb,
    DataTransferOutIntraRegionGb,
    DataTransferOutInterRegionGb,
}

impl Metric {
    pub fn name(&self) -> &'static str {
        match self {
            Metric::RequestCount => "requestCount",
            Metric::AverageDurationMs => "averageDurationMs",
            Metric::MemoryMb => "memoryMb",
            Metric::ReadCapacityUnits => "readCapacityUnits",
            Metric::WriteCapacityUnits => "writeCapacityUnits",
            Metric::StorageBytes => "storageBytes",
            Metric::IoRequests => "ioRequests",
            Metric::DataTransferOutInternetGb => "dataTransferOutInternetGb",
            Metric::DataTransferOutIntraRegionGb => "dataTransferOutIntraRegionGb",
            Metric::DataTransferOutInterRegionGb => "dataTransferOutInterRegionGb",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Where a metric comes from in the metric store
struct MetricSpec {
    metric: Metric,
    namespace: &'static str,
    metric_name: &'static str,
    dimension: &'static str,
    statistic: Statistic,
}

fn metric_specs(service: ServiceKind) -> Vec<MetricSpec> {
    match service {
        ServiceKind::ComputeFunction => vec![
            MetricSpec {
                metric: Metric::RequestCount,
                namespace: "AWS/Lambda",
                metric_name: "Invocations",
                dimension: "FunctionName",
                statistic: Statistic::Sum,
            },
            MetricSpec {
                metric: Metric::AverageDurationMs,
                namespace: "AWS/Lambda",
                metric_name: "Duration",
                dimension: "FunctionName",
                statistic: Statistic::Average,
            },
        ],
        ServiceKind::KeyValueTable => vec![
            MetricSpec {
                metric: Metric::ReadCapacityUnits,
                namespace: "AWS/DynamoDB",
                metric_name: "ConsumedReadCapacityUnits",
                dimension: "TableName",
                statistic: Statistic::Sum,
            },
            MetricSpec {
                metric: Metric::WriteCapacityUnits,
                namespace: "AWS/DynamoDB",
                metric_name: "ConsumedWriteCapacityUnits",
                dimension: "TableName",
                statistic: Statistic::Sum,
            },
        ],
        // Read and write IOPS land on the same metric and are summed below.
        ServiceKind::ManagedDatabaseInstance => vec![
            MetricSpec {
                metric: Metric::IoRequests,
                namespace: "AWS/RDS",
                metric_name: "ReadIOPS",
                dimension: "DBInstanceIdentifier",
                statistic: Statistic::Average,
            },
            MetricSpec {
                metric: Metric::IoRequests,
                namespace: "AWS/RDS",
                metric_name: "WriteIOPS",
                dimension: "DBInstanceIdentifier",
                statistic: Statistic::Average,
            },
        ],
    }
}

/// Resolved usage metrics for one resource over a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricDimension {
    resource: Resource,
    window: TimeWindow,
    values: BTreeMap<Metric, f64>,
    instance_class: Option<String>,
}

impl MetricDimension {
    pub fn builder(resource: Resource, window: TimeWindow) -> MetricDimensionBuilder {
        MetricDimensionBuilder {
            resource,
            window,
            values: BTreeMap::new(),
            instance_class: None,
        }
    }

    /// Query every metric the resource's service is priced on.
    ///
    /// Series are reduced to their mean; an empty series is zero usage.
    /// Per-period sums and per-second rates are rescaled to one minute, so
    /// the result does not depend on `period_secs`.
    pub async fn fetch(
        resource: &Resource,
        window: TimeWindow,
        metrics: &dyn MetricSource,
        attributes: &dyn ResourceAttributes,
        config: &MetricsConfig,
    ) -> Result<Self> {
        let specs = metric_specs(resource.service);
        let period_secs = config.period_secs as f64;
        let queries = specs.iter().map(|spec| {
            let query = MetricQuery {
                namespace: spec.namespace.to_string(),
                metric_name: spec.metric_name.to_string(),
                dimensions: vec![(spec.dimension.to_string(), resource.id.clone())],
                window,
                period_secs: config.period_secs,
                statistic: spec.statistic,
            };
            async move {
                let points = metrics.get_statistics(&query).await?;
                let mean = average(&points);
                let per_minute = match spec.statistic {
                    Statistic::Sum => mean * SECONDS_PER_MINUTE / period_secs,
                    _ => mean,
                };
                Ok::<_, CostError>((spec.metric, per_minute))
            }
        });
        let readings = futures::future::try_join_all(queries).await?;

        let mut builder = Self::builder(resource.clone(), window);
        for (metric, value) in readings {
            builder = builder.add(metric, value);
        }

        match resource.service {
            ServiceKind::ComputeFunction => {
                let memory = attributes.function_memory_mb(&resource.id).await?;
                builder = builder.set(Metric::MemoryMb, memory);
            }
            ServiceKind::KeyValueTable => {
                let size = attributes.table_size_bytes(&resource.id).await?;
                builder = builder.set(Metric::StorageBytes, size);
            }
            ServiceKind::ManagedDatabaseInstance => {
                let info = attributes.database_instance(&resource.id).await?;
                // IOPS averages are per second.
                let iops = builder.value(Metric::IoRequests);
                builder = builder
                    .set(Metric::IoRequests, iops * SECONDS_PER_MINUTE)
                    .set(Metric::StorageBytes, info.allocated_storage_gb * BYTES_PER_GIB)
                    .instance_class(info.instance_class);
            }
        }

        let dimension = builder.build()?;
        info!(
            "Metrics for {} {}: {}",
            resource.service,
            resource.id,
            dimension.summary()
        );
        Ok(dimension)
    }

    pub fn resource(&self) -> &Resource {
        &self.resource
    }

    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    /// Value of a metric; absent metrics are zero usage.
    pub fn get(&self, metric: Metric) -> f64 {
        self.values.get(&metric).copied().unwrap_or(0.0)
    }

    pub fn request_count(&self) -> f64 {
        self.get(Metric::RequestCount)
    }

    pub fn average_duration_ms(&self) -> f64 {
        self.get(Metric::AverageDurationMs)
    }

    pub fn memory_mb(&self) -> f64 {
        self.get(Metric::MemoryMb)
    }

    pub fn read_capacity_units(&self) -> f64 {
        self.get(Metric::ReadCapacityUnits)
    }

    pub fn write_capacity_units(&self) -> f64 {
        self.get(Metric::WriteCapacityUnits)
    }

    pub fn storage_bytes(&self) -> f64 {
        self.get(Metric::StorageBytes)
    }

    pub fn io_requests(&self) -> f64 {
        self.get(Metric::IoRequests)
    }

    pub fn instance_class(&self) -> Option<&str> {
        self.instance_class.as_deref()
    }

    /// Start a builder pre-filled with this dimension's values.
    pub fn to_builder(&self) -> MetricDimensionBuilder {
        MetricDimensionBuilder {
            resource: self.resource.clone(),
            window: self.window,
            values: self.values.clone(),
            instance_class: self.instance_class.clone(),
        }
    }

    fn summary(&self) -> String {
        let mut parts: Vec<String> = self
            .values
            .iter()
            .map(|(metric, value)| format!("{}={}", metric, value))
            .collect();
        if let Some(class) = &self.instance_class {
            parts.push(format!("instanceClass={}", class));
        }
        parts.join(", ")
    }
}

#[derive(Debug, Clone)]
pub struct MetricDimensionBuilder {
    resource: Resource,
    window: TimeWindow,
    values: BTreeMap<Metric, f64>,
    instance_class: Option<String>,
}

impl MetricDimensionBuilder {
    pub fn set(mut self, metric: Metric, value: f64) -> Self {
        self.values.insert(metric, value);
        self
    }

    fn add(mut self, metric: Metric, value: f64) -> Self {
        *self.values.entry(metric).or_insert(0.0) += value;
        self
    }

    fn value(&self, metric: Metric) -> f64 {
        self.values.get(&metric).copied().unwrap_or(0.0)
    }

    pub fn instance_class(mut self, class: impl Into<String>) -> Self {
        self.instance_class = Some(class.into());
        self
    }

    pub fn build(self) -> Result<MetricDimension> {
        if let Some((metric, value)) = self
            .values
            .iter()
            .find(|(_, v)| !v.is_finite() || **v < 0.0)
        {
            return Err(CostError::InvalidMetric {
                metric: metric.to_string(),
                value: *value,
            });
        }
        Ok(MetricDimension {
            resource: self.resource,
            window: self.window,
            values: self.values,
            instance_class: self.instance_class,
        })
    }
}
