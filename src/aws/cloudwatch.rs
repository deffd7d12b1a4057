//! CloudWatch metric source and cost metric publisher

use crate::config::MetricsConfig;
use crate::error::{CostError, Result};
use crate::provider::{CostDatum, Datapoint, MetricPublisher, MetricQuery, MetricSource, Statistic};
use crate::retry::{ExponentialBackoffPolicy, RetryPolicy};
use async_trait::async_trait;
use aws_sdk_cloudwatch::primitives::DateTime as AwsDateTime;
use aws_sdk_cloudwatch::types::{Dimension, MetricDatum, StandardUnit};
use aws_sdk_cloudwatch::Client as CloudWatchClient;
use chrono::{DateTime, Utc};

pub struct CloudWatchMetrics {
    client: CloudWatchClient,
    config: MetricsConfig,
}

impl CloudWatchMetrics {
    pub fn new(client: CloudWatchClient, config: MetricsConfig) -> Self {
        Self { client, config }
    }
}

fn to_aws_time(at: DateTime<Utc>) -> AwsDateTime {
    AwsDateTime::from_secs(at.timestamp())
}

fn from_aws_time(at: &AwsDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(at.secs(), at.subsec_nanos())
}

fn to_aws_statistic(statistic: Statistic) -> aws_sdk_cloudwatch::types::Statistic {
    use aws_sdk_cloudwatch::types::Statistic as Aws;
    match statistic {
        Statistic::Average => Aws::Average,
        Statistic::Sum => Aws::Sum,
        Statistic::Maximum => Aws::Maximum,
        Statistic::Minimum => Aws::Minimum,
        Statistic::SampleCount => Aws::SampleCount,
    }
}

fn statistic_value(point: &aws_sdk_cloudwatch::types::Datapoint, statistic: Statistic) -> Option<f64> {
    match statistic {
        Statistic::Average => point.average(),
        Statistic::Sum => point.sum(),
        Statistic::Maximum => point.maximum(),
        Statistic::Minimum => point.minimum(),
        Statistic::SampleCount => point.sample_count(),
    }
}

fn resource_of(query: &MetricQuery) -> String {
    query
        .dimensions
        .last()
        .map(|(_, value)| value.clone())
        .unwrap_or_default()
}

#[async_trait]
impl MetricSource for CloudWatchMetrics {
    async fn get_statistics(&self, query: &MetricQuery) -> Result<Vec<Datapoint>> {
        let dimensions: Vec<Dimension> = query
            .dimensions
            .iter()
            .map(|(name, value)| Dimension::builder().name(name).value(value).build())
            .collect();

        let response = ExponentialBackoffPolicy::for_cloud_api()
            .execute_with_retry(|| async {
                self.client
                    .get_metric_statistics()
                    .namespace(&query.namespace)
                    .metric_name(&query.metric_name)
                    .set_dimensions(Some(dimensions.clone()))
                    .start_time(to_aws_time(query.window.start()))
                    .end_time(to_aws_time(query.window.end()))
                    .period(query.period_secs as i32)
                    .statistics(to_aws_statistic(query.statistic))
                    .send()
                    .await
                    .map_err(|e| {
                        CostError::metric_unavailable(
                            query.metric_name.clone(),
                            resource_of(query),
                            format!("GetMetricStatistics failed: {}", e),
                        )
                    })
            })
            .await?;

        let points = response
            .datapoints()
            .iter()
            .filter_map(|point| {
                let timestamp = point.timestamp().and_then(from_aws_time)?;
                let value = statistic_value(point, query.statistic)?;
                Some(Datapoint { timestamp, value })
            })
            .collect();
        Ok(points)
    }
}

#[async_trait]
impl MetricPublisher for CloudWatchMetrics {
    async fn put_cost_metric(&self, datum: &CostDatum) -> Result<()> {
        let metric = MetricDatum::builder()
            .metric_name(&self.config.cost_metric_name)
            .timestamp(to_aws_time(datum.timestamp))
            .value(datum.value)
            .unit(StandardUnit::Count)
            .dimensions(
                Dimension::builder()
                    .name(&self.config.service_dimension)
                    .value(datum.resource.service.as_str())
                    .build(),
            )
            .dimensions(
                Dimension::builder()
                    .name(&self.config.resource_dimension)
                    .value(&datum.resource.id)
                    .build(),
            )
            .build();

        ExponentialBackoffPolicy::for_cloud_api()
            .execute_with_retry(|| async {
                self.client
                    .put_metric_data()
                    .namespace(&self.config.namespace)
                    .metric_data(metric.clone())
                    .send()
                    .await
                    .map(|_| ())
                    .map_err(|e| {
                        CostError::metric_unavailable(
                            self.config.cost_metric_name.clone(),
                            datum.resource.id.clone(),
                            format!("PutMetricData failed: {}", e),
                        )
                    })
            })
            .await
    }
}
