//! AWS implementations of the collaborator traits
//!
//! ## Module Organization
//!
//! - `cloudwatch`: metric statistics and cost metric publishing
//! - `pricing`: Price List API lookups
//! - `attributes`: Lambda, DynamoDB and RDS sizing lookups
//! - `kinesis`: cost record emission
//!
//! Every SDK call goes through `ExponentialBackoffPolicy::for_cloud_api()`.
//! Clients are built once per process in `AwsCollaborators::load` and handed
//! to the core as trait objects.

mod attributes;
mod cloudwatch;
mod kinesis;
mod pricing;

pub use attributes::AwsResourceAttributes;
pub use cloudwatch::CloudWatchMetrics;
pub use kinesis::KinesisSink;
pub use pricing::{request_filters, AwsPricing};

use crate::config::Config;
use crate::error::Result;
use aws_config::{BehaviorVersion, Region};
use std::sync::Arc;
use tracing::debug;

/// The process-wide SDK-backed collaborators
pub struct AwsCollaborators {
    pub metrics: Arc<CloudWatchMetrics>,
    pub pricing: Arc<AwsPricing>,
    pub attributes: Arc<AwsResourceAttributes>,
    kinesis: aws_sdk_kinesis::Client,
}

impl AwsCollaborators {
    pub async fn load(config: &Config) -> Self {
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws.region.clone()))
            .load()
            .await;
        // The Price List API is only served from a few regions.
        let pricing_config = aws_config::defaults(BehaviorVersion::latest())
            .region(Region::new(config.aws.pricing_region.clone()))
            .load()
            .await;
        debug!(
            "AWS clients for {} (pricing via {})",
            config.aws.region, config.aws.pricing_region
        );

        Self {
            metrics: Arc::new(CloudWatchMetrics::new(
                aws_sdk_cloudwatch::Client::new(&sdk_config),
                config.metrics.clone(),
            )),
            pricing: Arc::new(AwsPricing::new(aws_sdk_pricing::Client::new(&pricing_config))),
            attributes: Arc::new(AwsResourceAttributes::new(
                aws_sdk_lambda::Client::new(&sdk_config),
                aws_sdk_dynamodb::Client::new(&sdk_config),
                aws_sdk_rds::Client::new(&sdk_config),
            )),
            kinesis: aws_sdk_kinesis::Client::new(&sdk_config),
        }
    }

    /// A sink writing to the configured stream.
    pub fn kinesis_sink(&self, config: &Config) -> Result<KinesisSink> {
        Ok(KinesisSink::new(
            self.kinesis.clone(),
            config.stream_name()?,
            config.stream.partition_key.clone(),
        ))
    }
}
