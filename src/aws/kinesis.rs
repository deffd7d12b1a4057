//! Kinesis cost sink

use crate::error::{CostError, Result};
use crate::provider::{CostRecord, CostSink};
use crate::retry::{ExponentialBackoffPolicy, RetryPolicy};
use async_trait::async_trait;
use aws_sdk_kinesis::primitives::Blob;
use aws_sdk_kinesis::Client as KinesisClient;
use tracing::debug;

pub struct KinesisSink {
    client: KinesisClient,
    stream_name: String,
    partition_key: String,
}

impl KinesisSink {
    pub fn new(
        client: KinesisClient,
        stream_name: impl Into<String>,
        partition_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            stream_name: stream_name.into(),
            partition_key: partition_key.into(),
        }
    }
}

#[async_trait]
impl CostSink for KinesisSink {
    async fn emit(&self, record: &CostRecord) -> Result<()> {
        let payload = serde_json::to_vec(record)?;

        let response = ExponentialBackoffPolicy::default_policy()
            .execute_with_retry(|| async {
                self.client
                    .put_record()
                    .stream_name(&self.stream_name)
                    .partition_key(&self.partition_key)
                    .data(Blob::new(payload.clone()))
                    .send()
                    .await
                    .map_err(|e| {
                        CostError::Sink(format!("PutRecord to {} failed: {}", self.stream_name, e))
                    })
            })
            .await?;

        debug!(
            "Put cost record to {} (shard {:?}, sequence {:?})",
            self.stream_name,
            response.shard_id(),
            response.sequence_number()
        );
        Ok(())
    }
}
