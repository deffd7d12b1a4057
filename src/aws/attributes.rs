//! Resource sizing lookups (function memory, table size, DB instance class)

use crate::error::{CostError, Result};
use crate::provider::{DatabaseInstanceInfo, ResourceAttributes};
use crate::retry::{ExponentialBackoffPolicy, RetryPolicy};
use async_trait::async_trait;
use aws_sdk_dynamodb::Client as DynamoDbClient;
use aws_sdk_lambda::Client as LambdaClient;
use aws_sdk_rds::Client as RdsClient;

pub struct AwsResourceAttributes {
    lambda: LambdaClient,
    dynamodb: DynamoDbClient,
    rds: RdsClient,
}

impl AwsResourceAttributes {
    pub fn new(lambda: LambdaClient, dynamodb: DynamoDbClient, rds: RdsClient) -> Self {
        Self {
            lambda,
            dynamodb,
            rds,
        }
    }
}

fn attribute_error(resource_id: &str, message: impl Into<String>) -> CostError {
    CostError::Attribute {
        resource_id: resource_id.to_string(),
        message: message.into(),
    }
}

#[async_trait]
impl ResourceAttributes for AwsResourceAttributes {
    async fn function_memory_mb(&self, function_id: &str) -> Result<f64> {
        let config = ExponentialBackoffPolicy::for_cloud_api()
            .execute_with_retry(|| async {
                self.lambda
                    .get_function_configuration()
                    .function_name(function_id)
                    .send()
                    .await
                    .map_err(|e| {
                        attribute_error(function_id, format!("GetFunctionConfiguration failed: {}", e))
                    })
            })
            .await?;

        config
            .memory_size()
            .map(f64::from)
            .ok_or_else(|| attribute_error(function_id, "function has no memory size"))
    }

    async fn table_size_bytes(&self, table_id: &str) -> Result<f64> {
        let response = ExponentialBackoffPolicy::for_cloud_api()
            .execute_with_retry(|| async {
                self.dynamodb
                    .describe_table()
                    .table_name(table_id)
                    .send()
                    .await
                    .map_err(|e| attribute_error(table_id, format!("DescribeTable failed: {}", e)))
            })
            .await?;

        // Size is refreshed roughly every six hours; a new table reports none.
        Ok(response
            .table()
            .and_then(|t| t.table_size_bytes())
            .unwrap_or(0) as f64)
    }

    async fn database_instance(&self, instance_id: &str) -> Result<DatabaseInstanceInfo> {
        let response = ExponentialBackoffPolicy::for_cloud_api()
            .execute_with_retry(|| async {
                self.rds
                    .describe_db_instances()
                    .db_instance_identifier(instance_id)
                    .send()
                    .await
                    .map_err(|e| {
                        attribute_error(instance_id, format!("DescribeDBInstances failed: {}", e))
                    })
            })
            .await?;

        let instance = response
            .db_instances()
            .first()
            .ok_or_else(|| attribute_error(instance_id, "instance not found"))?;
        let instance_class = instance
            .db_instance_class()
            .ok_or_else(|| attribute_error(instance_id, "instance has no class"))?
            .to_string();
        let allocated_storage_gb = instance.allocated_storage().unwrap_or(0) as f64;

        Ok(DatabaseInstanceInfo {
            instance_class,
            allocated_storage_gb,
        })
    }
}
