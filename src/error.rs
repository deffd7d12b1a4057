//! Error types for coststream
//!
//! There are two error types: `CostError` (main error enum) and `ConfigError`
//! (configuration-specific).
//!
//! ## Error Handling Philosophy
//!
//! Library code uses `crate::error::Result<T>` which returns `CostError`.
//! The CLI uses `anyhow::Result<T>` for top-level reporting; the run adapters
//! in `src/run.rs` additionally collapse failures into a coarse status/message
//! pair for schedulers that only look at that.
//!
//! ## Taxonomy
//!
//! - `PriceNotFound`: no catalog entry matches a requested unit. Fatal to the
//!   calculation for that resource.
//! - `MissingPriceFamily`: a required price family returned no entries while a
//!   calculator was being initialized.
//! - `MetricUnavailable`: the metric collaborator failed (network, auth,
//!   throttling). Fatal to the whole run.
//! - `InvalidWindow`: `end <= start`, or a window too short to normalize.
//!   Checked before any calculator runs.
//! - `InvalidMetric`: a negative or non-finite metric value.
//!
//! ## Retry Awareness
//!
//! The core never retries. The AWS adapters wrap SDK calls in a
//! `RetryPolicy` (see `src/retry.rs`), which consults `IsRetryable`.
//! Only transport-level variants are retryable.

use thiserror::Error;

/// Main error type for coststream
#[derive(Error, Debug)]
pub enum CostError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("No price found for unit '{unit}'")]
    PriceNotFound { unit: String },

    #[error("Price family '{family}' returned no products for {service_code} in {region}")]
    MissingPriceFamily {
        service_code: String,
        family: String,
        region: String,
    },

    #[error("Metric unavailable: {metric} for {resource_id} - {message}")]
    MetricUnavailable {
        metric: String,
        resource_id: String,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    #[error("Calculator for {expected} cannot price a {actual} resource")]
    ServiceMismatch { expected: String, actual: String },

    #[error("Invalid metric value for {metric}: {value}")]
    InvalidMetric { metric: String, value: f64 },

    #[error("Pricing lookup failed: {0}")]
    Pricing(String),

    #[error("Resource attribute lookup failed: {resource_id} - {message}")]
    Attribute { resource_id: String, message: String },

    #[error("Cost sink error: {0}")]
    Sink(String),

    #[error("Task join error: {0}")]
    TaskJoin(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<tokio::task::JoinError> for CostError {
    fn from(err: tokio::task::JoinError) -> Self {
        CostError::TaskJoin(err.to_string())
    }
}

impl CostError {
    pub fn price_not_found(unit: impl Into<String>) -> Self {
        CostError::PriceNotFound { unit: unit.into() }
    }

    pub fn metric_unavailable(
        metric: impl Into<String>,
        resource_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        CostError::MetricUnavailable {
            metric: metric.into(),
            resource_id: resource_id.into(),
            message: message.into(),
            source: None,
        }
    }
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("Failed to parse config: {0}")]
    ParseError(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, CostError>;

/// Trait for determining if an error is retryable
///
/// Used by `RetryPolicy` implementations to determine whether an error
/// should trigger a retry attempt.
pub trait IsRetryable {
    fn is_retryable(&self) -> bool;
}

impl IsRetryable for CostError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            CostError::MetricUnavailable { .. }
                | CostError::Pricing(_)
                | CostError::Attribute { .. }
                | CostError::Sink(_)
                | CostError::Io(_)
        )
    }
}
