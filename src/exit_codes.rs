//! Exit code standardization for coststream
//!
//! ## Exit Code Convention
//!
//! - `0` = Success
//! - `1` = Estimation error (invalid window, missing prices, bad metric values)
//! - `2` = System error (AWS API failure, sink failure, I/O)
//! - `3` = Configuration error

use crate::error::CostError;

/// Standard exit codes for coststream
pub mod codes {
    /// Estimation error (the inputs cannot produce a number)
    pub const ESTIMATION_ERROR: i32 = 1;
    /// System error (AWS API failure, network error)
    pub const SYSTEM_ERROR: i32 = 2;
    /// Configuration error
    pub const CONFIG_ERROR: i32 = 3;
}

/// Map a CostError to an appropriate exit code
pub fn exit_code_for_error(error: &CostError) -> i32 {
    use CostError::*;
    match error {
        Config(_) => codes::CONFIG_ERROR,

        PriceNotFound { .. } => codes::ESTIMATION_ERROR,
        MissingPriceFamily { .. } => codes::ESTIMATION_ERROR,
        InvalidWindow(_) => codes::ESTIMATION_ERROR,
        InvalidMetric { .. } => codes::ESTIMATION_ERROR,
        ServiceMismatch { .. } => codes::ESTIMATION_ERROR,

        MetricUnavailable { .. } => codes::SYSTEM_ERROR,
        Pricing(_) => codes::SYSTEM_ERROR,
        Attribute { .. } => codes::SYSTEM_ERROR,
        Sink(_) => codes::SYSTEM_ERROR,
        TaskJoin(_) => codes::SYSTEM_ERROR,
        Io(_) => codes::SYSTEM_ERROR,
        Json(_) => codes::SYSTEM_ERROR,
    }
}

/// Exit code for an `anyhow` error raised at the CLI boundary
pub fn exit_code_for_anyhow(error: &anyhow::Error) -> i32 {
    error
        .downcast_ref::<CostError>()
        .map(exit_code_for_error)
        .unwrap_or(codes::SYSTEM_ERROR)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;

    #[test]
    fn test_exit_codes() {
        assert_eq!(
            exit_code_for_error(&CostError::price_not_found("Requests")),
            codes::ESTIMATION_ERROR
        );
        assert_eq!(
            exit_code_for_error(&CostError::Sink("stream gone".to_string())),
            codes::SYSTEM_ERROR
        );
        assert_eq!(
            exit_code_for_error(&CostError::Config(ConfigError::MissingField(
                "aws.region".to_string()
            ))),
            codes::CONFIG_ERROR
        );
    }

    #[test]
    fn test_anyhow_fallback() {
        let err = anyhow::anyhow!("unrelated");
        assert_eq!(exit_code_for_anyhow(&err), codes::SYSTEM_ERROR);

        let err = anyhow::Error::from(CostError::InvalidWindow("empty".to_string()));
        assert_eq!(exit_code_for_anyhow(&err), codes::ESTIMATION_ERROR);
    }
}
