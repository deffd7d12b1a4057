use crate::error::{ConfigError, CostError};
use crate::provider::Resource;
use crate::window::TimeWindow;
use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub aws: AwsConfig,
    pub window: WindowConfig,
    pub metrics: MetricsConfig,
    pub stream: StreamConfig,
    pub pricing: PricingConfig,
    /// Resources to price. Tag-based discovery happens upstream.
    pub resources: Vec<Resource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AwsConfig {
    /// Region the priced resources live in
    pub region: String,
    /// Region hosting the pricing API endpoint
    pub pricing_region: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowConfig {
    /// How far behind "now" the window closes, to let metrics settle
    pub delay_secs: u64,
    pub length_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Namespace the per-resource cost metric is published under
    pub namespace: String,
    pub cost_metric_name: String,
    pub service_dimension: String,
    pub resource_dimension: String,
    pub period_secs: u32,
}

/// Product attributes that narrow price lookups
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    /// `databaseEngine` attribute for managed database prices
    pub database_engine: String,
    /// `deploymentOption` attribute for managed database prices
    pub database_deployment: String,
    /// `volumeType` attribute for managed database storage
    pub database_volume_type: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    pub name: Option<String>,
    pub partition_key: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            aws: AwsConfig {
                region: "eu-west-1".to_string(),
                pricing_region: "us-east-1".to_string(),
            },
            window: WindowConfig {
                delay_secs: 600,
                length_secs: 300,
            },
            metrics: MetricsConfig {
                namespace: "CostStream".to_string(),
                cost_metric_name: "Cost".to_string(),
                service_dimension: "ServiceName".to_string(),
                resource_dimension: "ResourceId".to_string(),
                period_secs: 60,
            },
            stream: StreamConfig {
                name: None,
                partition_key: "cost".to_string(),
            },
            pricing: PricingConfig {
                database_engine: "PostgreSQL".to_string(),
                database_deployment: "Single-AZ".to_string(),
                database_volume_type: "General Purpose".to_string(),
            },
            resources: Vec::new(),
        }
    }
}

impl Config {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = if let Some(p) = path {
            p.to_path_buf()
        } else {
            // Try .coststream.toml in current dir, then ~/.config/coststream/config.toml
            let local = PathBuf::from(".coststream.toml");
            if local.exists() {
                local
            } else {
                dirs::config_dir()
                    .map(|d| d.join("coststream").join("config.toml"))
                    .unwrap_or_else(|| PathBuf::from(".coststream.toml"))
            }
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read config: {}", config_path.display()))?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| CostError::from(ConfigError::ParseError(e.to_string())))
                .with_context(|| {
                    let mut err = format!("Failed to parse config: {}", config_path.display());
                    err.push_str("\n  Common issues:");
                    err.push_str("\n    - Invalid TOML syntax");
                    err.push_str("\n    - Missing required fields");
                    err.push_str("\n    - Unknown service kind in [[resources]]");
                    err.push_str("\n  Tip: Run 'coststream init' to create a new config file");
                    err
                })?;
            config.validate()?;
            Ok(config)
        } else {
            if path.is_some() {
                tracing::warn!(
                    "Config file not found: {}, using default configuration",
                    config_path.display()
                );
            }
            Ok(Config::default())
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self).context("Failed to serialize config")?;
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config: {}", path.display()))?;
        Ok(())
    }

    pub fn validate(&self) -> std::result::Result<(), CostError> {
        if self.aws.region.trim().is_empty() {
            return Err(ConfigError::MissingField("aws.region".to_string()).into());
        }
        if self.window.length_secs < 60 {
            return Err(ConfigError::InvalidValue {
                field: "window.length_secs".to_string(),
                reason: "must span at least one minute".to_string(),
            }
            .into());
        }
        if self.metrics.period_secs == 0 || self.metrics.period_secs % 60 != 0 {
            return Err(ConfigError::InvalidValue {
                field: "metrics.period_secs".to_string(),
                reason: "must be a positive multiple of 60".to_string(),
            }
            .into());
        }
        Ok(())
    }

    /// The window a run started at `now` should price.
    pub fn window_at(&self, now: DateTime<Utc>) -> std::result::Result<TimeWindow, CostError> {
        TimeWindow::trailing(
            now,
            Duration::seconds(self.window.delay_secs as i64),
            Duration::seconds(self.window.length_secs as i64),
        )
    }

    pub fn stream_name(&self) -> std::result::Result<&str, CostError> {
        self.stream
            .name
            .as_deref()
            .ok_or_else(|| ConfigError::MissingField("stream.name".to_string()).into())
    }
}

pub fn init_config(output: &Path) -> Result<()> {
    let config = Config::default();
    config.save(output)?;
    println!("Created config file: {}", output.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::ServiceKind;
    use tempfile::TempDir;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.window.length_secs, 300);
        assert_eq!(config.metrics.period_secs, 60);
        assert!(config.resources.is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_save_and_load() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");

        let mut config = Config::default();
        config.stream.name = Some("cost-stream".to_string());
        config.resources = vec![
            Resource::new("orders", ServiceKind::KeyValueTable),
            Resource::new("checkout", ServiceKind::ComputeFunction),
        ];
        assert!(config.save(&config_path).is_ok());

        let loaded = Config::load(Some(&config_path)).unwrap();
        assert_eq!(loaded.resources, config.resources);
        assert_eq!(loaded.stream_name().unwrap(), "cost-stream");
    }

    #[test]
    fn test_config_load_nonexistent() {
        let temp_dir = TempDir::new().unwrap();
        let fake_path = temp_dir.path().join("nonexistent.toml");

        let config = Config::load(Some(&fake_path)).unwrap();
        assert_eq!(config.window.delay_secs, 600);
    }

    #[test]
    fn test_config_load_invalid_toml() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("invalid.toml");
        std::fs::write(&config_path, "invalid toml content {").unwrap();

        assert!(Config::load(Some(&config_path)).is_err());
    }

    #[test]
    fn test_validate_rejects_short_window() {
        let mut config = Config::default();
        config.window.length_secs = 30;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_odd_period() {
        let mut config = Config::default();
        config.metrics.period_secs = 90;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_stream_name() {
        let config = Config::default();
        assert!(matches!(
            config.stream_name(),
            Err(CostError::Config(ConfigError::MissingField(_)))
        ));
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("partial.toml");
        std::fs::write(
            &config_path,
            "[[resources]]\nid = \"orders\"\nservice = \"key_value_table\"\n",
        )
        .unwrap();

        let config = Config::load(Some(&config_path)).unwrap();
        assert_eq!(config.resources, vec![Resource::new("orders", ServiceKind::KeyValueTable)]);
        assert_eq!(config.aws.region, "eu-west-1");
    }

    #[test]
    fn test_init_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("init_test.toml");

        assert!(init_config(&config_path).is_ok());
        let config = Config::load(Some(&config_path)).unwrap();
        assert_eq!(config.aws.pricing_region, "us-east-1");
    }
}
