//! Configuration validation.
//!
//! Every rule runs and all failures are reported together, so a bad
//! deployment fails once at startup with the full list.

use crate::{AppConfig, CacheConfig};
use std::fmt;
use url::Url;

/// Configuration validation error variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigValidationError {
    /// Port number is invalid (must be 1-65535).
    InvalidPort { name: String, value: u16 },
    /// Pool size configuration is invalid (min must be <= max).
    InvalidPoolSize { min: u32, max: u32 },
    /// Pool size exceeds maximum allowed.
    PoolSizeTooLarge { value: u32, maximum: u32 },
    /// URL format is invalid.
    InvalidUrl { url_type: String, message: String },
    /// Subject is empty or contains whitespace.
    InvalidSubject { value: String },
    /// Cache TTL too small to yield a non-zero resync period.
    TtlTooSmall { value_ms: u64, minimum_ms: u64 },
    /// Outcome channel needs room for at least one outcome.
    ZeroOutcomeBuffer,
    /// Sampling ratio must be between 0.0 and 1.0.
    InvalidSamplingRatio { value: f64 },
    /// Timeout value must be positive.
    NonPositiveTimeout { name: String, value: u64 },
    /// Log level is invalid.
    InvalidLogLevel { value: String },
    /// Log format is invalid.
    InvalidLogFormat { value: String },
    /// Metrics path must be absolute.
    InvalidMetricsPath { value: String },
}

impl fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidPort { name, value } => {
                write!(f, "Invalid port for {}: {} (must be 1-65535)", name, value)
            }
            Self::InvalidPoolSize { min, max } => {
                write!(
                    f,
                    "Invalid pool size: min ({}) cannot be greater than max ({})",
                    min, max
                )
            }
            Self::PoolSizeTooLarge { value, maximum } => {
                write!(f, "Pool size {} exceeds maximum allowed ({})", value, maximum)
            }
            Self::InvalidUrl { url_type, message } => {
                write!(f, "Invalid {} URL: {}", url_type, message)
            }
            Self::InvalidSubject { value } => {
                write!(f, "Invalid NATS subject: '{}'", value)
            }
            Self::TtlTooSmall { value_ms, minimum_ms } => {
                write!(
                    f,
                    "Cache ttl_ms {} is too small (minimum {})",
                    value_ms, minimum_ms
                )
            }
            Self::ZeroOutcomeBuffer => {
                write!(f, "ingest.outcome_buffer must be greater than zero")
            }
            Self::InvalidSamplingRatio { value } => {
                write!(
                    f,
                    "Invalid sampling ratio: {} (must be between 0.0 and 1.0)",
                    value
                )
            }
            Self::NonPositiveTimeout { name, value } => {
                write!(f, "Timeout '{}' must be positive, got {}", name, value)
            }
            Self::InvalidLogLevel { value } => {
                write!(
                    f,
                    "Invalid log level: '{}' (valid: trace, debug, info, warn, error)",
                    value
                )
            }
            Self::InvalidLogFormat { value } => {
                write!(f, "Invalid log format: '{}' (valid: pretty, json)", value)
            }
            Self::InvalidMetricsPath { value } => {
                write!(f, "Metrics path must start with '/': '{}'", value)
            }
        }
    }
}

impl std::error::Error for ConfigValidationError {}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Maximum connection pool size.
    const MAX_POOL_SIZE: u32 = 1000;
    /// Valid log levels.
    const VALID_LOG_LEVELS: &'static [&'static str] = &["trace", "debug", "info", "warn", "error"];
    /// Valid log formats.
    const VALID_LOG_FORMATS: &'static [&'static str] = &["pretty", "json"];

    /// Validates the entire application configuration.
    ///
    /// # Errors
    ///
    /// Returns every validation error found.
    pub fn validate(config: &AppConfig) -> Result<(), Vec<ConfigValidationError>> {
        let mut errors = Vec::new();

        Self::validate_server(&config.server, &mut errors);
        Self::validate_database(&config.database, &mut errors);
        Self::validate_nats(&config.nats, &mut errors);
        Self::validate_cache(&config.cache, &mut errors);
        Self::validate_ingest(&config.ingest, &mut errors);
        Self::validate_observability(&config.observability, &mut errors);

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    fn validate_server(config: &crate::ServerConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.port == 0 {
            errors.push(ConfigValidationError::InvalidPort {
                name: "server.port".to_string(),
                value: config.port,
            });
        }
        if config.shutdown_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "server.shutdown_timeout_secs".to_string(),
                value: 0,
            });
        }
    }

    fn validate_database(config: &crate::DatabaseConfig, errors: &mut Vec<ConfigValidationError>) {
        match Url::parse(&config.url) {
            Ok(url) if matches!(url.scheme(), "postgres" | "postgresql") => {}
            Ok(url) => errors.push(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: format!("unsupported scheme '{}', expected postgres://", url.scheme()),
            }),
            Err(e) => errors.push(ConfigValidationError::InvalidUrl {
                url_type: "database".to_string(),
                message: e.to_string(),
            }),
        }

        if config.min_connections > config.max_connections {
            errors.push(ConfigValidationError::InvalidPoolSize {
                min: config.min_connections,
                max: config.max_connections,
            });
        }
        if config.max_connections > Self::MAX_POOL_SIZE {
            errors.push(ConfigValidationError::PoolSizeTooLarge {
                value: config.max_connections,
                maximum: Self::MAX_POOL_SIZE,
            });
        }

        if config.connect_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "database.connect_timeout_secs".to_string(),
                value: 0,
            });
        }
        if config.idle_timeout_secs == 0 {
            errors.push(ConfigValidationError::NonPositiveTimeout {
                name: "database.idle_timeout_secs".to_string(),
                value: 0,
            });
        }
    }

    fn validate_nats(config: &crate::NatsConfig, errors: &mut Vec<ConfigValidationError>) {
        match Url::parse(&config.url) {
            Ok(url) if matches!(url.scheme(), "nats" | "tls" | "ws" | "wss") => {}
            Ok(url) => errors.push(ConfigValidationError::InvalidUrl {
                url_type: "nats".to_string(),
                message: format!("unsupported scheme '{}', expected nats://", url.scheme()),
            }),
            Err(e) => errors.push(ConfigValidationError::InvalidUrl {
                url_type: "nats".to_string(),
                message: e.to_string(),
            }),
        }

        if config.subject.is_empty() || config.subject.chars().any(char::is_whitespace) {
            errors.push(ConfigValidationError::InvalidSubject {
                value: config.subject.clone(),
            });
        }
    }

    fn validate_cache(config: &CacheConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.ttl_ms < CacheConfig::MIN_TTL_MS {
            errors.push(ConfigValidationError::TtlTooSmall {
                value_ms: config.ttl_ms,
                minimum_ms: CacheConfig::MIN_TTL_MS,
            });
        }
    }

    fn validate_ingest(config: &crate::IngestConfig, errors: &mut Vec<ConfigValidationError>) {
        if config.outcome_buffer == 0 {
            errors.push(ConfigValidationError::ZeroOutcomeBuffer);
        }
    }

    fn validate_observability(
        config: &crate::ObservabilityConfig,
        errors: &mut Vec<ConfigValidationError>,
    ) {
        if !Self::VALID_LOG_LEVELS.contains(&config.log_level.to_lowercase().as_str()) {
            errors.push(ConfigValidationError::InvalidLogLevel {
                value: config.log_level.clone(),
            });
        }
        if !Self::VALID_LOG_FORMATS.contains(&config.log_format.to_lowercase().as_str()) {
            errors.push(ConfigValidationError::InvalidLogFormat {
                value: config.log_format.clone(),
            });
        }
        if !(0.0..=1.0).contains(&config.sampling_ratio) {
            errors.push(ConfigValidationError::InvalidSamplingRatio {
                value: config.sampling_ratio,
            });
        }
        if config.metrics_enabled && !config.metrics_path.starts_with('/') {
            errors.push(ConfigValidationError::InvalidMetricsPath {
                value: config.metrics_path.clone(),
            });
        }
        if config.tracing_enabled {
            if let Some(endpoint) = &config.otlp_endpoint {
                if let Err(e) = Url::parse(endpoint) {
                    errors.push(ConfigValidationError::InvalidUrl {
                        url_type: "otlp".to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
    }
}

/// Formats validation errors for display.
#[must_use]
pub fn format_validation_errors(errors: &[ConfigValidationError]) -> String {
    let mut output = String::from("Configuration validation failed:\n");
    for (i, error) in errors.iter().enumerate() {
        output.push_str(&format!("  {}. {}\n", i + 1, error));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn errors_for(config: &AppConfig) -> Vec<ConfigValidationError> {
        ConfigValidator::validate(config).unwrap_err()
    }

    #[test]
    fn test_default_config_passes() {
        assert!(ConfigValidator::validate(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_invalid_port() {
        let mut config = AppConfig::default();
        config.server.port = 0;

        assert!(errors_for(&config).iter().any(|e| matches!(
            e,
            ConfigValidationError::InvalidPort { name, .. } if name == "server.port"
        )));
    }

    #[test]
    fn test_invalid_pool_size() {
        let mut config = AppConfig::default();
        config.database.min_connections = 100;
        config.database.max_connections = 10;

        assert!(errors_for(&config)
            .iter()
            .any(|e| matches!(e, ConfigValidationError::InvalidPoolSize { .. })));
    }

    #[test]
    fn test_non_postgres_database_url() {
        let mut config = AppConfig::default();
        config.database.url = "mysql://root@localhost/orders".to_string();

        assert!(errors_for(&config).iter().any(|e| matches!(
            e,
            ConfigValidationError::InvalidUrl { url_type, .. } if url_type == "database"
        )));
    }

    #[test]
    fn test_unparseable_nats_url() {
        let mut config = AppConfig::default();
        config.nats.url = "localhost:4222 nope".to_string();

        assert!(errors_for(&config).iter().any(|e| matches!(
            e,
            ConfigValidationError::InvalidUrl { url_type, .. } if url_type == "nats"
        )));
    }

    #[test]
    fn test_blank_subject() {
        let mut config = AppConfig::default();
        config.nats.subject = "   ".to_string();

        assert!(errors_for(&config)
            .iter()
            .any(|e| matches!(e, ConfigValidationError::InvalidSubject { .. })));
    }

    #[test]
    fn test_ttl_below_minimum() {
        let mut config = AppConfig::default();
        config.cache.ttl_ms = 1;

        assert_eq!(
            errors_for(&config),
            vec![ConfigValidationError::TtlTooSmall { value_ms: 1, minimum_ms: 2 }]
        );
    }

    #[test]
    fn test_zero_outcome_buffer() {
        let mut config = AppConfig::default();
        config.ingest.outcome_buffer = 0;

        assert_eq!(errors_for(&config), vec![ConfigValidationError::ZeroOutcomeBuffer]);
    }

    #[test]
    fn test_invalid_log_level_and_format() {
        let mut config = AppConfig::default();
        config.observability.log_level = "verbose".to_string();
        config.observability.log_format = "xml".to_string();

        let errors = errors_for(&config);
        assert!(errors.iter().any(|e| matches!(e, ConfigValidationError::InvalidLogLevel { .. })));
        assert!(errors.iter().any(|e| matches!(e, ConfigValidationError::InvalidLogFormat { .. })));
    }

    #[test]
    fn test_invalid_sampling_ratio() {
        let mut config = AppConfig::default();
        config.observability.sampling_ratio = 1.5;

        assert!(errors_for(&config)
            .iter()
            .any(|e| matches!(e, ConfigValidationError::InvalidSamplingRatio { .. })));
    }

    #[test]
    fn test_multiple_errors() {
        let mut config = AppConfig::default();
        config.server.port = 0;
        config.cache.ttl_ms = 0;
        config.ingest.outcome_buffer = 0;

        assert_eq!(errors_for(&config).len(), 3);
    }

    #[test]
    fn test_format_validation_errors() {
        let errors = vec![
            ConfigValidationError::TtlTooSmall { value_ms: 1, minimum_ms: 2 },
            ConfigValidationError::InvalidPort { name: "server.port".to_string(), value: 0 },
        ];

        let output = format_validation_errors(&errors);
        assert!(output.contains("1. Cache ttl_ms 1 is too small"));
        assert!(output.contains("2. Invalid port"));
    }
}
