//! Configuration loader with layered sources.

use crate::{format_validation_errors, AppConfig, ConfigValidator};
use config::{Config, ConfigError, Environment, File};
use ordercache_core::{OrderError, OrderResult};
use std::path::Path;
use tracing::{debug, info, warn};

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "ORDERCACHE";

/// Loads [`AppConfig`] from a config directory and the environment.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    config_dir: String,
}

impl ConfigLoader {
    /// Creates a loader reading from `config_dir`.
    ///
    /// Sources are applied in order, later ones overriding earlier ones:
    /// 1. `{config_dir}/default.toml`
    /// 2. `{config_dir}/{environment}.toml`
    /// 3. `{config_dir}/local.toml`
    /// 4. Environment variables with the `ORDERCACHE__` prefix
    pub fn new(config_dir: impl Into<String>) -> Self {
        Self {
            config_dir: config_dir.into(),
        }
    }

    /// Loader for the default location (`./config`).
    #[must_use]
    pub fn from_default_location() -> Self {
        Self::new("./config")
    }

    /// Loads and validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`OrderError::Configuration`] if a source cannot be parsed or
    /// validation finds any problem.
    pub fn load(&self) -> OrderResult<AppConfig> {
        if let Err(e) = dotenvy::dotenv() {
            debug!("No .env file found or error loading it: {}", e);
        }

        let environment = std::env::var(format!("{}_ENVIRONMENT", ENV_PREFIX))
            .unwrap_or_else(|_| "development".to_string());

        info!("Loading configuration for environment: {}", environment);

        let config = self.load_raw(&environment)?;
        Self::validate_config(&config)?;

        Ok(config)
    }

    /// Loads without validation.
    fn load_raw(&self, environment: &str) -> OrderResult<AppConfig> {
        let mut builder = Config::builder();

        for name in ["default", environment, "local"] {
            let path = format!("{}/{}.toml", self.config_dir, name);
            if Path::new(&path).exists() {
                debug!("Loading config from: {}", path);
                builder = builder.add_source(File::with_name(&path).required(false));
            }
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(config_error_to_order_error)
    }

    fn validate_config(config: &AppConfig) -> OrderResult<()> {
        if config.app.environment == "production" && config.database.url.contains("postgres:postgres@") {
            warn!("Using default database credentials in production");
        }

        ConfigValidator::validate(config)
            .map_err(|errors| OrderError::Configuration(format_validation_errors(&errors)))
    }
}

fn config_error_to_order_error(err: ConfigError) -> OrderError {
    OrderError::Configuration(err.to_string())
}
