//! Configuration management for connector instances.
//!
//! Provides hierarchical configuration loading and validation with:
//! - Default values as code base
//! - Configuration file support
//! - Environment variable overrides
//! - Component-wise validation
//!
//! Feature option sets are not loaded here. They arrive from the discovery
//! collaborator as [`FeatureOptions`](crate::FeatureOptions).
mod connection;
mod discovery;
mod notification;
mod request;
pub use connection::*;
pub use discovery::*;
pub use notification::*;
pub use request::*;


use std::env;
use std::fmt::Debug;

use config::Config;
use config::Environment;
use config::File;
use serde::Deserialize;
use serde::Serialize;

use crate::Result;

const ENV_PREFIX: &str = "CONNECTOR";

/// Main configuration container for a connector instance
///
/// Combines all subsystem configurations with hierarchical override support:
/// 1. Default values from code implementation
/// 2. Configuration file specified by `CONFIG_PATH`
/// 3. Environment variables with `CONNECTOR__` prefix (highest priority)
#[derive(Serialize, Deserialize, Clone, Default)]
pub struct ConnectorConfig {
    /// Endpoint address and watchdog parameters
    #[serde(default)]
    pub connection: ConnectionConfig,
    /// Notification fan-out parameters
    #[serde(default)]
    pub notification: NotificationConfig,
    /// Deadlines for correlated request/response calls
    #[serde(default)]
    pub request: RequestConfig,
    /// Bulk discovery behavior
    #[serde(default)]
    pub discovery: DiscoveryConfig,
}

impl Debug for ConnectorConfig {
    fn fmt(
        &self,
        f: &mut std::fmt::Formatter<'_>,
    ) -> std::fmt::Result {
        f.debug_struct("ConnectorConfig")
            .field("connection", &self.connection)
            .finish()
    }
}

impl ConnectorConfig {
    /// Loads configuration from hierarchical sources without validation.
    ///
    /// Callers MUST call `validate()` once all overrides are applied.
    ///
    /// # Examples
    /// ```ignore
    /// std::env::set_var("CONNECTOR__CONNECTION__ENDPOINT", "udp://10.0.0.7:161");
    /// let cfg = ConnectorConfig::new()?.validate()?;
    /// ```
    pub fn new() -> Result<Self> {
        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Ok(config_path) = env::var("CONFIG_PATH") {
            builder = builder.add_source(File::with_name(&config_path).required(true));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .ignore_empty(true)
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        Ok(config)
    }

    /// Applies additional configuration overrides from file without validation.
    ///
    /// Merging order (later sources override earlier):
    /// 1. Current configuration values
    /// 2. New configuration file
    /// 3. Latest environment variables
    pub fn with_override_config(
        &self,
        path: &str,
    ) -> Result<Self> {
        let config: Self = Config::builder()
            .add_source(Config::try_from(self)?)
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()?;
        Ok(config)
    }

    /// Validates configuration and returns validated instance.
    pub fn validate(self) -> Result<Self> {
        self.connection.validate()?;
        self.notification.validate()?;
        self.request.validate()?;
        Ok(self)
    }
}
