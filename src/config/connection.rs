use std::time::Duration;

use config::ConfigError;
use serde::Deserialize;
use serde::Serialize;

use crate::Error;
use crate::Result;

/// Remote endpoint address and session supervision parameters
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ConnectionConfig {
    /// Endpoint address in `scheme://host:port` form, e.g. `udp://10.0.0.7:161`
    #[serde(default)]
    pub endpoint: String,

    /// Watchdog tick period in milliseconds
    #[serde(default = "default_watchdog_period")]
    pub watchdog_period_in_ms: u64,

    /// Deadline for establishing a session, including watchdog repairs
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_in_ms: u64,

    /// Upper bound `simulate_failure` waits for the watchdog to observe a problem
    #[serde(default = "default_failure_observe_timeout")]
    pub failure_observe_timeout_in_ms: u64,
}

/// Parsed form of [`ConnectionConfig::endpoint`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointAddress {
    pub scheme: String,
    pub host: String,
    pub port: u16,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            watchdog_period_in_ms: default_watchdog_period(),
            connect_timeout_in_ms: default_connect_timeout(),
            failure_observe_timeout_in_ms: default_failure_observe_timeout(),
        }
    }
}

impl ConnectionConfig {
    pub fn validate(&self) -> Result<()> {
        self.endpoint_address()?;

        if self.watchdog_period_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "watchdog_period_in_ms must be greater than 0".into(),
            )));
        }

        if self.connect_timeout_in_ms == 0 {
            return Err(Error::Config(ConfigError::Message(
                "connect_timeout_in_ms must be greater than 0".into(),
            )));
        }

        if self.failure_observe_timeout_in_ms < self.watchdog_period_in_ms {
            return Err(Error::Config(ConfigError::Message(format!(
                "failure_observe_timeout_in_ms ({}) must be at least one watchdog period ({})",
                self.failure_observe_timeout_in_ms, self.watchdog_period_in_ms
            ))));
        }

        Ok(())
    }

    /// Parses the endpoint. A missing endpoint and a malformed one are both
    /// configuration errors.
    pub fn endpoint_address(&self) -> Result<EndpointAddress> {
        if self.endpoint.trim().is_empty() {
            return Err(Error::Config(ConfigError::NotFound("connection.endpoint".into())));
        }

        let malformed = || Error::Config(ConfigError::Message(format!("Malformed endpoint address: {}", self.endpoint)));

        let (scheme, rest) = self.endpoint.split_once("://").ok_or_else(malformed)?;
        let (host, port) = rest.rsplit_once(':').ok_or_else(malformed)?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        if scheme.is_empty() || host.is_empty() {
            return Err(malformed());
        }
        let port = port.parse::<u16>().map_err(|_| malformed())?;

        Ok(EndpointAddress {
            scheme: scheme.to_ascii_lowercase(),
            host: host.to_string(),
            port,
        })
    }

    pub fn watchdog_period(&self) -> Duration {
        Duration::from_millis(self.watchdog_period_in_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_in_ms)
    }

    pub fn failure_observe_timeout(&self) -> Duration {
        Duration::from_millis(self.failure_observe_timeout_in_ms)
    }
}

fn default_watchdog_period() -> u64 {
    3000
}
fn default_connect_timeout() -> u64 {
    2000
}
fn default_failure_observe_timeout() -> u64 {
    30_000
}
