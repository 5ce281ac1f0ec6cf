//! Builder for [`Connector`] instances.
//!
//! A protocol supplies its session factory and three binders. Configuration
//! is loaded the usual way (defaults, `CONFIG_PATH`, `CONNECTOR__*`
//! variables) unless an explicit [`ConnectorConfig`] is given.
//!
//! ## Example
//! ```ignore
//! let connector = ConnectorBuilder::<SnmpProtocol>::new("rack-7")
//!     .config(config)
//!     .factory(SnmpSessionFactory::new(address))
//!     .attributes(SnmpAttributes::default())
//!     .operations(SnmpOperations::default())
//!     .notifications(SnmpTraps::default())
//!     .build()?;
//! connector.connect().await?;
//! ```

use std::sync::Arc;

use config::ConfigError;
use tracing::debug;

use super::Connector;
use super::Protocol;
use crate::ConnectorConfig;
use crate::Error;
use crate::NotificationDispatcher;
use crate::Result;
use crate::SequenceGenerator;

pub struct ConnectorBuilder<P: Protocol> {
    resource_name: String,
    config: Option<ConnectorConfig>,
    factory: Option<P::Factory>,
    attributes: Option<P::Attributes>,
    operations: Option<P::Operations>,
    notifications: Option<P::Notifications>,
    sequence: Option<Arc<dyn SequenceGenerator>>,
}

impl<P: Protocol> ConnectorBuilder<P> {
    pub fn new(resource_name: impl Into<String>) -> Self {
        Self {
            resource_name: resource_name.into(),
            config: None,
            factory: None,
            attributes: None,
            operations: None,
            notifications: None,
            sequence: None,
        }
    }

    pub fn config(
        mut self,
        config: ConnectorConfig,
    ) -> Self {
        self.config = Some(config);
        self
    }

    pub fn factory(
        mut self,
        factory: P::Factory,
    ) -> Self {
        self.factory = Some(factory);
        self
    }

    pub fn attributes(
        mut self,
        binder: P::Attributes,
    ) -> Self {
        self.attributes = Some(binder);
        self
    }

    pub fn operations(
        mut self,
        binder: P::Operations,
    ) -> Self {
        self.operations = Some(binder);
        self
    }

    pub fn notifications(
        mut self,
        binder: P::Notifications,
    ) -> Self {
        self.notifications = Some(binder);
        self
    }

    /// Shares a sequence counter with other connectors
    pub fn sequence(
        mut self,
        sequence: Arc<dyn SequenceGenerator>,
    ) -> Self {
        self.sequence = Some(sequence);
        self
    }

    /// Validates the configuration and assembles the connector. Does not connect.
    pub fn build(self) -> Result<Connector<P>> {
        let config = match self.config {
            Some(config) => config,
            None => ConnectorConfig::new()?,
        }
        .validate()?;

        let factory = self.factory.ok_or_else(|| missing("factory"))?;
        let attributes = self.attributes.ok_or_else(|| missing("attributes binder"))?;
        let operations = self.operations.ok_or_else(|| missing("operations binder"))?;
        let notifications = self.notifications.ok_or_else(|| missing("notifications binder"))?;

        let dispatcher = Arc::new(match self.sequence {
            Some(sequence) => NotificationDispatcher::with_sequence(&config.notification, sequence),
            None => NotificationDispatcher::new(&config.notification),
        });

        debug!(resource = %self.resource_name, ?config, "Assembling connector");
        Ok(Connector::assemble(
            self.resource_name,
            config,
            factory,
            attributes,
            operations,
            notifications,
            dispatcher,
        ))
    }
}

fn missing(component: &str) -> Error {
    Error::Config(ConfigError::NotFound(component.to_string()))
}
