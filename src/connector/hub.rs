use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use dashmap::DashMap;
use tracing::info;

use super::ResourceConnector;
use crate::FeatureError;
use crate::FeatureKind;
use crate::FeatureValue;
use crate::NotificationSubscription;
use crate::Result;
use crate::ValueFormat;

/// Hosts connectors keyed by resource name and routes adapter calls to them
#[derive(Default)]
pub struct ResourceHub {
    connectors: DashMap<String, Arc<dyn ResourceConnector>>,
}

impl ResourceHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hosts `connector` under its resource name. Returns the connector it replaced.
    pub fn host(
        &self,
        connector: Arc<dyn ResourceConnector>,
    ) -> Option<Arc<dyn ResourceConnector>> {
        let name = connector.resource_name().to_string();
        info!(resource = %name, "Resource hosted");
        self.connectors.insert(name, connector)
    }

    /// Stops hosting `resource_name`. The caller decides whether to close it.
    pub fn release(
        &self,
        resource_name: &str,
    ) -> Option<Arc<dyn ResourceConnector>> {
        self.connectors.remove(resource_name).map(|(_, connector)| connector)
    }

    pub fn connector(
        &self,
        resource_name: &str,
    ) -> Result<Arc<dyn ResourceConnector>> {
        self.connectors
            .get(resource_name)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| FeatureError::UnknownResource(resource_name.to_string()).into())
    }

    pub fn list_hosted_resources(&self) -> BTreeSet<String> {
        self.connectors.iter().map(|entry| entry.key().clone()).collect()
    }

    pub async fn get_attribute(
        &self,
        resource_name: &str,
        attribute: &str,
        format: ValueFormat,
    ) -> Result<String> {
        self.connector(resource_name)?.get_attribute(attribute, format).await
    }

    pub async fn get_attributes(
        &self,
        resource_name: &str,
        attributes: &[String],
        format: ValueFormat,
    ) -> Result<BTreeMap<String, Result<String>>> {
        Ok(self.connector(resource_name)?.get_attributes(attributes, format).await)
    }

    pub async fn set_attribute(
        &self,
        resource_name: &str,
        attribute: &str,
        value: &str,
    ) -> Result<()> {
        self.connector(resource_name)?.set_attribute(attribute, value).await
    }

    pub async fn invoke(
        &self,
        resource_name: &str,
        operation: &str,
        arguments: Vec<FeatureValue>,
    ) -> Result<FeatureValue> {
        self.connector(resource_name)?.invoke(operation, arguments).await
    }

    pub async fn list_attributes(
        &self,
        resource_name: &str,
    ) -> Result<BTreeSet<String>> {
        Ok(self.connector(resource_name)?.list_attributes().await)
    }

    pub async fn bindings(
        &self,
        resource_name: &str,
        kind: FeatureKind,
    ) -> Result<BTreeMap<String, BTreeMap<String, String>>> {
        Ok(self.connector(resource_name)?.bindings(kind).await)
    }

    pub fn subscribe_notifications(
        &self,
        resource_name: &str,
        filter: Option<&str>,
    ) -> Result<NotificationSubscription> {
        self.connector(resource_name)?.subscribe_notifications(filter)
    }

    /// Releases and closes every hosted connector
    pub async fn close_all(&self) {
        let names: Vec<String> = self.connectors.iter().map(|entry| entry.key().clone()).collect();
        for name in names {
            if let Some(connector) = self.release(&name) {
                connector.close().await;
            }
        }
    }
}
