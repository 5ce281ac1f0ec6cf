use std::collections::BTreeMap;
use std::collections::BTreeSet;

use async_trait::async_trait;

use super::Connector;
use super::Protocol;
use crate::FeatureKind;
use crate::FeatureValue;
use crate::NotificationSubscription;
use crate::Result;
use crate::ValueFormat;

/// Object-safe view of a connector, as seen by front-end adapters
#[async_trait]
pub trait ResourceConnector: Send + Sync + 'static {
    fn resource_name(&self) -> &str;

    async fn get_attribute(
        &self,
        attribute: &str,
        format: ValueFormat,
    ) -> Result<String>;

    async fn get_attributes(
        &self,
        attributes: &[String],
        format: ValueFormat,
    ) -> BTreeMap<String, Result<String>>;

    async fn set_attribute(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<()>;

    async fn invoke(
        &self,
        operation: &str,
        arguments: Vec<FeatureValue>,
    ) -> Result<FeatureValue>;

    async fn list_attributes(&self) -> BTreeSet<String>;

    async fn list_operations(&self) -> BTreeSet<String>;

    async fn bindings(
        &self,
        kind: FeatureKind,
    ) -> BTreeMap<String, BTreeMap<String, String>>;

    fn subscribe_notifications(
        &self,
        filter: Option<&str>,
    ) -> Result<NotificationSubscription>;

    async fn is_connected(&self) -> bool;

    async fn close(&self);
}

#[async_trait]
impl<P: Protocol> ResourceConnector for Connector<P> {
    fn resource_name(&self) -> &str {
        Connector::resource_name(self)
    }

    async fn get_attribute(
        &self,
        attribute: &str,
        format: ValueFormat,
    ) -> Result<String> {
        Connector::get_attribute(self, attribute, format).await
    }

    async fn get_attributes(
        &self,
        attributes: &[String],
        format: ValueFormat,
    ) -> BTreeMap<String, Result<String>> {
        Connector::get_attributes(self, attributes, format).await
    }

    async fn set_attribute(
        &self,
        attribute: &str,
        value: &str,
    ) -> Result<()> {
        Connector::set_attribute(self, attribute, value).await
    }

    async fn invoke(
        &self,
        operation: &str,
        arguments: Vec<FeatureValue>,
    ) -> Result<FeatureValue> {
        Connector::invoke(self, operation, arguments).await
    }

    async fn list_attributes(&self) -> BTreeSet<String> {
        Connector::list_attributes(self).await
    }

    async fn list_operations(&self) -> BTreeSet<String> {
        Connector::list_operations(self).await
    }

    async fn bindings(
        &self,
        kind: FeatureKind,
    ) -> BTreeMap<String, BTreeMap<String, String>> {
        Connector::bindings(self, kind).await
    }

    fn subscribe_notifications(
        &self,
        filter: Option<&str>,
    ) -> Result<NotificationSubscription> {
        Connector::subscribe_notifications(self, filter)
    }

    async fn is_connected(&self) -> bool {
        Connector::is_connected(self).await
    }

    async fn close(&self) {
        Connector::close(self).await
    }
}
