use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::sync::Arc;

use futures::stream;
use futures::StreamExt;
use tracing::debug;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use super::NotificationRearm;
use super::Protocol;
use crate::AttributeBinder;
use crate::Binding;
use crate::ConnectionManager;
use crate::ConnectorConfig;
use crate::Error;
use crate::ExpandReport;
use crate::FeatureBinder;
use crate::FeatureError;
use crate::FeatureKind;
use crate::FeatureMetadata;
use crate::FeatureOptions;
use crate::FeatureRepository;
use crate::FeatureShape;
use crate::FeatureValue;
use crate::NotificationBinder;
use crate::NotificationCollector;
use crate::NotificationDispatcher;
use crate::NotificationFilter;
use crate::NotificationSubscription;
use crate::OperationBinder;
use crate::ReconnectHandler;
use crate::RepositoryListener;
use crate::Result;
use crate::SessionFactory;
use crate::ValueFormat;

type Session<P> = <<P as Protocol>::Factory as SessionFactory>::Session;

/// Per-kind outcome of [`Connector::expand`]
#[derive(Debug, Default)]
pub struct ExpandSummary {
    pub attributes: Option<ExpandReport>,
    pub operations: Option<ExpandReport>,
    pub notifications: Option<ExpandReport>,
}

/// One managed resource: a connection plus the features bound through it.
///
/// Composes a [`ConnectionManager`], one [`FeatureRepository`] per feature
/// kind and a [`NotificationDispatcher`]. Adapters reach it through
/// [`ResourceConnector`](super::ResourceConnector).
pub struct Connector<P: Protocol> {
    resource_name: String,
    config: ConnectorConfig,
    connection: Arc<ConnectionManager<P::Factory>>,
    attributes: Arc<FeatureRepository<P::Attributes>>,
    operations: Arc<FeatureRepository<P::Operations>>,
    notifications: Arc<FeatureRepository<P::Notifications>>,
    dispatcher: Arc<NotificationDispatcher>,
    collector: NotificationCollector<P::Notifications>,
    rearm: Arc<NotificationRearm<P::Notifications>>,
}

impl<P: Protocol> Connector<P> {
    pub(super) fn assemble(
        resource_name: String,
        config: ConnectorConfig,
        factory: P::Factory,
        attributes: P::Attributes,
        operations: P::Operations,
        notifications: P::Notifications,
        dispatcher: Arc<NotificationDispatcher>,
    ) -> Self {
        let connection = Arc::new(ConnectionManager::new(factory, config.connection.clone()));
        let attributes = Arc::new(FeatureRepository::new(Arc::new(attributes), connection.clone()));
        let operations = Arc::new(FeatureRepository::new(Arc::new(operations), connection.clone()));
        let notifications = Arc::new(FeatureRepository::new(Arc::new(notifications), connection.clone()));

        let rearm = Arc::new(NotificationRearm::new(notifications.binder().clone()));
        let listener: Arc<dyn RepositoryListener<<P::Notifications as FeatureBinder>::Handle>> = rearm.clone();
        notifications.add_listener(listener);
        let handler: Arc<dyn ReconnectHandler<Session<P>>> = rearm.clone();
        connection.register_reconnect_handler(handler);

        let collector = NotificationCollector::new(notifications.clone(), dispatcher.clone(), resource_name.clone());

        Self {
            resource_name,
            config,
            connection,
            attributes,
            operations,
            notifications,
            dispatcher,
            collector,
            rearm,
        }
    }

    pub fn resource_name(&self) -> &str {
        &self.resource_name
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn connection(&self) -> &Arc<ConnectionManager<P::Factory>> {
        &self.connection
    }

    pub fn dispatcher(&self) -> &Arc<NotificationDispatcher> {
        &self.dispatcher
    }

    /// Establishes the session. In smart mode the whole remote feature space
    /// is connected as well.
    #[instrument(skip(self), fields(resource = %self.resource_name))]
    pub async fn connect(&self) -> Result<()> {
        self.connection.connect().await?;
        if self.config.discovery.smart_mode {
            let summary = self.expand().await;
            debug!(?summary, "Smart mode discovery finished");
        }
        info!("Connector ready");
        Ok(())
    }

    /// Connects every remote feature not present yet, per kind.
    ///
    /// A kind whose enumeration fails is logged and reported as `None`.
    pub async fn expand(&self) -> ExpandSummary {
        ExpandSummary {
            attributes: log_expand(FeatureKind::Attribute, self.attributes.expand().await),
            operations: log_expand(FeatureKind::Operation, self.operations.expand().await),
            notifications: log_expand(FeatureKind::Notification, self.notifications.expand().await),
        }
    }

    pub async fn add_attribute(
        &self,
        name: &str,
        options: FeatureOptions,
    ) -> Result<Arc<FeatureMetadata>> {
        Ok(self.attributes.connect(name, options).await?.metadata().clone())
    }

    pub async fn remove_attribute(
        &self,
        name: &str,
    ) -> bool {
        self.attributes.remove(name).await.is_some()
    }

    pub async fn add_operation(
        &self,
        name: &str,
        options: FeatureOptions,
    ) -> Result<Arc<FeatureMetadata>> {
        Ok(self.operations.connect(name, options).await?.metadata().clone())
    }

    pub async fn remove_operation(
        &self,
        name: &str,
    ) -> bool {
        self.operations.remove(name).await.is_some()
    }

    /// Enables a notification. At most one notification per category.
    pub async fn enable_notification(
        &self,
        name: &str,
        options: FeatureOptions,
    ) -> Result<Arc<FeatureMetadata>> {
        Ok(self.notifications.connect(name, options).await?.metadata().clone())
    }

    pub async fn disable_notification(
        &self,
        name: &str,
    ) -> bool {
        self.notifications.remove(name).await.is_some()
    }

    pub async fn read_attribute(
        &self,
        name: &str,
    ) -> Result<FeatureValue> {
        let binding = self.attributes.get(name).await.ok_or_else(|| Error::not_found(name))?;
        let binder = self.attributes.binder();
        self.connection
            .with_session(|session| async { binder.read(session, &binding).await })
            .await
    }

    pub async fn get_attribute(
        &self,
        name: &str,
        format: ValueFormat,
    ) -> Result<String> {
        self.read_attribute(name).await?.render(format)
    }

    /// Reads several attributes concurrently, bounded by `request.batch_parallelism`.
    /// Each attribute gets its own result.
    pub async fn get_attributes(
        &self,
        names: &[String],
        format: ValueFormat,
    ) -> BTreeMap<String, Result<String>> {
        stream::iter(names.iter().cloned())
            .map(|name: String| async move {
                let result = self.get_attribute(&name, format).await;
                (name, result)
            })
            .buffer_unordered(self.config.request.batch_parallelism.max(1))
            .collect()
            .await
    }

    /// Parses `value` into the attribute's native type and writes it
    #[instrument(skip(self, value), fields(resource = %self.resource_name))]
    pub async fn set_attribute(
        &self,
        name: &str,
        value: &str,
    ) -> Result<()> {
        let binding = self.attributes.get(name).await.ok_or_else(|| Error::not_found(name))?;
        let metadata = binding.metadata();
        if !metadata.is_writable() {
            return Err(FeatureError::ReadOnly { name: name.to_string() }.into());
        }
        let value = match &metadata.shape {
            FeatureShape::Attribute { value_type, .. } => FeatureValue::parse(value, *value_type)?,
            _ => FeatureValue::Text(value.to_string()),
        };

        let binder = self.attributes.binder();
        self.connection
            .with_session(|session| async { binder.write(session, &binding, value).await })
            .await
    }

    /// Invokes an operation after checking arity and coercing arguments to the declared types
    pub async fn invoke(
        &self,
        name: &str,
        arguments: Vec<FeatureValue>,
    ) -> Result<FeatureValue> {
        let binding = self.operations.get(name).await.ok_or_else(|| Error::not_found(name))?;
        let arguments = coerce_arguments(&binding, arguments)?;

        let binder = self.operations.binder();
        self.connection
            .with_session(|session| async { binder.invoke(session, &binding, arguments).await })
            .await
    }

    pub async fn list_attributes(&self) -> BTreeSet<String> {
        self.attributes.names().await
    }

    pub async fn list_operations(&self) -> BTreeSet<String> {
        self.operations.names().await
    }

    pub async fn list_notifications(&self) -> BTreeSet<String> {
        self.notifications.names().await
    }

    /// Diagnostic binding description of every feature of `kind`
    pub async fn bindings(
        &self,
        kind: FeatureKind,
    ) -> BTreeMap<String, BTreeMap<String, String>> {
        match kind {
            FeatureKind::Attribute => self.attributes.bindings().await,
            FeatureKind::Operation => self.operations.bindings().await,
            FeatureKind::Notification => self.notifications.bindings().await,
        }
    }

    /// Subscribes to this resource's notifications.
    ///
    /// `filter` is a category pattern that must match the whole category.
    pub fn subscribe_notifications(
        &self,
        filter: Option<&str>,
    ) -> Result<NotificationSubscription> {
        let filter = filter.map(NotificationFilter::category_pattern).transpose()?;
        Ok(self.dispatcher.subscribe_channel(filter))
    }

    /// Entry point for the protocol's notification callback
    pub async fn handle_raw_notifications(
        &self,
        raw: &[<P::Notifications as NotificationBinder>::Raw],
    ) -> usize {
        self.collector.collect(raw).await
    }

    /// Entry point for protocol callbacks that detect a broken session
    pub fn report_problem(
        &self,
        reason: impl Into<String>,
    ) -> bool {
        self.connection.report_problem(reason)
    }

    pub async fn is_connected(&self) -> bool {
        self.connection.is_connected().await
    }

    pub async fn simulate_failure(&self) -> Result<()> {
        self.connection.simulate_failure().await
    }

    /// Number of notifications re-armed after every reconnect
    pub fn armed_notifications(&self) -> usize {
        self.rearm.len()
    }

    /// Tears down every feature, then closes the connection
    #[instrument(skip(self), fields(resource = %self.resource_name))]
    pub async fn close(&self) {
        self.notifications.clear().await;
        self.operations.clear().await;
        self.attributes.clear().await;
        self.connection.close().await;
        info!("Connector closed");
    }
}

fn coerce_arguments<H>(
    binding: &Binding<H>,
    arguments: Vec<FeatureValue>,
) -> Result<Vec<FeatureValue>> {
    let parameters = match &binding.metadata().shape {
        FeatureShape::Operation { parameters, .. } => parameters,
        _ => return Ok(arguments),
    };
    if parameters.len() != arguments.len() {
        return Err(FeatureError::InvalidArguments {
            name: binding.name().to_string(),
            reason: format!("expected {} arguments, got {}", parameters.len(), arguments.len()),
        }
        .into());
    }
    parameters
        .iter()
        .zip(arguments)
        .map(|(parameter, argument)| argument.coerce(parameter.value_type))
        .collect()
}

fn log_expand(
    kind: FeatureKind,
    result: Result<ExpandReport>,
) -> Option<ExpandReport> {
    match result {
        Ok(report) => Some(report),
        Err(e) => {
            warn!(%kind, "Failed to enumerate remote features: {}", e);
            None
        }
    }
}
