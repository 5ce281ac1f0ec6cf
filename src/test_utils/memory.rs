//! In-memory management endpoint.
//!
//! A tiny protocol used by unit tests: attributes are stored values, the
//! `add` operation sums its arguments and notifications are raw
//! [`MemoryEvent`]s pushed through the connector by the test itself.

use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::AccessMode;
use crate::AttributeBinder;
use crate::Binding;
use crate::ConnectionConfig;
use crate::Connector;
use crate::ConnectorBuilder;
use crate::ConnectorConfig;
use crate::Discovered;
use crate::Discovery;
use crate::EnvelopeDraft;
use crate::Error;
use crate::FeatureBinder;
use crate::FeatureError;
use crate::FeatureKind;
use crate::FeatureMetadata;
use crate::FeatureOptions;
use crate::FeatureShape;
use crate::FeatureValue;
use crate::NotificationBinder;
use crate::OperationBinder;
use crate::ParameterSpec;
use crate::Protocol;
use crate::ReconnectHandler;
use crate::RemoteFeature;
use crate::Result;
use crate::SessionFactory;
use crate::ValueType;
use crate::OPTION_CATEGORY;

#[derive(Debug, Clone)]
struct StoredAttribute {
    name: String,
    value: FeatureValue,
    access: AccessMode,
}

/// Simulated remote device shared by every session it hands out
#[derive(Debug)]
pub struct MemoryEndpoint {
    reachable: AtomicBool,
    connect_delay: Mutex<Duration>,
    sessions_created: AtomicUsize,
    attributes: Mutex<Vec<StoredAttribute>>,
    operations: Mutex<Vec<String>>,
    categories: Mutex<Vec<String>>,
    /// (session id, remote category) per `arm` call
    armed: Mutex<Vec<(usize, String)>>,
}

impl MemoryEndpoint {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            reachable: AtomicBool::new(true),
            connect_delay: Mutex::new(Duration::ZERO),
            sessions_created: AtomicUsize::new(0),
            attributes: Mutex::new(Vec::new()),
            operations: Mutex::new(Vec::new()),
            categories: Mutex::new(Vec::new()),
            armed: Mutex::new(Vec::new()),
        })
    }

    /// Endpoint with a few features of every kind
    pub fn device() -> Arc<Self> {
        let endpoint = Self::new();
        endpoint.add_attribute("sysName", FeatureValue::Text("rack-7".into()), AccessMode::ReadWrite);
        endpoint.add_attribute("sysUpTime", FeatureValue::Int(1200), AccessMode::ReadOnly);
        endpoint.add_attribute("temperature", FeatureValue::Float(20.0), AccessMode::ReadOnly);
        endpoint.add_attribute("ifSpeed.1", FeatureValue::Int(1000), AccessMode::ReadWrite);
        endpoint.add_attribute("ifSpeed.2", FeatureValue::Int(100), AccessMode::ReadWrite);
        endpoint.add_operation("add");
        endpoint.add_category("linkDown");
        endpoint.add_category("linkUp");
        endpoint
    }

    pub fn add_attribute(
        &self,
        name: &str,
        value: FeatureValue,
        access: AccessMode,
    ) {
        let mut attributes = self.attributes.lock();
        attributes.retain(|a| a.name != name);
        attributes.push(StoredAttribute {
            name: name.to_string(),
            value,
            access,
        });
    }

    pub fn remove_attribute(
        &self,
        name: &str,
    ) {
        self.attributes.lock().retain(|a| a.name != name);
    }

    pub fn add_operation(
        &self,
        name: &str,
    ) {
        self.operations.lock().push(name.to_string());
    }

    pub fn add_category(
        &self,
        name: &str,
    ) {
        self.categories.lock().push(name.to_string());
    }

    pub fn set_reachable(
        &self,
        reachable: bool,
    ) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn set_connect_delay(
        &self,
        delay: Duration,
    ) {
        *self.connect_delay.lock() = delay;
    }

    pub fn sessions_created(&self) -> usize {
        self.sessions_created.load(Ordering::SeqCst)
    }

    pub fn attribute(
        &self,
        name: &str,
    ) -> Option<FeatureValue> {
        self.attributes.lock().iter().find(|a| a.name == name).map(|a| a.value.clone())
    }

    /// Categories armed on the given session, in arm order
    pub fn armed_on(
        &self,
        session_id: usize,
    ) -> Vec<String> {
        self.armed
            .lock()
            .iter()
            .filter(|(id, _)| *id == session_id)
            .map(|(_, category)| category.clone())
            .collect()
    }

    fn find_attribute(
        &self,
        name: &str,
    ) -> Option<StoredAttribute> {
        self.attributes.lock().iter().find(|a| a.name == name).cloned()
    }
}

#[derive(Debug)]
pub struct MemorySession {
    id: usize,
    endpoint: Arc<MemoryEndpoint>,
    open: AtomicBool,
}

impl MemorySession {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn check(&self) -> Result<()> {
        if !self.is_open() {
            return Err(Error::transport(format!("session {} is closed", self.id)));
        }
        if !self.endpoint.reachable.load(Ordering::SeqCst) {
            return Err(Error::transport("endpoint unreachable"));
        }
        Ok(())
    }
}

pub struct MemoryFactory {
    endpoint: Arc<MemoryEndpoint>,
}

impl MemoryFactory {
    pub fn new(endpoint: Arc<MemoryEndpoint>) -> Self {
        Self { endpoint }
    }
}

#[async_trait]
impl SessionFactory for MemoryFactory {
    type Session = MemorySession;

    async fn create(&self) -> Result<MemorySession> {
        let delay = *self.endpoint.connect_delay.lock();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if !self.endpoint.reachable.load(Ordering::SeqCst) {
            return Err(Error::transport("endpoint unreachable"));
        }
        let id = self.endpoint.sessions_created.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(MemorySession {
            id,
            endpoint: self.endpoint.clone(),
            open: AtomicBool::new(true),
        })
    }

    async fn close(
        &self,
        session: &MemorySession,
    ) {
        session.open.store(false, Ordering::SeqCst);
    }
}

/// Attribute binder. A `unit` option of `F` converts Celsius readings.
#[derive(Debug, Default)]
pub struct MemoryAttributes;

#[async_trait]
impl FeatureBinder for MemoryAttributes {
    type Factory = MemoryFactory;
    type Handle = String;

    fn kind(&self) -> FeatureKind {
        FeatureKind::Attribute
    }

    async fn discover(
        &self,
        session: Arc<MemorySession>,
        remote_name: &str,
        _options: &FeatureOptions,
    ) -> Result<Discovery<Discovered<String>>> {
        session.check()?;
        Ok(match session.endpoint.find_attribute(remote_name) {
            Some(attribute) => Discovery::Found(Discovered {
                shape: FeatureShape::Attribute {
                    value_type: attribute.value.value_type(),
                    access: attribute.access,
                },
                handle: attribute.name,
            }),
            None => Discovery::NotFound,
        })
    }

    async fn enumerate(
        &self,
        session: Arc<MemorySession>,
    ) -> Result<Vec<RemoteFeature>> {
        session.check()?;
        Ok(session
            .endpoint
            .attributes
            .lock()
            .iter()
            .map(|a| RemoteFeature::new(a.name.clone()))
            .collect())
    }
}

#[async_trait]
impl AttributeBinder for MemoryAttributes {
    async fn read(
        &self,
        session: Arc<MemorySession>,
        binding: &Binding<String>,
    ) -> Result<FeatureValue> {
        session.check()?;
        let value = session
            .endpoint
            .attribute(binding.handle())
            .ok_or_else(|| Error::not_found(binding.name()))?;

        Ok(match (binding.metadata().options.get("unit"), value) {
            (Some("F"), FeatureValue::Float(celsius)) => FeatureValue::Float(celsius * 9.0 / 5.0 + 32.0),
            (_, value) => value,
        })
    }

    async fn write(
        &self,
        session: Arc<MemorySession>,
        binding: &Binding<String>,
        value: FeatureValue,
    ) -> Result<()> {
        session.check()?;
        let mut attributes = session.endpoint.attributes.lock();
        let attribute = attributes
            .iter_mut()
            .find(|a| &a.name == binding.handle())
            .ok_or_else(|| Error::not_found(binding.name()))?;
        attribute.value = value;
        Ok(())
    }
}

/// Operation binder. Every operation takes two ints and returns their sum.
#[derive(Debug, Default)]
pub struct MemoryOperations;

#[async_trait]
impl FeatureBinder for MemoryOperations {
    type Factory = MemoryFactory;
    type Handle = String;

    fn kind(&self) -> FeatureKind {
        FeatureKind::Operation
    }

    async fn discover(
        &self,
        session: Arc<MemorySession>,
        remote_name: &str,
        _options: &FeatureOptions,
    ) -> Result<Discovery<Discovered<String>>> {
        session.check()?;
        if !session.endpoint.operations.lock().iter().any(|o| o == remote_name) {
            return Ok(Discovery::NotFound);
        }
        let parameters = ["a", "b"]
            .iter()
            .map(|name| ParameterSpec {
                name: name.to_string(),
                value_type: ValueType::Int,
            })
            .collect();
        Ok(Discovery::Found(Discovered {
            shape: FeatureShape::Operation {
                parameters,
                returns: ValueType::Int,
            },
            handle: remote_name.to_string(),
        }))
    }

    async fn enumerate(
        &self,
        session: Arc<MemorySession>,
    ) -> Result<Vec<RemoteFeature>> {
        session.check()?;
        Ok(session.endpoint.operations.lock().iter().map(RemoteFeature::new).collect())
    }
}

#[async_trait]
impl OperationBinder for MemoryOperations {
    async fn invoke(
        &self,
        session: Arc<MemorySession>,
        binding: &Binding<String>,
        arguments: Vec<FeatureValue>,
    ) -> Result<FeatureValue> {
        session.check()?;
        let mut sum = 0i64;
        for argument in &arguments {
            sum += argument.as_i64().ok_or_else(|| FeatureError::InvalidArguments {
                name: binding.name().to_string(),
                reason: format!("expected int, got {}", argument.value_type()),
            })?;
        }
        Ok(FeatureValue::Int(sum))
    }
}

/// Raw notification as the in-memory endpoint emits it
#[derive(Debug, Clone)]
pub struct MemoryEvent {
    pub category: String,
    pub message: String,
    pub payload: FeatureValue,
}

impl MemoryEvent {
    pub fn new(
        category: &str,
        message: &str,
    ) -> Self {
        Self {
            category: category.to_string(),
            message: message.to_string(),
            payload: FeatureValue::Null,
        }
    }
}

/// Notification binder. The handle is the remote category.
#[derive(Debug, Default)]
pub struct MemoryNotifications;

#[async_trait]
impl FeatureBinder for MemoryNotifications {
    type Factory = MemoryFactory;
    type Handle = String;

    fn kind(&self) -> FeatureKind {
        FeatureKind::Notification
    }

    async fn discover(
        &self,
        session: Arc<MemorySession>,
        remote_name: &str,
        options: &FeatureOptions,
    ) -> Result<Discovery<Discovered<String>>> {
        session.check()?;
        if !session.endpoint.categories.lock().iter().any(|c| c == remote_name) {
            return Ok(Discovery::NotFound);
        }
        session.endpoint.armed.lock().push((session.id, remote_name.to_string()));
        Ok(Discovery::Found(Discovered {
            shape: FeatureShape::Notification {
                category: options.get_or(OPTION_CATEGORY, remote_name).to_string(),
            },
            handle: remote_name.to_string(),
        }))
    }

    async fn enumerate(
        &self,
        session: Arc<MemorySession>,
    ) -> Result<Vec<RemoteFeature>> {
        session.check()?;
        Ok(session.endpoint.categories.lock().iter().map(RemoteFeature::new).collect())
    }

    fn exclusive_key(
        &self,
        metadata: &FeatureMetadata,
    ) -> Option<String> {
        metadata.category().map(str::to_string)
    }
}

#[async_trait]
impl NotificationBinder for MemoryNotifications {
    type Raw = MemoryEvent;

    fn matches(
        &self,
        binding: &Binding<String>,
        raw: &MemoryEvent,
    ) -> Option<EnvelopeDraft> {
        if &raw.category != binding.handle() {
            return None;
        }
        Some(EnvelopeDraft {
            category: binding.metadata().category().unwrap_or(&raw.category).to_string(),
            message: raw.message.clone(),
            payload: raw.payload.clone(),
        })
    }

    async fn arm(
        &self,
        session: &Arc<MemorySession>,
        binding: &Binding<String>,
    ) -> Result<()> {
        session.check()?;
        session.endpoint.armed.lock().push((session.id, binding.handle().clone()));
        Ok(())
    }
}

/// Protocol bundle for connector tests
pub struct MemoryProtocol;

impl Protocol for MemoryProtocol {
    type Factory = MemoryFactory;
    type Attributes = MemoryAttributes;
    type Operations = MemoryOperations;
    type Notifications = MemoryNotifications;
}

/// Configuration with short watchdog periods for virtual-time tests
pub fn test_connector_config() -> ConnectorConfig {
    ConnectorConfig {
        connection: ConnectionConfig {
            endpoint: "mem://device:1".to_string(),
            watchdog_period_in_ms: 100,
            connect_timeout_in_ms: 50,
            failure_observe_timeout_in_ms: 1_000,
        },
        ..ConnectorConfig::default()
    }
}

pub fn memory_connector(
    resource_name: &str,
    endpoint: &Arc<MemoryEndpoint>,
    config: ConnectorConfig,
) -> Connector<MemoryProtocol> {
    ConnectorBuilder::<MemoryProtocol>::new(resource_name)
        .config(config)
        .factory(MemoryFactory::new(endpoint.clone()))
        .attributes(MemoryAttributes)
        .operations(MemoryOperations)
        .notifications(MemoryNotifications)
        .build()
        .expect("valid connector")
}

/// Reconnect handler that records the id of every session it sees
#[derive(Debug, Default)]
pub struct RecordingHandler {
    seen: Mutex<Vec<usize>>,
    fail: AtomicBool,
    /// Shared log used to assert ordering across handlers
    order: Option<Arc<Mutex<Vec<&'static str>>>>,
    label: &'static str,
}

impl RecordingHandler {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn failing() -> Arc<Self> {
        let handler = Self::default();
        handler.fail.store(true, Ordering::SeqCst);
        Arc::new(handler)
    }

    pub fn labelled(
        label: &'static str,
        order: Arc<Mutex<Vec<&'static str>>>,
    ) -> Arc<Self> {
        Arc::new(Self {
            order: Some(order),
            label,
            ..Self::default()
        })
    }

    pub fn seen(&self) -> Vec<usize> {
        self.seen.lock().clone()
    }
}

#[async_trait]
impl ReconnectHandler<MemorySession> for RecordingHandler {
    async fn on_reconnect(
        &self,
        session: &Arc<MemorySession>,
    ) -> Result<()> {
        self.seen.lock().push(session.id());
        if let Some(order) = &self.order {
            order.lock().push(self.label);
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(Error::Fatal("handler failure".into()));
        }
        Ok(())
    }
}
