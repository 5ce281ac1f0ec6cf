use std::sync::Arc;

use async_trait::async_trait;

use super::Binding;
use super::Discovered;
use super::Discovery;
use super::FeatureKind;
use super::FeatureMetadata;
use super::FeatureOptions;
use super::FeatureValue;
use crate::SessionFactory;
use crate::Result;

/// Session type reached through a binder's factory
pub type SessionOf<B> = <<B as FeatureBinder>::Factory as SessionFactory>::Session;

/// An entry of the remote endpoint's feature space
#[derive(Debug, Clone, PartialEq)]
pub struct RemoteFeature {
    pub name: String,
    pub options: FeatureOptions,
}

impl RemoteFeature {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            options: FeatureOptions::default(),
        }
    }
}

/// Protocol-specific capability behind one [`FeatureRepository`](crate::FeatureRepository).
///
/// Discovery validates that a remote feature exists and captures its native
/// shape; `release` tears the handle down again.
#[async_trait]
pub trait FeatureBinder: Send + Sync + 'static {
    type Factory: SessionFactory;
    type Handle: Send + Sync + 'static;

    fn kind(&self) -> FeatureKind;

    async fn discover(
        &self,
        session: Arc<SessionOf<Self>>,
        remote_name: &str,
        options: &FeatureOptions,
    ) -> Result<Discovery<Discovered<Self::Handle>>>;

    async fn release(
        &self,
        _binding: &Binding<Self::Handle>,
    ) {
    }

    /// Full remote feature space, in the endpoint's own order
    async fn enumerate(
        &self,
        session: Arc<SessionOf<Self>>,
    ) -> Result<Vec<RemoteFeature>>;

    /// Key that at most one entry of the repository may hold at a time
    fn exclusive_key(
        &self,
        _metadata: &FeatureMetadata,
    ) -> Option<String> {
        None
    }
}

#[async_trait]
pub trait AttributeBinder: FeatureBinder {
    async fn read(
        &self,
        session: Arc<SessionOf<Self>>,
        binding: &Binding<Self::Handle>,
    ) -> Result<FeatureValue>;

    async fn write(
        &self,
        session: Arc<SessionOf<Self>>,
        binding: &Binding<Self::Handle>,
        value: FeatureValue,
    ) -> Result<()>;
}

#[async_trait]
pub trait OperationBinder: FeatureBinder {
    async fn invoke(
        &self,
        session: Arc<SessionOf<Self>>,
        binding: &Binding<Self::Handle>,
        arguments: Vec<FeatureValue>,
    ) -> Result<FeatureValue>;
}

/// Envelope content produced by a binder before sequence and timestamp are stamped
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeDraft {
    pub category: String,
    pub message: String,
    pub payload: FeatureValue,
}

#[async_trait]
pub trait NotificationBinder: FeatureBinder {
    /// Notification as delivered by the protocol client library
    type Raw: Send + Sync + 'static;

    /// Returns a draft when the raw notification belongs to this binding
    fn matches(
        &self,
        binding: &Binding<Self::Handle>,
        raw: &Self::Raw,
    ) -> Option<EnvelopeDraft>;

    /// (Re)subscribes the binding on a freshly established session
    async fn arm(
        &self,
        session: &Arc<SessionOf<Self>>,
        binding: &Binding<Self::Handle>,
    ) -> Result<()>;
}
