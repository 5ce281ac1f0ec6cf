use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tracing::debug;
use tracing::warn;

use crate::AttributeBinder;
use crate::Binding;
use crate::Error;
use crate::NotificationBinder;
use crate::OperationBinder;
use crate::ReconnectHandler;
use crate::RepositoryEvent;
use crate::RepositoryListener;
use crate::Result;
use crate::SessionFactory;
use crate::SessionOf;

/// Everything a wire protocol contributes to a [`Connector`](super::Connector).
///
/// All three binders share the protocol's session factory.
pub trait Protocol: Send + Sync + 'static {
    type Factory: SessionFactory;
    type Attributes: AttributeBinder<Factory = Self::Factory>;
    type Operations: OperationBinder<Factory = Self::Factory>;
    type Notifications: NotificationBinder<Factory = Self::Factory>;
}

/// Keeps remote notification subscriptions alive across reconnects.
///
/// Tracks enabled notifications through repository events instead of reading
/// the repository, because reconnect handlers run under the connection write
/// lease and must not wait on the repository lock.
pub(crate) struct NotificationRearm<B: NotificationBinder> {
    binder: Arc<B>,
    armed: Mutex<BTreeMap<String, Arc<Binding<B::Handle>>>>,
}

impl<B: NotificationBinder> NotificationRearm<B> {
    pub(crate) fn new(binder: Arc<B>) -> Self {
        Self {
            binder,
            armed: Mutex::new(BTreeMap::new()),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.armed.lock().len()
    }
}

impl<B: NotificationBinder> RepositoryListener<B::Handle> for NotificationRearm<B> {
    fn on_event(
        &self,
        event: &RepositoryEvent<B::Handle>,
    ) {
        let mut armed = self.armed.lock();
        match event {
            RepositoryEvent::Added(binding) => {
                armed.insert(binding.name().to_string(), binding.clone());
            }
            RepositoryEvent::Removing(binding) => {
                // only forget the exact binding being torn down
                if armed.get(binding.name()).is_some_and(|current| Arc::ptr_eq(current, binding)) {
                    armed.remove(binding.name());
                }
            }
        }
    }
}

#[async_trait]
impl<B: NotificationBinder> ReconnectHandler<SessionOf<B>> for NotificationRearm<B> {
    async fn on_reconnect(
        &self,
        session: &Arc<SessionOf<B>>,
    ) -> Result<()> {
        let bindings: Vec<_> = self.armed.lock().values().cloned().collect();
        let mut failed = Vec::new();
        for binding in &bindings {
            if let Err(e) = self.binder.arm(session, binding).await {
                warn!(notification = binding.name(), "Failed to re-arm notification: {}", e);
                failed.push(binding.name().to_string());
            }
        }
        debug!(total = bindings.len(), failed = failed.len(), "Notifications re-armed");

        if failed.is_empty() {
            Ok(())
        } else {
            Err(Error::Fatal(format!("failed to re-arm notifications: {}", failed.join(", "))))
        }
    }
}
