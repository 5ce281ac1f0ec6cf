use std::any::Any;
use std::fmt;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::SystemTime;

use async_trait::async_trait;
use futures::stream;
use futures::StreamExt;
#[cfg(test)]
use mockall::automock;
use parking_lot::RwLock;
use tokio::sync::Mutex;
use tracing::debug;
use tracing::trace;
use tracing::warn;

use super::LocalSequence;
use super::NotificationEnvelope;
use super::NotificationFilter;
use super::SequenceGenerator;
use crate::metrics::DROP_SUSPENDED;
use crate::metrics::LISTENER_FAILURES;
use crate::metrics::NOTIFICATIONS_DISPATCHED;
use crate::metrics::NOTIFICATIONS_DROPPED;
use crate::DispatchError;
use crate::EnvelopeDraft;
use crate::FeatureValue;
use crate::NotificationConfig;
use crate::Result;

/// Opaque value handed back to the listener with every envelope of a subscription
pub type Handback = Arc<dyn Any + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

#[cfg_attr(test, automock)]
#[async_trait]
pub trait NotificationListener: Send + Sync + 'static {
    async fn handle_notification(
        &self,
        envelope: &NotificationEnvelope,
        handback: Option<Handback>,
    ) -> Result<()>;
}

struct Subscription {
    id: SubscriptionId,
    listener: Arc<dyn NotificationListener>,
    filter: Option<NotificationFilter>,
    handback: Option<Handback>,
}

impl Subscription {
    fn accepts(
        &self,
        envelope: &NotificationEnvelope,
    ) -> bool {
        self.filter.as_ref().map_or(true, |f| f.accepts(envelope))
    }
}

/// Fans envelopes out to subscribed listeners.
///
/// Delivery to one listener never blocks on, or fails because of, another
/// listener's error. With `parallelism > 1` listeners of one envelope run
/// concurrently, bounded by that number.
///
/// Envelopes published through [`publish`](Self::publish) or
/// [`emit`](Self::emit) reach every listener in sequence order, even with
/// concurrent publishers. A listener must not publish from inside its own
/// callback. Callers pairing [`stamp`](Self::stamp) with
/// [`dispatch`](Self::dispatch) themselves get no such ordering.
pub struct NotificationDispatcher {
    subscriptions: RwLock<Vec<Subscription>>,
    publishing: Mutex<()>,
    next_id: AtomicU64,
    sequence: Arc<dyn SequenceGenerator>,
    suspended: AtomicBool,
    parallelism: usize,
    pub(super) subscription_capacity: usize,
}

impl NotificationDispatcher {
    pub fn new(config: &NotificationConfig) -> Self {
        Self::with_sequence(config, Arc::new(LocalSequence::new()))
    }

    pub fn with_sequence(
        config: &NotificationConfig,
        sequence: Arc<dyn SequenceGenerator>,
    ) -> Self {
        Self {
            subscriptions: RwLock::new(Vec::new()),
            publishing: Mutex::new(()),
            next_id: AtomicU64::new(1),
            sequence,
            suspended: AtomicBool::new(config.start_suspended),
            parallelism: config.parallelism.max(1),
            subscription_capacity: config.subscription_capacity.max(1),
        }
    }

    pub fn subscribe(
        &self,
        listener: Arc<dyn NotificationListener>,
        filter: Option<NotificationFilter>,
        handback: Option<Handback>,
    ) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        debug!(%id, filter = ?filter.as_ref().map(|f| f.description()), "Listener subscribed");
        self.subscriptions.write().push(Subscription {
            id,
            listener,
            filter,
            handback,
        });
        id
    }

    /// Removes every subscription of `listener`
    pub fn unsubscribe(
        &self,
        listener: &Arc<dyn NotificationListener>,
    ) -> Result<usize> {
        let mut subscriptions = self.subscriptions.write();
        let before = subscriptions.len();
        subscriptions.retain(|s| !same_listener(&s.listener, listener));
        let removed = before - subscriptions.len();
        if removed == 0 {
            return Err(DispatchError::ListenerNotFound.into());
        }
        Ok(removed)
    }

    pub fn unsubscribe_id(
        &self,
        id: SubscriptionId,
    ) -> Result<()> {
        let mut subscriptions = self.subscriptions.write();
        let position = subscriptions
            .iter()
            .position(|s| s.id == id)
            .ok_or(DispatchError::SubscriptionNotFound(id.value()))?;
        subscriptions.remove(position);
        Ok(())
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    pub fn set_suspended(
        &self,
        suspended: bool,
    ) {
        let previous = self.suspended.swap(suspended, Ordering::SeqCst);
        if previous != suspended {
            debug!(suspended, "Notification delivery toggled");
        }
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.load(Ordering::SeqCst)
    }

    /// Stamps a sequence number and timestamp. The sequence advances even
    /// while delivery is suspended.
    pub fn stamp(
        &self,
        draft: EnvelopeDraft,
        source: &str,
    ) -> NotificationEnvelope {
        NotificationEnvelope {
            category: draft.category,
            source: source.to_string(),
            sequence: self.sequence.next(),
            timestamp: SystemTime::now(),
            message: draft.message,
            payload: draft.payload,
        }
    }

    /// Stamps and dispatches `draft` as one step. Returns its sequence number.
    pub async fn publish(
        &self,
        draft: EnvelopeDraft,
        source: &str,
    ) -> u64 {
        let _publishing = self.publishing.lock().await;
        let envelope = self.stamp(draft, source);
        let sequence = envelope.sequence;
        self.dispatch(envelope).await;
        sequence
    }

    /// Builds an envelope and publishes it. Returns its sequence number.
    pub async fn emit(
        &self,
        category: &str,
        source: &str,
        message: &str,
        payload: FeatureValue,
    ) -> u64 {
        self.publish(
            EnvelopeDraft {
                category: category.to_string(),
                message: message.to_string(),
                payload,
            },
            source,
        )
        .await
    }

    /// Delivers `envelope` to every subscription whose filter accepts it.
    ///
    /// Returns the number of listeners invoked. Listener failures are logged
    /// and counted, never returned.
    pub async fn dispatch(
        &self,
        envelope: NotificationEnvelope,
    ) -> usize {
        if self.is_suspended() {
            NOTIFICATIONS_DROPPED.with_label_values(&[DROP_SUSPENDED]).inc();
            trace!(sequence = envelope.sequence, "Delivery suspended, envelope dropped");
            return 0;
        }

        let targets: Vec<(Arc<dyn NotificationListener>, Option<Handback>)> = self
            .subscriptions
            .read()
            .iter()
            .filter(|s| s.accepts(&envelope))
            .map(|s| (s.listener.clone(), s.handback.clone()))
            .collect();

        NOTIFICATIONS_DISPATCHED.inc();
        let delivered = targets.len();

        if self.parallelism <= 1 {
            for (listener, handback) in targets {
                deliver(&envelope, listener, handback).await;
            }
        } else {
            let envelope = &envelope;
            stream::iter(targets)
                .for_each_concurrent(self.parallelism, |(listener, handback)| async move {
                    deliver(envelope, listener, handback).await;
                })
                .await;
        }

        delivered
    }
}

async fn deliver(
    envelope: &NotificationEnvelope,
    listener: Arc<dyn NotificationListener>,
    handback: Option<Handback>,
) {
    if let Err(e) = listener.handle_notification(envelope, handback).await {
        LISTENER_FAILURES.inc();
        warn!(
            category = %envelope.category,
            sequence = envelope.sequence,
            "Notification listener failed: {}",
            e
        );
    }
}

fn same_listener(
    a: &Arc<dyn NotificationListener>,
    b: &Arc<dyn NotificationListener>,
) -> bool {
    std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ())
}
