use std::fmt;
use std::sync::Arc;
use std::sync::Weak;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::debug;
use tracing::warn;

use super::Handback;
use super::NotificationDispatcher;
use super::NotificationEnvelope;
use super::NotificationFilter;
use super::NotificationListener;
use super::SubscriptionId;
use crate::metrics::DROP_BUFFER_FULL;
use crate::metrics::NOTIFICATIONS_DROPPED;
use crate::Result;

/// Forwards envelopes into a bounded channel. A full buffer drops the newest envelope.
struct ChannelListener {
    sender: mpsc::Sender<NotificationEnvelope>,
}

#[async_trait]
impl NotificationListener for ChannelListener {
    async fn handle_notification(
        &self,
        envelope: &NotificationEnvelope,
        _handback: Option<Handback>,
    ) -> Result<()> {
        match self.sender.try_send(envelope.clone()) {
            Ok(()) => {}
            Err(TrySendError::Full(dropped)) => {
                NOTIFICATIONS_DROPPED.with_label_values(&[DROP_BUFFER_FULL]).inc();
                warn!(sequence = dropped.sequence, "Subscription buffer full, envelope dropped");
            }
            Err(TrySendError::Closed(_)) => {
                debug!("Subscription receiver already closed");
            }
        }
        Ok(())
    }
}

/// Adapter-side handle of one subscription.
///
/// Envelopes are buffered until read with [`recv`](Self::recv). Closing the
/// handle, or dropping it, removes exactly this subscription.
pub struct NotificationSubscription {
    id: SubscriptionId,
    receiver: mpsc::Receiver<NotificationEnvelope>,
    dispatcher: Weak<NotificationDispatcher>,
    closed: bool,
}

impl fmt::Debug for NotificationSubscription {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("NotificationSubscription")
            .field("id", &self.id)
            .field("closed", &self.closed)
            .finish()
    }
}

impl NotificationSubscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub async fn recv(&mut self) -> Option<NotificationEnvelope> {
        self.receiver.recv().await
    }

    pub fn try_recv(&mut self) -> Option<NotificationEnvelope> {
        self.receiver.try_recv().ok()
    }

    /// Returns `false` if the subscription was already gone
    pub fn close(&mut self) -> bool {
        if self.closed {
            return false;
        }
        self.closed = true;
        self.receiver.close();
        match self.dispatcher.upgrade() {
            Some(dispatcher) => dispatcher.unsubscribe_id(self.id).is_ok(),
            None => false,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }
}

impl Drop for NotificationSubscription {
    fn drop(&mut self) {
        self.close();
    }
}

impl NotificationDispatcher {
    /// Subscribes a channel-backed listener and returns its handle
    pub fn subscribe_channel(
        self: &Arc<Self>,
        filter: Option<NotificationFilter>,
    ) -> NotificationSubscription {
        let (sender, receiver) = mpsc::channel(self.subscription_capacity);
        let id = self.subscribe(Arc::new(ChannelListener { sender }), filter, None);
        NotificationSubscription {
            id,
            receiver,
            dispatcher: Arc::downgrade(self),
            closed: false,
        }
    }
}
