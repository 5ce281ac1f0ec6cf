use std::sync::Arc;

use tracing::trace;

use super::NotificationDispatcher;
use crate::EnvelopeDraft;
use crate::FeatureRepository;
use crate::NotificationBinder;

/// Turns raw protocol notifications into envelopes for every matching entry.
///
/// The bindings are snapshotted under a single read lease of the repository.
/// Envelopes are stamped in the order the raw notifications arrived and
/// dispatched after the lease is released so slow listeners never hold it.
pub struct NotificationCollector<B: NotificationBinder> {
    repository: Arc<FeatureRepository<B>>,
    dispatcher: Arc<NotificationDispatcher>,
    source: String,
}

impl<B: NotificationBinder> NotificationCollector<B> {
    pub fn new(
        repository: Arc<FeatureRepository<B>>,
        dispatcher: Arc<NotificationDispatcher>,
        source: impl Into<String>,
    ) -> Self {
        Self {
            repository,
            dispatcher,
            source: source.into(),
        }
    }

    /// Returns the number of envelopes dispatched
    pub async fn collect(
        &self,
        raw: &[B::Raw],
    ) -> usize {
        let binder = self.repository.binder().clone();
        let mut bindings = Vec::new();
        self.repository
            .for_each(|binding| {
                bindings.push(binding.clone());
                true
            })
            .await;

        // arrival order decides sequence order
        let drafts: Vec<EnvelopeDraft> = raw
            .iter()
            .flat_map(|r| bindings.iter().filter_map(|binding| binder.matches(binding, r)))
            .collect();

        trace!(raw = raw.len(), matched = drafts.len(), "Notifications collected");
        let count = drafts.len();
        for draft in drafts {
            self.dispatcher.publish(draft, &self.source).await;
        }
        count
    }
}
