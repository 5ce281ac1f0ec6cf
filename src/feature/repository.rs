use std::collections::BTreeMap;
use std::collections::BTreeSet;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock as SyncRwLock;
use regex::Regex;
use tokio::sync::RwLock;
use tracing::debug;
use tracing::info;
use tracing::instrument;
use tracing::warn;

use super::Binding;
use super::FeatureBinder;
use super::FeatureIdentity;
use super::FeatureMetadata;
use super::FeatureOptions;
use super::RemoteFeature;
use super::OPTION_USE_REGEXP;
use crate::metrics::FEATURE_REBUILDS;
use crate::ConnectionManager;
use crate::Error;
use crate::FeatureError;
use crate::Result;

/// Structural change announced to repository listeners
#[derive(Debug)]
pub enum RepositoryEvent<H> {
    /// Fired after discovery succeeded and the entry is visible
    Added(Arc<Binding<H>>),
    /// Fired before the entry's handle is released
    Removing(Arc<Binding<H>>),
}

impl<H> RepositoryEvent<H> {
    pub fn binding(&self) -> &Arc<Binding<H>> {
        match self {
            RepositoryEvent::Added(b) | RepositoryEvent::Removing(b) => b,
        }
    }
}

pub trait RepositoryListener<H>: Send + Sync + 'static {
    fn on_event(
        &self,
        event: &RepositoryEvent<H>,
    );
}

/// Outcome of a bulk [`expand`](FeatureRepository::expand)
#[derive(Debug, Default)]
pub struct ExpandReport {
    pub added: Vec<Arc<FeatureMetadata>>,
    pub failures: Vec<(String, Error)>,
}

type ListenerList<H> = Vec<Arc<dyn RepositoryListener<H>>>;

/// Concurrency-safe catalog of one feature kind.
///
/// # Locking
///
/// One reader/writer lock guards the entries. `connect`, `remove` and
/// `clear` take the write lease, queries take the read lease. Discovery runs
/// under the repository write lease and then the connection lease, never the
/// other way round. Listener callbacks run after the lease is released.
pub struct FeatureRepository<B: FeatureBinder> {
    binder: Arc<B>,
    connection: Arc<ConnectionManager<B::Factory>>,
    entries: RwLock<HashMap<String, Arc<Binding<B::Handle>>>>,
    listeners: SyncRwLock<ListenerList<B::Handle>>,
}

impl<B: FeatureBinder> FeatureRepository<B> {
    pub fn new(
        binder: Arc<B>,
        connection: Arc<ConnectionManager<B::Factory>>,
    ) -> Self {
        Self {
            binder,
            connection,
            entries: RwLock::new(HashMap::new()),
            listeners: SyncRwLock::new(Vec::new()),
        }
    }

    pub fn binder(&self) -> &Arc<B> {
        &self.binder
    }

    /// Connects a feature, or returns the existing entry when nothing material changed.
    ///
    /// An entry with the same name but a different identity is removed and
    /// torn down first, then discovered again.
    #[instrument(skip(self, options), fields(kind = %self.binder.kind()))]
    pub async fn connect(
        &self,
        name: &str,
        options: FeatureOptions,
    ) -> Result<Arc<Binding<B::Handle>>> {
        let identity = FeatureIdentity::compute(name, &options);

        loop {
            let mut entries = self.entries.write().await;

            if let Some(existing) = entries.get(name).cloned() {
                if existing.identity() == identity {
                    debug!(%identity, "Feature unchanged");
                    return Ok(existing);
                }
                entries.remove(name);
                drop(entries);

                info!(
                    old = %existing.identity(),
                    new = %identity,
                    "Feature options changed, rebuilding"
                );
                FEATURE_REBUILDS.with_label_values(&[&self.binder.kind().to_string()]).inc();
                self.teardown(existing).await;
                continue;
            }

            let binding = Arc::new(self.bind(name, &options, identity).await?);

            if let Some(key) = self.binder.exclusive_key(binding.metadata()) {
                let owner = entries
                    .values()
                    .find(|other| self.binder.exclusive_key(other.metadata()).as_deref() == Some(key.as_str()))
                    .map(|other| other.name().to_string());
                if let Some(owner) = owner {
                    drop(entries);
                    self.binder.release(&binding).await;
                    return Err(FeatureError::CategoryInUse { category: key, owner }.into());
                }
            }

            entries.insert(name.to_string(), binding.clone());
            drop(entries);

            debug!(%identity, remote = %binding.metadata().remote_name, "Feature connected");
            self.fire(&RepositoryEvent::Added(binding.clone()));
            return Ok(binding);
        }
    }

    /// Removes and tears down a feature. `Removing` is fired before teardown.
    pub async fn remove(
        &self,
        name: &str,
    ) -> Option<Arc<FeatureMetadata>> {
        let removed = self.entries.write().await.remove(name)?;
        let metadata = removed.metadata().clone();
        self.teardown(removed).await;
        Some(metadata)
    }

    /// Connects every remote feature that is not present yet.
    ///
    /// Individual failures are collected; the batch always completes.
    #[instrument(skip(self), fields(kind = %self.binder.kind()))]
    pub async fn expand(&self) -> Result<ExpandReport> {
        let binder = self.binder.clone();
        let remote = self
            .connection
            .with_session(|session| async move { binder.enumerate(session).await })
            .await?;

        let mut report = ExpandReport::default();
        for RemoteFeature { name, options } in remote {
            if self.contains(&name).await {
                continue;
            }
            match self.connect(&name, options).await {
                Ok(binding) => report.added.push(binding.metadata().clone()),
                Err(e) => {
                    warn!(feature = %name, "expand: failed to connect feature: {}", e);
                    report.failures.push((name, e));
                }
            }
        }

        info!(
            added = report.added.len(),
            failed = report.failures.len(),
            "Feature space expanded"
        );
        Ok(report)
    }

    /// Read-locked iteration. Return `false` from `reader` to stop early.
    pub async fn for_each<R>(
        &self,
        mut reader: R,
    ) where
        R: FnMut(&Arc<Binding<B::Handle>>) -> bool,
    {
        let entries = self.entries.read().await;
        for binding in entries.values() {
            if !reader(binding) {
                break;
            }
        }
    }

    /// Tears down every entry
    pub async fn clear(&self) {
        let drained: Vec<_> = self.entries.write().await.drain().map(|(_, b)| b).collect();
        for binding in drained {
            self.teardown(binding).await;
        }
    }

    pub async fn get(
        &self,
        name: &str,
    ) -> Option<Arc<Binding<B::Handle>>> {
        self.entries.read().await.get(name).cloned()
    }

    pub async fn contains(
        &self,
        name: &str,
    ) -> bool {
        self.entries.read().await.contains_key(name)
    }

    pub async fn names(&self) -> BTreeSet<String> {
        self.entries.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn snapshot(&self) -> Vec<Arc<Binding<B::Handle>>> {
        self.entries.read().await.values().cloned().collect()
    }

    /// Diagnostic description of every binding, keyed by feature name
    pub async fn bindings(&self) -> BTreeMap<String, BTreeMap<String, String>> {
        self.entries
            .read()
            .await
            .iter()
            .map(|(name, binding)| (name.clone(), binding.metadata().binding_properties()))
            .collect()
    }

    pub fn add_listener(
        &self,
        listener: Arc<dyn RepositoryListener<B::Handle>>,
    ) {
        self.listeners.write().push(listener);
    }

    pub fn remove_listener(
        &self,
        listener: &Arc<dyn RepositoryListener<B::Handle>>,
    ) -> bool {
        let mut listeners = self.listeners.write();
        let before = listeners.len();
        listeners.retain(|l| !std::ptr::eq(Arc::as_ptr(l) as *const (), Arc::as_ptr(listener) as *const ()));
        listeners.len() != before
    }

    async fn bind(
        &self,
        name: &str,
        options: &FeatureOptions,
        identity: FeatureIdentity,
    ) -> Result<Binding<B::Handle>> {
        let binder = &self.binder;
        let remote_name = if options.flag(OPTION_USE_REGEXP) {
            self.resolve_pattern(options.remote_name(name)).await?
        } else {
            Some(options.remote_name(name).to_string())
        };
        let remote_name = remote_name.ok_or_else(|| Error::not_found(name))?;

        let discovered = self
            .connection
            .with_session(|session| async { binder.discover(session, &remote_name, options).await })
            .await?
            .found()
            .ok_or_else(|| Error::not_found(name))?;

        let metadata = FeatureMetadata {
            name: name.to_string(),
            remote_name: remote_name.clone(),
            identity,
            shape: discovered.shape,
            options: options.clone(),
        };
        Ok(Binding::new(metadata, discovered.handle))
    }

    /// Resolves a remote name pattern against the endpoint's feature space.
    ///
    /// The first match in enumeration order wins. When the remote topology
    /// changes between calls, two connects with the same pattern may resolve
    /// to different features.
    async fn resolve_pattern(
        &self,
        pattern: &str,
    ) -> Result<Option<String>> {
        let regex = Regex::new(&format!("^(?:{pattern})$")).map_err(|e| FeatureError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let binder = self.binder.clone();
        let remote = self
            .connection
            .with_session(|session| async move { binder.enumerate(session).await })
            .await?;

        let mut matches = remote.into_iter().filter(|f| regex.is_match(&f.name));
        let first = matches.next().map(|f| f.name);
        if first.is_some() && matches.next().is_some() {
            warn!(pattern, chosen = ?first, "Pattern matches several remote features, using the first");
        }
        Ok(first)
    }

    async fn teardown(
        &self,
        binding: Arc<Binding<B::Handle>>,
    ) {
        self.fire(&RepositoryEvent::Removing(binding.clone()));
        self.binder.release(&binding).await;
        debug!(feature = binding.name(), "Feature torn down");
    }

    fn fire(
        &self,
        event: &RepositoryEvent<B::Handle>,
    ) {
        let listeners: ListenerList<B::Handle> = self.listeners.read().clone();
        for listener in listeners {
            listener.on_event(event);
        }
    }
}
