use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::debug;
use tracing::instrument;

use super::AsyncTransport;
use super::Oid;
use super::Request;
use super::RequestCorrelator;
use super::RequestKind;
use super::Response;
use super::VarBind;
use super::VarValue;
use crate::metrics::REQUEST_TIMEOUTS;
use crate::Error;
use crate::FeatureValue;
use crate::RequestConfig;
use crate::Result;

/// Request/response client over an asynchronous transport
pub struct CorrelatedClient<T: AsyncTransport> {
    transport: Arc<T>,
    correlator: Arc<RequestCorrelator<Response>>,
    config: RequestConfig,
}

impl<T: AsyncTransport> CorrelatedClient<T> {
    pub fn new(
        transport: Arc<T>,
        config: RequestConfig,
    ) -> Self {
        Self {
            transport,
            correlator: RequestCorrelator::new(),
            config,
        }
    }

    pub fn correlator(&self) -> &Arc<RequestCorrelator<Response>> {
        &self.correlator
    }

    pub async fn get(
        &self,
        oids: &[Oid],
    ) -> Result<Vec<VarBind>> {
        self.request("get", self.config.timeout(), RequestKind::Get, unspecified(oids))
            .await
    }

    pub async fn get_next(
        &self,
        oids: &[Oid],
    ) -> Result<Vec<VarBind>> {
        self.request("get_next", self.config.timeout(), RequestKind::GetNext, unspecified(oids))
            .await
    }

    /// Bulk "next" fetch.
    ///
    /// Every identifier is rewritten to its [`successor`](Oid::successor)
    /// before sending, so the round trip starts after the requested entry
    /// instead of returning it again.
    pub async fn get_bulk(
        &self,
        oids: &[Oid],
    ) -> Result<Vec<VarBind>> {
        let successors: Vec<Oid> = oids.iter().map(Oid::successor).collect();
        let kind = RequestKind::GetBulk {
            max_repetitions: self.config.max_repetitions,
        };
        self.request("get_bulk", self.config.timeout(), kind, unspecified(&successors))
            .await
    }

    pub async fn set(
        &self,
        values: Vec<(Oid, FeatureValue)>,
    ) -> Result<Vec<VarBind>> {
        let bindings = values.into_iter().map(|(oid, value)| VarBind::new(oid, value)).collect();
        self.request("set", self.config.timeout(), RequestKind::Set, bindings).await
    }

    /// Walks the subtree under `root` within the configured walk budget
    pub async fn walk(
        &self,
        root: &Oid,
    ) -> Result<Vec<VarBind>> {
        self.walk_with_budget(root, self.config.walk_budget()).await
    }

    /// Walks the subtree under `root` with one `get_next` per entry.
    ///
    /// Each step gets whatever is left of `budget`. The walk fails with a
    /// timeout as soon as nothing is left, and never sends a request with a
    /// zero deadline.
    #[instrument(skip(self), fields(root = %root))]
    pub async fn walk_with_budget(
        &self,
        root: &Oid,
        budget: Duration,
    ) -> Result<Vec<VarBind>> {
        let started = Instant::now();
        let mut current = root.clone();
        let mut collected = Vec::new();

        loop {
            let remaining = budget.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                REQUEST_TIMEOUTS.with_label_values(&["walk"]).inc();
                debug!(steps = collected.len(), "Walk budget exhausted");
                return Err(Error::timeout("walk", budget));
            }

            let bindings = self
                .request("walk", remaining, RequestKind::GetNext, unspecified(&[current.clone()]))
                .await?;
            let next = match bindings.into_iter().next() {
                Some(vb) => vb,
                None => break,
            };
            if matches!(next.value, VarValue::EndOfMibView) || !next.oid.starts_with(root) {
                break;
            }
            if next.oid <= current {
                return Err(Error::transport(format!(
                    "agent returned non-increasing identifier {} after {}",
                    next.oid, current
                )));
            }

            current = next.oid.clone();
            collected.push(next);
        }

        debug!(entries = collected.len(), elapsed = ?started.elapsed(), "Walk completed");
        Ok(collected)
    }

    async fn request(
        &self,
        operation: &str,
        deadline: Duration,
        kind: RequestKind,
        bindings: Vec<VarBind>,
    ) -> Result<Vec<VarBind>> {
        let transport = &self.transport;
        let request = Request { kind, bindings };
        let response = self
            .correlator
            .call(operation, deadline, |id, callback| transport.send(id, request, callback))
            .await?;
        Ok(response.bindings)
    }
}

fn unspecified(oids: &[Oid]) -> Vec<VarBind> {
    oids.iter().cloned().map(VarBind::unspecified).collect()
}
