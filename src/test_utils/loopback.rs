//! Loopback agent answering correlated requests from an in-memory table.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::AsyncTransport;
use crate::FeatureValue;
use crate::Oid;
use crate::Request;
use crate::RequestKind;
use crate::Response;
use crate::ResponseCallback;
use crate::Result;
use crate::VarBind;
use crate::VarValue;

pub struct LoopbackAgent {
    table: Mutex<BTreeMap<Oid, FeatureValue>>,
    latency: Mutex<Duration>,
    /// Swallow requests without ever answering
    silent: AtomicBool,
    requests: Mutex<Vec<Request>>,
}

impl LoopbackAgent {
    pub fn new<'a, I>(entries: I) -> Arc<Self>
    where
        I: IntoIterator<Item = (&'a str, FeatureValue)>,
    {
        let table = entries
            .into_iter()
            .map(|(oid, value)| (oid.parse().expect("valid oid"), value))
            .collect();
        Arc::new(Self {
            table: Mutex::new(table),
            latency: Mutex::new(Duration::ZERO),
            silent: AtomicBool::new(false),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Interface table with `rows` rows of ifDescr and ifSpeed
    pub fn interfaces(rows: u32) -> Arc<Self> {
        let agent = Self::new([("1.3.6.1.2.1.1.5.0", FeatureValue::Text("rack-7".into()))]);
        {
            let mut table = agent.table.lock();
            for row in 1..=rows {
                table.insert(
                    format!("1.3.6.1.2.1.2.2.1.2.{row}").parse().expect("valid oid"),
                    FeatureValue::Text(format!("eth{row}")),
                );
                table.insert(
                    format!("1.3.6.1.2.1.2.2.1.5.{row}").parse().expect("valid oid"),
                    FeatureValue::Int(1000),
                );
            }
            table.insert("1.3.6.1.2.1.4.1.0".parse().expect("valid oid"), FeatureValue::Int(2));
        }
        agent
    }

    pub fn set_latency(
        &self,
        latency: Duration,
    ) {
        *self.latency.lock() = latency;
    }

    pub fn set_silent(
        &self,
        silent: bool,
    ) {
        self.silent.store(silent, Ordering::SeqCst);
    }

    pub fn requests(&self) -> Vec<Request> {
        self.requests.lock().clone()
    }

    pub fn value(
        &self,
        oid: &Oid,
    ) -> Option<FeatureValue> {
        self.table.lock().get(oid).cloned()
    }

    fn answer(
        &self,
        request: &Request,
    ) -> Response {
        let mut table = self.table.lock();
        let mut bindings = Vec::new();
        for vb in &request.bindings {
            match request.kind {
                RequestKind::Get => bindings.push(match table.get(&vb.oid) {
                    Some(value) => VarBind::new(vb.oid.clone(), value.clone()),
                    None => VarBind {
                        oid: vb.oid.clone(),
                        value: VarValue::NoSuchObject,
                    },
                }),
                RequestKind::GetNext => bindings.push(next_after(&table, &vb.oid, 1).remove(0)),
                RequestKind::GetBulk { max_repetitions } => {
                    bindings.extend(next_after(&table, &vb.oid, max_repetitions as usize))
                }
                RequestKind::Set => {
                    if let VarValue::Value(value) = &vb.value {
                        table.insert(vb.oid.clone(), value.clone());
                    }
                    bindings.push(vb.clone());
                }
            }
        }
        Response { bindings }
    }
}

/// Up to `count` entries strictly after `oid`, closed by `EndOfMibView` when the table runs out
fn next_after(
    table: &BTreeMap<Oid, FeatureValue>,
    oid: &Oid,
    count: usize,
) -> Vec<VarBind> {
    let mut found: Vec<VarBind> = table
        .range((Bound::Excluded(oid.clone()), Bound::Unbounded))
        .take(count)
        .map(|(oid, value)| VarBind::new(oid.clone(), value.clone()))
        .collect();
    if found.len() < count {
        let last = found.last().map(|vb| vb.oid.clone()).unwrap_or_else(|| oid.clone());
        found.push(VarBind {
            oid: last,
            value: VarValue::EndOfMibView,
        });
    }
    found
}

impl AsyncTransport for LoopbackAgent {
    fn send(
        &self,
        _request_id: u64,
        request: Request,
        callback: ResponseCallback<Response>,
    ) -> Result<()> {
        self.requests.lock().push(request.clone());
        if self.silent.load(Ordering::SeqCst) {
            return Ok(());
        }

        let response = self.answer(&request);
        let latency = *self.latency.lock();
        tokio::spawn(async move {
            if !latency.is_zero() {
                tokio::time::sleep(latency).await;
            }
            callback(Ok(response));
        });
        Ok(())
    }
}
