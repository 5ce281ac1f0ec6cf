#[cfg(test)]
use mockall::automock;

use super::Oid;
use super::ResponseCallback;
use crate::FeatureValue;
use crate::Result;

#[derive(Debug, Clone, PartialEq)]
pub enum VarValue {
    /// Placeholder sent with read requests
    Unspecified,
    Value(FeatureValue),
    NoSuchObject,
    NoSuchInstance,
    EndOfMibView,
}

impl VarValue {
    /// `true` for the exception markers an agent returns instead of a value
    pub fn is_exception(&self) -> bool {
        matches!(
            self,
            VarValue::NoSuchObject | VarValue::NoSuchInstance | VarValue::EndOfMibView
        )
    }

    pub fn value(&self) -> Option<&FeatureValue> {
        match self {
            VarValue::Value(v) => Some(v),
            _ => None,
        }
    }
}

/// Identifier/value pair carried by requests and responses
#[derive(Debug, Clone, PartialEq)]
pub struct VarBind {
    pub oid: Oid,
    pub value: VarValue,
}

impl VarBind {
    pub fn unspecified(oid: Oid) -> Self {
        Self {
            oid,
            value: VarValue::Unspecified,
        }
    }

    pub fn new(
        oid: Oid,
        value: FeatureValue,
    ) -> Self {
        Self {
            oid,
            value: VarValue::Value(value),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Get,
    GetNext,
    GetBulk { max_repetitions: u32 },
    Set,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub kind: RequestKind,
    pub bindings: Vec<VarBind>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub bindings: Vec<VarBind>,
}

/// Fire-and-forget send primitive of an asynchronous protocol client.
///
/// `send` returns as soon as the request is on the wire. The response, or a
/// protocol error, arrives later through `callback`.
#[cfg_attr(test, automock)]
pub trait AsyncTransport: Send + Sync + 'static {
    fn send(
        &self,
        request_id: u64,
        request: Request,
        callback: ResponseCallback<Response>,
    ) -> Result<()>;
}
