use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use super::FeatureIdentity;
use super::FeatureOptions;
use super::ValueType;

/// Feature kind tag shared by every repository
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeatureKind {
    Attribute,
    Operation,
    Notification,
}

impl fmt::Display for FeatureKind {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        match self {
            FeatureKind::Attribute => f.write_str("attribute"),
            FeatureKind::Operation => f.write_str("operation"),
            FeatureKind::Notification => f.write_str("notification"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadOnly,
    WriteOnly,
    ReadWrite,
}

impl AccessMode {
    pub fn is_readable(&self) -> bool {
        !matches!(self, AccessMode::WriteOnly)
    }

    pub fn is_writable(&self) -> bool {
        !matches!(self, AccessMode::ReadOnly)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParameterSpec {
    pub name: String,
    pub value_type: ValueType,
}

/// Kind-specific shape captured by discovery
#[derive(Debug, Clone, PartialEq)]
pub enum FeatureShape {
    Attribute {
        value_type: ValueType,
        access: AccessMode,
    },
    Operation {
        parameters: Vec<ParameterSpec>,
        returns: ValueType,
    },
    Notification {
        category: String,
    },
}

impl FeatureShape {
    pub fn kind(&self) -> FeatureKind {
        match self {
            FeatureShape::Attribute { .. } => FeatureKind::Attribute,
            FeatureShape::Operation { .. } => FeatureKind::Operation,
            FeatureShape::Notification { .. } => FeatureKind::Notification,
        }
    }
}

/// Outcome of discovering one feature on the remote endpoint.
///
/// "Not found" is an expected answer, not an error.
#[derive(Debug)]
pub enum Discovery<T> {
    Found(T),
    NotFound,
}

impl<T> Discovery<T> {
    pub fn found(self) -> Option<T> {
        match self {
            Discovery::Found(t) => Some(t),
            Discovery::NotFound => None,
        }
    }
}

/// What a binder returns when discovery succeeds
#[derive(Debug)]
pub struct Discovered<H> {
    pub shape: FeatureShape,
    pub handle: H,
}

/// Metadata of a connected feature
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMetadata {
    pub name: String,
    pub remote_name: String,
    pub identity: FeatureIdentity,
    pub shape: FeatureShape,
    pub options: FeatureOptions,
}

impl FeatureMetadata {
    pub fn kind(&self) -> FeatureKind {
        self.shape.kind()
    }

    pub fn category(&self) -> Option<&str> {
        match &self.shape {
            FeatureShape::Notification { category } => Some(category),
            _ => None,
        }
    }

    pub fn is_writable(&self) -> bool {
        match &self.shape {
            FeatureShape::Attribute { access, .. } => access.is_writable() && !self.options.flag(super::OPTION_READ_ONLY),
            _ => false,
        }
    }

    /// Diagnostic description of how the feature is bound. Not used for behavior.
    pub fn binding_properties(&self) -> BTreeMap<String, String> {
        let mut props = BTreeMap::new();
        props.insert("name".to_string(), self.name.clone());
        props.insert("remote_name".to_string(), self.remote_name.clone());
        props.insert("kind".to_string(), self.kind().to_string());
        props.insert("identity".to_string(), self.identity.to_string());
        match &self.shape {
            FeatureShape::Attribute { value_type, access } => {
                props.insert("type".to_string(), value_type.to_string());
                props.insert("writable".to_string(), (access.is_writable() && self.is_writable()).to_string());
            }
            FeatureShape::Operation { parameters, returns } => {
                let signature: Vec<String> = parameters.iter().map(|p| format!("{}: {}", p.name, p.value_type)).collect();
                props.insert("signature".to_string(), format!("({}) -> {}", signature.join(", "), returns));
            }
            FeatureShape::Notification { category } => {
                props.insert("category".to_string(), category.clone());
            }
        }
        for (key, value) in self.options.iter() {
            props.insert(format!("option.{key}"), value.to_string());
        }
        props
    }
}

/// A live repository entry: metadata plus the protocol-specific handle
#[derive(Debug)]
pub struct Binding<H> {
    metadata: Arc<FeatureMetadata>,
    handle: H,
}

impl<H> Binding<H> {
    pub(crate) fn new(
        metadata: FeatureMetadata,
        handle: H,
    ) -> Self {
        Self {
            metadata: Arc::new(metadata),
            handle,
        }
    }

    pub fn metadata(&self) -> &Arc<FeatureMetadata> {
        &self.metadata
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn identity(&self) -> FeatureIdentity {
        self.metadata.identity
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }
}
