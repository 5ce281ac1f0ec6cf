//! Protocol-neutral feature model.
//!
//! A feature is a named attribute, operation or notification exposed by the
//! remote endpoint. Each kind lives in its own [`FeatureRepository`], which
//! delegates protocol work to a [`FeatureBinder`].

mod binder;
mod identity;
mod metadata;
mod options;
mod repository;
mod value;

pub use binder::*;
pub use identity::*;
pub use metadata::*;
pub use options::*;
pub use repository::*;
pub use value::*;
