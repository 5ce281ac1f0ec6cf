use std::fmt;
use std::sync::Arc;

use regex::Regex;

use super::NotificationEnvelope;
use crate::FeatureError;
use crate::Result;

type Predicate = dyn Fn(&NotificationEnvelope) -> bool + Send + Sync;

/// Subscription-side predicate over envelopes
#[derive(Clone)]
pub struct NotificationFilter {
    description: String,
    predicate: Arc<Predicate>,
}

impl NotificationFilter {
    pub fn new<P>(
        description: impl Into<String>,
        predicate: P,
    ) -> Self
    where
        P: Fn(&NotificationEnvelope) -> bool + Send + Sync + 'static,
    {
        Self {
            description: description.into(),
            predicate: Arc::new(predicate),
        }
    }

    /// Compiles an adapter filter expression. The pattern must match the whole category.
    pub fn category_pattern(expression: &str) -> Result<Self> {
        let regex = Regex::new(&format!("^(?:{expression})$")).map_err(|e| FeatureError::InvalidPattern {
            pattern: expression.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self::new(format!("category ~ {expression}"), move |envelope| {
            regex.is_match(&envelope.category)
        }))
    }

    /// Accepts envelopes whose category is one of `categories`
    pub fn categories<I, S>(categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let categories: Vec<String> = categories.into_iter().map(Into::into).collect();
        Self::new(format!("category in {categories:?}"), move |envelope| {
            categories.iter().any(|c| c == &envelope.category)
        })
    }

    pub fn accepts(
        &self,
        envelope: &NotificationEnvelope,
    ) -> bool {
        (self.predicate)(envelope)
    }

    pub fn description(&self) -> &str {
        &self.description
    }
}

impl fmt::Debug for NotificationFilter {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        f.debug_struct("NotificationFilter")
            .field("description", &self.description)
            .finish()
    }
}
