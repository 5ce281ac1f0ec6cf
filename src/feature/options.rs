use std::collections::BTreeMap;

/// Remote name override
pub const OPTION_NAME: &str = "name";
/// Resolve the remote name as a pattern against the endpoint's feature space
pub const OPTION_USE_REGEXP: &str = "use_regexp";
/// Reject writes even when the endpoint accepts them
pub const OPTION_READ_ONLY: &str = "read_only";
/// Notification category override
pub const OPTION_CATEGORY: &str = "category";

/// Read-only option set supplied by the configuration collaborator for one feature
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeatureOptions {
    values: BTreeMap<String, String>,
}

impl FeatureOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(
        mut self,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.values.insert(key.into(), value.into());
        self
    }

    pub fn get(
        &self,
        key: &str,
    ) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn get_or<'a>(
        &'a self,
        key: &str,
        default: &'a str,
    ) -> &'a str {
        self.get(key).unwrap_or(default)
    }

    /// `true`, `yes`, `on` and `1` are truthy; anything else, including absence, is not
    pub fn flag(
        &self,
        key: &str,
    ) -> bool {
        self.get(key)
            .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "yes" | "on" | "1"))
            .unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Name of the feature on the remote side; defaults to the user-facing name
    pub fn remote_name<'a>(
        &'a self,
        user_name: &'a str,
    ) -> &'a str {
        self.get_or(OPTION_NAME, user_name)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for FeatureOptions {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }
}
