use serde::Deserialize;
use serde::Serialize;

/// Bulk discovery behavior
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct DiscoveryConfig {
    /// Expand every repository right after the initial connect ("smart mode")
    #[serde(default)]
    pub smart_mode: bool,
}
