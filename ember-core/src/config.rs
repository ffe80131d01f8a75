//! Runtime Configuration
//!
//! Everything the runtime needs to know about its host page and its
//! scheduling policy is decided once, at construction, from a
//! [`RuntimeConfig`]. Hosts usually embed it as JSON next to the page.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// How the render scheduler asks the host for a flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerPolicy {
    /// Queue flushes for the next paint; the host pumps frames.
    Frame,
    /// Spawn a tokio timer of `timer_delay_ms` per flush.
    Timer,
    /// Flush before the requesting call returns. A flush requested during
    /// another flush runs after it.
    Immediate,
}

/// How function lookups fall back when a module does not define a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FallbackPolicy {
    /// Fall back to the table shared by every registered module.
    Shared,
    /// Only the module's own functions resolve.
    ModuleLocal,
}

/// Runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Id of the element that receives materialized output.
    pub root_id: String,

    /// Id of the element whose text holds the hydration payload.
    pub payload_anchor_id: String,

    /// Attribute set on the anchor once its payload has been consumed.
    pub hydrated_marker: String,

    /// Router path used when the location fragment is empty.
    pub default_path: String,

    pub scheduler: SchedulerPolicy,

    /// Delay used by [`SchedulerPolicy::Timer`].
    pub timer_delay_ms: u64,

    pub fallback: FallbackPolicy,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            root_id: "root".to_string(),
            payload_anchor_id: "__ember_hydration__".to_string(),
            hydrated_marker: "data-hydrated".to_string(),
            default_path: "/".to_string(),
            scheduler: SchedulerPolicy::Frame,
            timer_delay_ms: 16,
            fallback: FallbackPolicy::Shared,
        }
    }
}

impl RuntimeConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}
