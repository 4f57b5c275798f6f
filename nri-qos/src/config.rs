use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use nri_api::BandwidthSpec;

use crate::table::{BandwidthTable, DEFAULT_BANDWIDTH};

/// The plugin configuration could not be loaded.
#[derive(Debug, Error)]
pub enum ConfigParseError {
    /// The configuration file could not be read.
    #[error("IO error: {0:?}")]
    Io(#[from] std::io::Error),
    /// The configuration is not valid YAML, or does not match the expected shape.
    #[error("Invalid configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// What to do with a pod whose class cannot be resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Apply the default bandwidth.
    #[default]
    Default,
    /// Emit nothing for the pod.
    Skip,
}

/// Configuration of the QoS plugins.
///
/// Decoded from YAML with camelCase keys. Unknown keys are ignored and every key is optional:
///
/// ```yaml
/// qosKey: net
/// loopbackName: cni-loopback
/// missingClass: default
/// unknownClass: skip
/// defaultBandwidth:
///   ingressRate: 450000
///   ingressBurst: 1000000
/// classes:
///   gold:
///     capacity: 10
///     bandwidth: { ingressRate: 2000000, ingressBurst: 2500000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PluginConfig {
    /// Opaque parameter, only logged.
    pub(crate) cfg_param1: String,
    /// The label and annotation key that selects a pod's class.
    pub(crate) qos_key: String,
    /// The name of the network config that is never shaped.
    pub(crate) loopback_name: String,
    pub(crate) missing_class: FallbackPolicy,
    pub(crate) unknown_class: FallbackPolicy,
    pub(crate) default_bandwidth: BandwidthSpec,
    /// Replaces the built-in classes when present.
    pub(crate) classes: BandwidthTable,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            cfg_param1: String::new(),
            qos_key: "net".to_string(),
            loopback_name: "cni-loopback".to_string(),
            missing_class: FallbackPolicy::Default,
            unknown_class: FallbackPolicy::Default,
            default_bandwidth: DEFAULT_BANDWIDTH,
            classes: BandwidthTable::builtin(),
        }
    }
}

impl PluginConfig {
    /// Parses a YAML configuration. A blank document yields the defaults.
    pub fn parse(blob: &str) -> Result<Self, ConfigParseError> {
        if blob.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(serde_yaml::from_str(blob)?)
    }

    /// Reads and parses a YAML configuration file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigParseError> {
        let blob = std::fs::read_to_string(path)?;
        Self::parse(&blob)
    }

    /// Sets the label and annotation key that selects a pod's class.
    pub fn qos_key(mut self, key: impl Into<String>) -> Self {
        self.qos_key = key.into();
        self
    }

    /// Sets the name of the loopback network config.
    pub fn loopback_name(mut self, name: impl Into<String>) -> Self {
        self.loopback_name = name.into();
        self
    }

    /// Sets the policy for pods that declare no class.
    pub fn missing_class(mut self, policy: FallbackPolicy) -> Self {
        self.missing_class = policy;
        self
    }

    /// Sets the policy for pods whose class is not in the table.
    pub fn unknown_class(mut self, policy: FallbackPolicy) -> Self {
        self.unknown_class = policy;
        self
    }

    /// Sets the bandwidth applied by the `default` fallback policy.
    pub fn default_bandwidth(mut self, bandwidth: BandwidthSpec) -> Self {
        self.default_bandwidth = bandwidth;
        self
    }

    /// Sets the class table.
    pub fn classes(mut self, classes: BandwidthTable) -> Self {
        self.classes = classes;
        self
    }

    /// Returns the opaque `cfgParam1` value.
    pub fn cfg_param1(&self) -> &str {
        &self.cfg_param1
    }
}
