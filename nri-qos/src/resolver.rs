use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use nri_api::{BandwidthSpec, CniConfig, PodSandbox};

use crate::{
    config::{FallbackPolicy, PluginConfig},
    table::BandwidthTable,
};

/// The member of a CNI config that may embed a QoS table.
const EMBEDDED_TABLE_KEY: &str = "qos";

/// A network config embeds a QoS table that cannot be decoded.
#[derive(Debug, Error)]
#[error("Malformed QoS table in network config {config}: {source}")]
pub struct NetworkConfigParseError {
    /// The network config name.
    pub config: String,
    #[source]
    source: serde_json::Error,
}

/// Where a resolved bandwidth came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BandwidthSource {
    /// The configured class table.
    Static,
    /// The table embedded in the network config.
    Embedded,
    /// The configured default bandwidth.
    Default,
}

/// Why a network config receives no bandwidth.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// The config is the loopback network.
    Loopback,
    /// The pod declares no class and the policy says to skip.
    NoClass,
    /// The class is not in the table that applies, and the policy says to skip.
    UnknownClass,
    /// The embedded QoS table cannot be decoded.
    Malformed,
}

/// What happens to one network config.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionOutcome {
    /// The config is shaped.
    Resolved {
        /// The bandwidth to apply.
        bandwidth: BandwidthSpec,
        /// Where the bandwidth came from.
        source: BandwidthSource,
    },
    /// The config is left alone.
    Skipped(SkipReason),
}

/// The bandwidth decision for one network config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QosDecision {
    /// The network config name.
    pub config: String,
    /// The decision.
    pub outcome: DecisionOutcome,
}

impl QosDecision {
    /// Returns the resolved bandwidth, if any.
    pub fn bandwidth(&self) -> Option<BandwidthSpec> {
        match self.outcome {
            DecisionOutcome::Resolved { bandwidth, .. } => Some(bandwidth),
            DecisionOutcome::Skipped(_) => None,
        }
    }
}

/// Resolves a pod's declared QoS class to bandwidth limits.
///
/// The resolver only reads its configuration, so one instance serves every sandbox concurrently.
#[derive(Debug, Clone, Default)]
pub struct QosResolver {
    config: PluginConfig,
}

impl QosResolver {
    /// Creates a resolver for the given configuration.
    pub fn new(config: PluginConfig) -> Self {
        Self { config }
    }

    /// Returns the active configuration.
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Returns the class the pod declares. An annotation takes precedence over a label.
    pub fn declared_class<'a>(&self, pod: &'a PodSandbox) -> Option<&'a str> {
        let key = &self.config.qos_key;
        pod.annotation(key).or_else(|| pod.label(key))
    }

    /// Returns `true` if `config_name` is the loopback network, which is never shaped.
    pub fn is_loopback(&self, config_name: &str) -> bool {
        config_name == self.config.loopback_name
    }

    /// Resolves a bandwidth decision for every network config of a sandbox setup.
    ///
    /// The pod's class is looked up once and applied to every config. A config that embeds a
    /// QoS table is resolved against that table alone; a malformed table only skips its own
    /// config.
    pub fn resolve(&self, pod: &PodSandbox, configs: &[CniConfig]) -> Vec<QosDecision> {
        let class = self.declared_class(pod);

        debug!(%pod, ?class, "Resolving QoS class");

        configs
            .iter()
            .map(|config| QosDecision {
                config: config.name.clone(),
                outcome: self.decide(class, &config.name, &config.network_conf),
            })
            .collect()
    }

    /// Decides the bandwidth for a single network config named `name`, with raw configuration
    /// `network_conf`, for a pod of the given class.
    pub fn decide(&self, class: Option<&str>, name: &str, network_conf: &str) -> DecisionOutcome {
        if self.is_loopback(name) {
            return DecisionOutcome::Skipped(SkipReason::Loopback);
        }

        match embedded_table(name, network_conf) {
            Ok(None) => self.resolve_class(class),
            Ok(Some(table)) => {
                let Some(class) = class else {
                    return self.fallback(self.config.missing_class, SkipReason::NoClass);
                };

                match table.get(class) {
                    Some(qos) => DecisionOutcome::Resolved {
                        bandwidth: qos.bandwidth,
                        source: BandwidthSource::Embedded,
                    },
                    None => DecisionOutcome::Skipped(SkipReason::UnknownClass),
                }
            }
            Err(e) => {
                warn!(error = %e, "Skipping network config");
                DecisionOutcome::Skipped(SkipReason::Malformed)
            }
        }
    }

    /// Resolves a class against the configured table, applying the fallback policies.
    pub fn resolve_class(&self, class: Option<&str>) -> DecisionOutcome {
        let Some(class) = class else {
            return self.fallback(self.config.missing_class, SkipReason::NoClass);
        };

        match self.config.classes.get(class) {
            Some(qos) => {
                DecisionOutcome::Resolved { bandwidth: qos.bandwidth, source: BandwidthSource::Static }
            }
            None => {
                debug!(class, "Unknown QoS class");
                self.fallback(self.config.unknown_class, SkipReason::UnknownClass)
            }
        }
    }

    fn fallback(&self, policy: FallbackPolicy, reason: SkipReason) -> DecisionOutcome {
        match policy {
            FallbackPolicy::Default => DecisionOutcome::Resolved {
                bandwidth: self.config.default_bandwidth,
                source: BandwidthSource::Default,
            },
            FallbackPolicy::Skip => DecisionOutcome::Skipped(reason),
        }
    }
}

/// Extracts the QoS table embedded in a network config.
///
/// Configs that have no table, or are not JSON objects, yield `None`. A config that does not
/// parse as JSON but mentions a `"qos"` member is malformed.
fn embedded_table(
    name: &str,
    network_conf: &str,
) -> Result<Option<BandwidthTable>, NetworkConfigParseError> {
    let mut conf = match serde_json::from_str::<Value>(network_conf) {
        Ok(Value::Object(conf)) => conf,
        Ok(_) => return Ok(None),
        Err(source) if declares_table(network_conf) => {
            return Err(NetworkConfigParseError { config: name.to_string(), source })
        }
        Err(_) => return Ok(None),
    };

    let Some(table) = conf.remove(EMBEDDED_TABLE_KEY) else {
        return Ok(None);
    };

    serde_json::from_value(table)
        .map(Some)
        .map_err(|source| NetworkConfigParseError { config: name.to_string(), source })
}

fn declares_table(network_conf: &str) -> bool {
    network_conf.contains(&format!("\"{EMBEDDED_TABLE_KEY}\""))
}
