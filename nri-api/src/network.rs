use std::collections::BTreeMap;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::BandwidthSpec;

/// A named network configuration the runtime is about to hand to the CNI plugin chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CniConfig {
    /// The CNI network name, e.g. `cni-loopback` or the primary network.
    pub name: String,
    /// The raw network configuration, normally a CNI configuration list in JSON.
    pub network_conf: String,
    /// The network type tag, empty if unknown.
    pub network_type: String,
}

impl CniConfig {
    /// Creates a network config without a type tag.
    pub fn new(name: impl Into<String>, network_conf: impl Into<String>) -> Self {
        Self { name: name.into(), network_conf: network_conf.into(), network_type: String::new() }
    }
}

/// Opaque capability payloads for one named network configuration.
///
/// Keys are capability names (e.g. `bandwidth`), values are whatever encoding the CNI plugin
/// expects for that capability.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CniCapabilities {
    /// The network config these capabilities apply to.
    pub name: String,
    /// Capability payloads by capability name.
    pub capabilities: BTreeMap<String, Bytes>,
}

impl CniCapabilities {
    /// Creates an empty capability set for the network config `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), capabilities: BTreeMap::new() }
    }

    /// Adds a capability payload.
    pub fn with_capability(mut self, key: impl Into<String>, payload: Bytes) -> Self {
        self.capabilities.insert(key.into(), payload);
        self
    }

    /// Returns the payload for the given capability, if any.
    pub fn get(&self, key: &str) -> Option<&Bytes> {
        self.capabilities.get(key)
    }
}

/// The outcome of a CNI plugin chain invocation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResultStatus {
    /// The chain succeeded.
    #[default]
    Success,
    /// The chain failed.
    Failure,
}

/// Post-setup feedback for one named network configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkResult {
    /// The network config name.
    pub name: String,
    /// The CNI spec version of the result.
    pub cni_version: String,
    /// Whether the chain succeeded.
    pub status: ResultStatus,
    /// The raw result payload returned by the plugin chain.
    pub result: String,
    /// Annotations added by plugins for downstream consumers.
    pub annotations: BTreeMap<String, String>,
}

impl NetworkResult {
    /// Creates a successful, empty result.
    pub fn new(name: impl Into<String>, cni_version: impl Into<String>) -> Self {
        Self { name: name.into(), cni_version: cni_version.into(), ..Default::default() }
    }
}

/// A network configuration descriptor the runtime is about to write to disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CreateNetworkConf {
    /// The network name.
    pub name: String,
    /// The network type tag.
    pub network_type: String,
    /// The raw configuration to write.
    pub conf: String,
}

/// A transport protocol, for port mappings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Protocol {
    /// TCP.
    #[default]
    Tcp,
    /// UDP.
    Udp,
    /// SCTP.
    Sctp,
}

/// A host port forwarded into the sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PortMapping {
    /// The port on the host.
    pub host_port: u16,
    /// The port inside the sandbox.
    pub container_port: u16,
    /// The forwarded protocol.
    pub protocol: Protocol,
    /// The host address to bind, empty for every address.
    pub host_ip: String,
}

/// DNS settings for the sandbox.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DnsConfig {
    /// Name server addresses.
    pub servers: Vec<String>,
    /// Search domains.
    pub searches: Vec<String>,
    /// Resolver options.
    pub options: Vec<String>,
}

/// A fully-formed network configuration for one attachment, as exchanged by
/// `AdjustPodSandboxNetwork`. Fields left unset are not touched by the runtime.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NetworkConfiguration {
    /// The attachment name.
    pub name: String,
    /// The raw network configuration backing this attachment, if the runtime provided it.
    pub network_conf: Option<String>,
    /// Bandwidth shaping for the attachment.
    pub bandwidth: Option<BandwidthSpec>,
    /// Host ports forwarded into the sandbox.
    pub port_mappings: Vec<PortMapping>,
    /// DNS settings.
    pub dns: Option<DnsConfig>,
    /// Labels attached to the attachment.
    pub labels: BTreeMap<String, String>,
}

impl NetworkConfiguration {
    /// Creates a configuration with every field but the name unset.
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }
}
