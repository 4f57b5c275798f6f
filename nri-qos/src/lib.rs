#![doc(issue_tracker_base_url = "https://github.com/chainbound/nri-qos/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! QoS class to bandwidth resolution for pod sandbox networks.
//!
//! A pod declares its class through a label or annotation (by default `net`). The
//! [`QosResolver`] maps the class to a [`BandwidthSpec`](nri_api::BandwidthSpec), either through
//! the [`BandwidthTable`] from the [`PluginConfig`] or through a table embedded in a network
//! config, and the result is attached as a `bandwidth` CNI capability by [`capability`].
//!
//! Two plugins are ready to run on a [`Stub`](nri_stub::Stub):
//! - [`SetupNetworkPlugin`] injects capabilities from `PreSetupNetwork`.
//! - [`AdjustNetworkPlugin`] returns fully-formed configurations from `AdjustPodSandboxNetwork`.

pub mod capability;
mod config;
mod plugin;
mod resolver;
mod table;

pub use capability::{CapabilityEncodeError, BANDWIDTH_CAPABILITY};
pub use config::{ConfigParseError, FallbackPolicy, PluginConfig};
pub use plugin::{AdjustNetworkPlugin, SetupNetworkPlugin};
pub use resolver::{
    BandwidthSource, DecisionOutcome, NetworkConfigParseError, QosDecision, QosResolver,
    SkipReason,
};
pub use table::{BandwidthTable, QosClass, DEFAULT_BANDWIDTH};
