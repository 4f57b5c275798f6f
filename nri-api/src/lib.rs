#![doc(issue_tracker_base_url = "https://github.com/chainbound/nri-qos/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Typed messages exchanged between a runtime and a pod sandbox network plugin.
//!
//! The transport delivers every hook call already decoded into a [`HookRequest`] and expects a
//! [`HookReply`] or a [`HookError`] back. Nothing in this crate knows how calls travel.

mod bandwidth;
mod event;
mod hook;
mod network;
mod pod;

pub use bandwidth::BandwidthSpec;
pub use event::{Event, EventMask};
pub use hook::{HookError, HookReply, HookRequest};
pub use network::{
    CniCapabilities, CniConfig, CreateNetworkConf, DnsConfig, NetworkConfiguration, NetworkResult,
    PortMapping, Protocol, ResultStatus,
};
pub use pod::{Container, ContainerUpdate, PodSandbox};
