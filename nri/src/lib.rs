#![doc(issue_tracker_base_url = "https://github.com/chainbound/nri-qos/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Bandwidth shaping for pod sandbox networks.
//!
//! Re-exports the protocol types from [`nri_api`], the hook dispatcher from [`nri_stub`] and
//! the QoS plugins from [`nri_qos`].

pub use nri_api::*;
pub use nri_qos::*;
pub use nri_stub::*;
