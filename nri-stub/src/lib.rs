#![doc(issue_tracker_base_url = "https://github.com/chainbound/nri-qos/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]

//! Runs a pod sandbox network [`Plugin`] against a runtime.
//!
//! The [`Stub`] receives decoded hook calls from a [`Transport`], negotiates the event
//! subscription during `Configure`, and dispatches every following call to the plugin:
//! calls for the same sandbox one at a time in arrival order, everything else concurrently.

mod lifecycle;
mod plugin;
mod stub;
pub mod transport;

pub use lifecycle::{Lifecycle, SandboxPhase};
pub use plugin::Plugin;
pub use stub::*;
pub use transport::{channel, HookCall, HookResult, Responder, Transport, TransportError};

pub use async_trait::async_trait;
