//! The hook interface a plugin implements.
//!
//! A plugin implements [`Plugin`] and declares, through [`Plugin::events`], which hooks it
//! actually handles. Every hook has a default implementation that behaves like an absent hook:
//! inputs are returned unchanged and nothing is added. The [`Stub`](crate::Stub) never routes a
//! call to a hook outside the negotiated event mask.
//!
//! ```rust,ignore
//! use async_trait::async_trait;
//! use nri_api::{CniCapabilities, CniConfig, Event, EventMask, HookError, PodSandbox};
//! use nri_stub::Plugin;
//!
//! struct Logger;
//!
//! #[async_trait]
//! impl Plugin for Logger {
//!     fn events(&self) -> EventMask {
//!         Event::PreSetupNetwork.into()
//!     }
//!
//!     async fn pre_setup_network(
//!         &self,
//!         pod: &PodSandbox,
//!         cni_configs: Vec<CniConfig>,
//!     ) -> Result<Vec<CniCapabilities>, HookError> {
//!         tracing::info!(%pod, configs = cni_configs.len(), "setting up network");
//!         Ok(Vec::new())
//!     }
//! }
//! ```

use async_trait::async_trait;
use tracing::{debug, warn};

use nri_api::{
    CniCapabilities, CniConfig, Container, ContainerUpdate, CreateNetworkConf, EventMask,
    HookError, HookReply, HookRequest, NetworkConfiguration, NetworkResult, PodSandbox,
};

use crate::stub::StubStats;

/// A pod sandbox network plugin.
///
/// Sandbox-scoped hooks for the same sandbox are called in the order the runtime sent them, and
/// never concurrently. Hooks for different sandboxes, and runtime-scoped hooks, may run concurrently,
/// hence `&self` everywhere except in [`Plugin::configure`], which runs alone before any other
/// hook.
#[async_trait]
pub trait Plugin: Send + Sync + 'static {
    /// Returns the set of hooks this plugin implements.
    fn events(&self) -> EventMask;

    /// Called once when the connection to the runtime is established.
    ///
    /// `config` is the plugin-specific configuration blob, empty if the runtime has none.
    /// Returns the events to subscribe to; the empty mask subscribes to every implemented
    /// event. Returning an error aborts the connection.
    async fn configure(
        &mut self,
        _config: &str,
        _runtime_name: &str,
        _runtime_version: &str,
    ) -> Result<EventMask, HookError> {
        Ok(EventMask::empty())
    }

    /// Delivers the full current state of the runtime.
    async fn synchronize(
        &self,
        _pods: Vec<PodSandbox>,
        _containers: Vec<Container>,
    ) -> Result<Vec<ContainerUpdate>, HookError> {
        Ok(Vec::new())
    }

    /// The runtime is shutting down.
    async fn shutdown(&self) {}

    async fn run_pod_sandbox(&self, _pod: &PodSandbox) -> Result<(), HookError> {
        Ok(())
    }

    async fn stop_pod_sandbox(&self, _pod: &PodSandbox) -> Result<(), HookError> {
        Ok(())
    }

    async fn remove_pod_sandbox(&self, _pod: &PodSandbox) -> Result<(), HookError> {
        Ok(())
    }

    /// Called before network configuration descriptors are committed to disk. Returning
    /// `None` leaves them unmodified.
    async fn create_pod_sandbox_network_conf(
        &self,
        _network_confs: Vec<CreateNetworkConf>,
    ) -> Result<Option<Vec<CreateNetworkConf>>, HookError> {
        Ok(None)
    }

    /// Called right before the CNI plugin chain runs. Returns one entry per configuration to
    /// annotate with capabilities; configurations not mentioned are left untouched.
    async fn pre_setup_network(
        &self,
        _pod: &PodSandbox,
        _cni_configs: Vec<CniConfig>,
    ) -> Result<Vec<CniCapabilities>, HookError> {
        Ok(Vec::new())
    }

    /// Called after the CNI plugin chain completed.
    async fn post_setup_network(
        &self,
        _pod: &PodSandbox,
        results: Vec<NetworkResult>,
    ) -> Result<Vec<NetworkResult>, HookError> {
        Ok(results)
    }

    /// Returns fully-formed network configuration for the sandbox, bypassing capabilities.
    async fn adjust_pod_sandbox_network(
        &self,
        _pod: &PodSandbox,
        network_configs: Vec<NetworkConfiguration>,
    ) -> Result<Vec<NetworkConfiguration>, HookError> {
        Ok(network_configs)
    }

    /// Called when the on-disk network configuration changed.
    async fn network_configuration_changed(
        &self,
        cni_configs: Vec<CniConfig>,
    ) -> Result<Vec<CniConfig>, HookError> {
        Ok(cni_configs)
    }

    async fn pre_network_deleted(&self, _pod: &PodSandbox) -> Result<(), HookError> {
        Ok(())
    }

    async fn post_network_deleted(&self, _pod: &PodSandbox) -> Result<(), HookError> {
        Ok(())
    }
}

/// Routes a hook call to the matching plugin method.
///
/// Calls for events outside `events` never reach the plugin and get the pass-through reply.
/// `Configure` is handled by the stub before dispatching starts and is rejected here.
pub(crate) async fn dispatch<P: Plugin + ?Sized>(
    plugin: &P,
    events: EventMask,
    stats: &StubStats,
    request: HookRequest,
) -> Result<HookReply, HookError> {
    let Some(event) = request.event() else {
        warn!("Received Configure on an already configured connection");
        return Err(HookError::Plugin("plugin already configured".to_string()));
    };

    if !events.contains(event) {
        debug!(%event, "Not subscribed, passing through");
        stats.increment_passthrough();
        return Ok(request.passthrough());
    }

    stats.increment_dispatched();

    let result = match request {
        HookRequest::Configure { .. } => Err(HookError::Plugin("plugin already configured".into())),
        HookRequest::Synchronize { pods, containers } => {
            plugin.synchronize(pods, containers).await.map(HookReply::Synchronized)
        }
        HookRequest::Shutdown => {
            plugin.shutdown().await;
            Ok(HookReply::Empty)
        }
        HookRequest::RunPodSandbox { pod } => {
            plugin.run_pod_sandbox(&pod).await.map(|_| HookReply::Empty)
        }
        HookRequest::StopPodSandbox { pod } => {
            plugin.stop_pod_sandbox(&pod).await.map(|_| HookReply::Empty)
        }
        HookRequest::RemovePodSandbox { pod } => {
            plugin.remove_pod_sandbox(&pod).await.map(|_| HookReply::Empty)
        }
        HookRequest::CreatePodSandboxNetworkConf { network_confs } => plugin
            .create_pod_sandbox_network_conf(network_confs)
            .await
            .map(HookReply::NetworkConfs),
        HookRequest::PreSetupNetwork { pod, cni_configs } => {
            plugin.pre_setup_network(&pod, cni_configs).await.map(HookReply::Capabilities)
        }
        HookRequest::PostSetupNetwork { pod, results } => {
            plugin.post_setup_network(&pod, results).await.map(HookReply::Results)
        }
        HookRequest::AdjustPodSandboxNetwork { pod, network_configs } => plugin
            .adjust_pod_sandbox_network(&pod, network_configs)
            .await
            .map(HookReply::NetworkConfigurations),
        HookRequest::NetworkConfigurationChanged { cni_configs } => {
            plugin.network_configuration_changed(cni_configs).await.map(HookReply::CniConfigs)
        }
        HookRequest::PreNetworkDeleted { pod } => {
            plugin.pre_network_deleted(&pod).await.map(|_| HookReply::Empty)
        }
        HookRequest::PostNetworkDeleted { pod } => {
            plugin.post_network_deleted(&pod).await.map(|_| HookReply::Empty)
        }
    };

    if let Err(ref e) = result {
        stats.increment_failed();
        warn!(%event, error = %e, "Hook failed");
    }

    result
}
