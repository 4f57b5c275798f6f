use async_trait::async_trait;
use tracing::info;

use nri_api::{
    CniCapabilities, CniConfig, Event, EventMask, HookError, NetworkResult, PodSandbox,
};
use nri_stub::Plugin;

use super::reconfigure;
use crate::{capability, config::PluginConfig, resolver::QosResolver};

/// Shapes pod bandwidth by attaching `bandwidth` capabilities right before the CNI plugin chain
/// runs.
///
/// Every non-loopback network config of a sandbox gets the bandwidth of the pod's class,
/// resolved once per setup. Everything else the plugin sees is only logged.
#[derive(Debug, Clone, Default)]
pub struct SetupNetworkPlugin {
    resolver: QosResolver,
}

impl SetupNetworkPlugin {
    /// Creates the plugin with a startup configuration. A non-blank `Configure` blob replaces
    /// it.
    pub fn new(config: PluginConfig) -> Self {
        Self { resolver: QosResolver::new(config) }
    }

    /// Returns the resolver holding the active configuration.
    pub fn resolver(&self) -> &QosResolver {
        &self.resolver
    }
}

#[async_trait]
impl Plugin for SetupNetworkPlugin {
    fn events(&self) -> EventMask {
        [
            Event::RunPodSandbox,
            Event::StopPodSandbox,
            Event::RemovePodSandbox,
            Event::PreSetupNetwork,
            Event::PostSetupNetwork,
            Event::NetworkConfigurationChanged,
            Event::PostNetworkDeleted,
        ]
        .into_iter()
        .collect()
    }

    async fn configure(
        &mut self,
        config: &str,
        _runtime_name: &str,
        _runtime_version: &str,
    ) -> Result<EventMask, HookError> {
        reconfigure(&mut self.resolver, config)?;
        Ok(EventMask::empty())
    }

    async fn run_pod_sandbox(&self, pod: &PodSandbox) -> Result<(), HookError> {
        info!("Started pod {pod}");
        Ok(())
    }

    async fn stop_pod_sandbox(&self, pod: &PodSandbox) -> Result<(), HookError> {
        info!("Stopped pod {pod}");
        Ok(())
    }

    async fn remove_pod_sandbox(&self, pod: &PodSandbox) -> Result<(), HookError> {
        info!("Removed pod {pod}");
        Ok(())
    }

    async fn pre_setup_network(
        &self,
        pod: &PodSandbox,
        cni_configs: Vec<CniConfig>,
    ) -> Result<Vec<CniCapabilities>, HookError> {
        info!(%pod, configs = cni_configs.len(), "PreSetupNetwork");

        let decisions = self.resolver.resolve(pod, &cni_configs);
        for decision in &decisions {
            info!(config = %decision.config, outcome = ?decision.outcome, "QoS decision");
        }

        let caps = capability::capabilities(&decisions);
        info!(%pod, capabilities = caps.len(), "Returning CNI capabilities");

        Ok(caps)
    }

    async fn post_setup_network(
        &self,
        pod: &PodSandbox,
        results: Vec<NetworkResult>,
    ) -> Result<Vec<NetworkResult>, HookError> {
        info!(%pod, "PostSetupNetwork");

        for result in &results {
            info!(
                config = %result.name,
                cni_version = %result.cni_version,
                status = ?result.status,
                "CNI result"
            );
        }

        Ok(results)
    }

    async fn network_configuration_changed(
        &self,
        cni_configs: Vec<CniConfig>,
    ) -> Result<Vec<CniConfig>, HookError> {
        for config in &cni_configs {
            info!(config = %config.name, network_conf = %config.network_conf, "CNI config changed");
        }

        Ok(cni_configs)
    }

    async fn post_network_deleted(&self, pod: &PodSandbox) -> Result<(), HookError> {
        info!("Network deleted for {pod}");
        Ok(())
    }
}
