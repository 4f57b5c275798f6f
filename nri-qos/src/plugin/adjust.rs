use async_trait::async_trait;
use tracing::info;

use nri_api::{
    Container, ContainerUpdate, CreateNetworkConf, Event, EventMask, HookError,
    NetworkConfiguration, PodSandbox,
};
use nri_stub::Plugin;

use super::reconfigure;
use crate::{
    config::PluginConfig,
    resolver::{DecisionOutcome, QosResolver},
};

/// Shapes pod bandwidth by returning fully-formed network configurations from
/// `AdjustPodSandboxNetwork`, without going through CNI capabilities.
#[derive(Debug, Clone, Default)]
pub struct AdjustNetworkPlugin {
    resolver: QosResolver,
}

impl AdjustNetworkPlugin {
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
impl Plugin for AdjustNetworkPlugin {
    fn events(&self) -> EventMask {
        [
            Event::Synchronize,
            Event::Shutdown,
            Event::RunPodSandbox,
            Event::StopPodSandbox,
            Event::RemovePodSandbox,
            Event::CreatePodSandboxNetworkConf,
            Event::AdjustPodSandboxNetwork,
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

    async fn synchronize(
        &self,
        pods: Vec<PodSandbox>,
        containers: Vec<Container>,
    ) -> Result<Vec<ContainerUpdate>, HookError> {
        info!(
            pods = pods.len(),
            containers = containers.len(),
            "Synchronizing state with the runtime"
        );
        Ok(Vec::new())
    }

    async fn shutdown(&self) {
        info!("Runtime shutting down");
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

    async fn create_pod_sandbox_network_conf(
        &self,
        network_confs: Vec<CreateNetworkConf>,
    ) -> Result<Option<Vec<CreateNetworkConf>>, HookError> {
        for (i, conf) in network_confs.iter().enumerate() {
            info!(network = i, network_type = %conf.network_type, "Creating pod sandbox network");
        }

        Ok(None)
    }

    async fn adjust_pod_sandbox_network(
        &self,
        pod: &PodSandbox,
        network_configs: Vec<NetworkConfiguration>,
    ) -> Result<Vec<NetworkConfiguration>, HookError> {
        let class = self.resolver.declared_class(pod);
        info!(%pod, ?class, "Adjusting pod sandbox network");

        let adjusted = network_configs
            .into_iter()
            .map(|mut config| {
                let network_conf = config.network_conf.as_deref().unwrap_or_default();

                match self.resolver.decide(class, &config.name, network_conf) {
                    DecisionOutcome::Resolved { bandwidth, .. } => {
                        config.bandwidth = Some(bandwidth);
                    }
                    DecisionOutcome::Skipped(reason) => {
                        info!(config = %config.name, ?reason, "Leaving network config as is");
                    }
                }

                config
            })
            .collect();

        Ok(adjusted)
    }
}
