use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    CniCapabilities, CniConfig, Container, ContainerUpdate, CreateNetworkConf, Event, EventMask,
    NetworkConfiguration, NetworkResult, PodSandbox,
};

/// A decoded hook call, as delivered by the transport.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "hook", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum HookRequest {
    /// Connection setup, always the first call.
    Configure {
        /// The plugin-specific configuration blob, empty if the runtime has none.
        config: String,
        /// The runtime name, e.g. `containerd`.
        runtime_name: String,
        /// The runtime version.
        runtime_version: String,
    },
    /// The full state of the runtime, delivered once after `Configure`.
    Synchronize {
        /// Every known pod sandbox.
        pods: Vec<PodSandbox>,
        /// Every known container.
        containers: Vec<Container>,
    },
    /// The runtime is going away.
    Shutdown,
    /// A sandbox was started.
    RunPodSandbox {
        /// The sandbox.
        pod: PodSandbox,
    },
    /// A sandbox was stopped.
    StopPodSandbox {
        /// The sandbox.
        pod: PodSandbox,
    },
    /// A sandbox was removed.
    RemovePodSandbox {
        /// The sandbox.
        pod: PodSandbox,
    },
    /// The runtime is about to create the network configuration descriptors of a sandbox.
    CreatePodSandboxNetworkConf {
        /// The descriptors the runtime intends to create.
        network_confs: Vec<CreateNetworkConf>,
    },
    /// The CNI plugin chain is about to run for a sandbox.
    PreSetupNetwork {
        /// The sandbox.
        pod: PodSandbox,
        /// The network configs the chain runs with.
        cni_configs: Vec<CniConfig>,
    },
    /// The CNI plugin chain ran for a sandbox.
    PostSetupNetwork {
        /// The sandbox.
        pod: PodSandbox,
        /// One result per network config.
        results: Vec<NetworkResult>,
    },
    /// The runtime offers the final network configurations of a sandbox for adjustment.
    AdjustPodSandboxNetwork {
        /// The sandbox.
        pod: PodSandbox,
        /// The configurations to adjust.
        network_configs: Vec<NetworkConfiguration>,
    },
    /// The set of network configs known to the runtime changed.
    NetworkConfigurationChanged {
        /// The new network configs.
        cni_configs: Vec<CniConfig>,
    },
    /// The network of a sandbox is about to be torn down.
    PreNetworkDeleted {
        /// The sandbox.
        pod: PodSandbox,
    },
    /// The network of a sandbox was torn down.
    PostNetworkDeleted {
        /// The sandbox.
        pod: PodSandbox,
    },
}

impl HookRequest {
    /// Returns the event this call belongs to. `None` for `Configure`, which is not an event.
    pub const fn event(&self) -> Option<Event> {
        let event = match self {
            Self::Configure { .. } => return None,
            Self::Synchronize { .. } => Event::Synchronize,
            Self::Shutdown => Event::Shutdown,
            Self::RunPodSandbox { .. } => Event::RunPodSandbox,
            Self::StopPodSandbox { .. } => Event::StopPodSandbox,
            Self::RemovePodSandbox { .. } => Event::RemovePodSandbox,
            Self::CreatePodSandboxNetworkConf { .. } => Event::CreatePodSandboxNetworkConf,
            Self::PreSetupNetwork { .. } => Event::PreSetupNetwork,
            Self::PostSetupNetwork { .. } => Event::PostSetupNetwork,
            Self::AdjustPodSandboxNetwork { .. } => Event::AdjustPodSandboxNetwork,
            Self::NetworkConfigurationChanged { .. } => Event::NetworkConfigurationChanged,
            Self::PreNetworkDeleted { .. } => Event::PreNetworkDeleted,
            Self::PostNetworkDeleted { .. } => Event::PostNetworkDeleted,
        };

        Some(event)
    }

    /// Returns the pod sandbox this call is about, for sandbox-scoped calls.
    pub const fn pod(&self) -> Option<&PodSandbox> {
        match self {
            Self::RunPodSandbox { pod } |
            Self::StopPodSandbox { pod } |
            Self::RemovePodSandbox { pod } |
            Self::PreSetupNetwork { pod, .. } |
            Self::PostSetupNetwork { pod, .. } |
            Self::AdjustPodSandboxNetwork { pod, .. } |
            Self::PreNetworkDeleted { pod } |
            Self::PostNetworkDeleted { pod } => Some(pod),
            _ => None,
        }
    }

    /// Builds the reply of a plugin that does not handle this call: every input is returned
    /// unchanged and nothing is added.
    pub fn passthrough(self) -> HookReply {
        match self {
            Self::Configure { .. } => HookReply::Configured(EventMask::empty()),
            Self::Synchronize { .. } => HookReply::Synchronized(Vec::new()),
            Self::CreatePodSandboxNetworkConf { .. } => HookReply::NetworkConfs(None),
            Self::PreSetupNetwork { .. } => HookReply::Capabilities(Vec::new()),
            Self::PostSetupNetwork { results, .. } => HookReply::Results(results),
            Self::AdjustPodSandboxNetwork { network_configs, .. } => {
                HookReply::NetworkConfigurations(network_configs)
            }
            Self::NetworkConfigurationChanged { cni_configs } => HookReply::CniConfigs(cni_configs),
            Self::Shutdown |
            Self::RunPodSandbox { .. } |
            Self::StopPodSandbox { .. } |
            Self::RemovePodSandbox { .. } |
            Self::PreNetworkDeleted { .. } |
            Self::PostNetworkDeleted { .. } => HookReply::Empty,
        }
    }
}

/// The successful reply to a [`HookRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reply", content = "value", rename_all = "camelCase")]
pub enum HookReply {
    /// The effective event subscription.
    Configured(EventMask),
    /// Updates to apply to existing containers.
    Synchronized(Vec<ContainerUpdate>),
    /// `None` leaves the configuration descriptors unmodified.
    NetworkConfs(Option<Vec<CreateNetworkConf>>),
    /// Capabilities to attach, one entry per annotated config.
    Capabilities(Vec<CniCapabilities>),
    /// The CNI results, possibly modified.
    Results(Vec<NetworkResult>),
    /// The adjusted network configurations.
    NetworkConfigurations(Vec<NetworkConfiguration>),
    /// The network configs, possibly modified.
    CniConfigs(Vec<CniConfig>),
    /// Reply to a notification.
    Empty,
}

/// An error returned from a hook. It is surfaced verbatim to the runtime, which decides
/// whether to fail the corresponding lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HookError {
    /// The configuration blob passed to `Configure` is malformed.
    #[error("failed to parse configuration: {0}")]
    ConfigParse(String),
    /// A sandbox hook that does not move its sandbox forward, in strict lifecycle mode.
    #[error("{event} out of order for sandbox {sandbox} (currently {phase})")]
    LifecycleViolation {
        /// The offending hook.
        event: Event,
        /// The sandbox key.
        sandbox: String,
        /// The phase the sandbox is in.
        phase: String,
    },
    /// Any other failure in the plugin or the stub.
    #[error("plugin error: {0}")]
    Plugin(String),
    /// The call was abandoned without a reply.
    #[error("hook call dropped before a reply was produced")]
    Dropped,
}

impl HookError {
    /// Creates a plugin error from any displayable error.
    pub fn plugin(error: impl std::fmt::Display) -> Self {
        Self::Plugin(error.to_string())
    }
}
