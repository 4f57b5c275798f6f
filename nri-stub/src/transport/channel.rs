//! An in-process transport.
//!
//! [`pair`] returns a [`RuntimeHandle`], which plays the runtime side and issues typed hook calls,
//! and a [`ChannelTransport`] to hand to the [`Stub`](crate::Stub). Dropping every handle closes
//! the connection.
//!
//! ```rust,ignore
//! let (runtime, transport) = channel::pair(64);
//! tokio::spawn(Stub::new(plugin, transport).run());
//!
//! let events = runtime.configure("", "containerd", "2.0").await?;
//! let caps = runtime.pre_setup_network(pod, configs).await?;
//! ```

use std::{
    pin::Pin,
    task::{Context, Poll},
};

use futures::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;

use nri_api::{
    CniCapabilities, CniConfig, Container, ContainerUpdate, CreateNetworkConf, EventMask,
    HookError, HookReply, HookRequest, NetworkConfiguration, NetworkResult, PodSandbox,
};

use super::{HookCall, TransportError};

/// A hook call issued through a [`RuntimeHandle`] failed.
#[derive(Debug, Error)]
pub enum CallError {
    /// The stub is gone.
    #[error("Connection to the plugin closed")]
    Closed,
    /// The plugin answered with an error.
    #[error("Hook error: {0}")]
    Hook(#[from] HookError),
    /// The reply does not match the call.
    #[error("Unexpected reply: {0:?}")]
    UnexpectedReply(Box<HookReply>),
}

/// Creates a connected runtime handle and transport. `buffer` bounds the number of calls in
/// flight towards the stub.
pub fn pair(buffer: usize) -> (RuntimeHandle, ChannelTransport) {
    let (tx, rx) = mpsc::channel(buffer);
    (RuntimeHandle { to_stub: tx }, ChannelTransport { from_runtime: ReceiverStream::new(rx) })
}

/// The stub side of an in-process connection.
#[derive(Debug)]
pub struct ChannelTransport {
    from_runtime: ReceiverStream<HookCall>,
}

impl Stream for ChannelTransport {
    type Item = Result<HookCall, TransportError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().from_runtime.poll_next_unpin(cx).map(|call| call.map(Ok))
    }
}

/// The runtime side of an in-process connection. Cheap to clone; every clone shares the same
/// connection.
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    to_stub: mpsc::Sender<HookCall>,
}

macro_rules! expect_reply {
    ($reply:expr, $variant:ident) => {
        match $reply {
            HookReply::$variant(value) => Ok(value),
            other => Err(CallError::UnexpectedReply(Box::new(other))),
        }
    };
}

impl RuntimeHandle {
    /// Issues a raw hook call and waits for its reply.
    pub async fn call(&self, request: HookRequest) -> Result<HookReply, CallError> {
        let (call, reply) = HookCall::new(request);

        self.to_stub.send(call).await.map_err(|_| CallError::Closed)?;

        // The stub accepted the call but abandoned it
        Ok(reply.await.map_err(|_| HookError::Dropped)??)
    }

    /// Sends a notification and checks that it was acknowledged.
    async fn notify(&self, request: HookRequest) -> Result<(), CallError> {
        match self.call(request).await? {
            HookReply::Empty => Ok(()),
            other => Err(CallError::UnexpectedReply(Box::new(other))),
        }
    }

    /// Sends `Configure` and returns the subscription the plugin announced.
    pub async fn configure(
        &self,
        config: impl Into<String>,
        runtime_name: impl Into<String>,
        runtime_version: impl Into<String>,
    ) -> Result<EventMask, CallError> {
        let request = HookRequest::Configure {
            config: config.into(),
            runtime_name: runtime_name.into(),
            runtime_version: runtime_version.into(),
        };

        expect_reply!(self.call(request).await?, Configured)
    }

    /// Sends the runtime state and returns the proposed container updates.
    pub async fn synchronize(
        &self,
        pods: Vec<PodSandbox>,
        containers: Vec<Container>,
    ) -> Result<Vec<ContainerUpdate>, CallError> {
        let reply = self.call(HookRequest::Synchronize { pods, containers }).await?;
        expect_reply!(reply, Synchronized)
    }

    /// Sends `Shutdown`.
    pub async fn shutdown(&self) -> Result<(), CallError> {
        self.notify(HookRequest::Shutdown).await
    }

    /// Sends `RunPodSandbox`.
    pub async fn run_pod_sandbox(&self, pod: PodSandbox) -> Result<(), CallError> {
        self.notify(HookRequest::RunPodSandbox { pod }).await
    }

    /// Sends `StopPodSandbox`.
    pub async fn stop_pod_sandbox(&self, pod: PodSandbox) -> Result<(), CallError> {
        self.notify(HookRequest::StopPodSandbox { pod }).await
    }

    /// Sends `RemovePodSandbox`.
    pub async fn remove_pod_sandbox(&self, pod: PodSandbox) -> Result<(), CallError> {
        self.notify(HookRequest::RemovePodSandbox { pod }).await
    }

    /// Returns the replacement descriptors, or `None` to keep them.
    pub async fn create_pod_sandbox_network_conf(
        &self,
        network_confs: Vec<CreateNetworkConf>,
    ) -> Result<Option<Vec<CreateNetworkConf>>, CallError> {
        let reply = self.call(HookRequest::CreatePodSandboxNetworkConf { network_confs }).await?;
        expect_reply!(reply, NetworkConfs)
    }

    /// Returns the capabilities to attach to the CNI invocation.
    pub async fn pre_setup_network(
        &self,
        pod: PodSandbox,
        cni_configs: Vec<CniConfig>,
    ) -> Result<Vec<CniCapabilities>, CallError> {
        let reply = self.call(HookRequest::PreSetupNetwork { pod, cni_configs }).await?;
        expect_reply!(reply, Capabilities)
    }

    /// Returns the possibly modified CNI results.
    pub async fn post_setup_network(
        &self,
        pod: PodSandbox,
        results: Vec<NetworkResult>,
    ) -> Result<Vec<NetworkResult>, CallError> {
        let reply = self.call(HookRequest::PostSetupNetwork { pod, results }).await?;
        expect_reply!(reply, Results)
    }

    /// Returns the adjusted network configurations.
    pub async fn adjust_pod_sandbox_network(
        &self,
        pod: PodSandbox,
        network_configs: Vec<NetworkConfiguration>,
    ) -> Result<Vec<NetworkConfiguration>, CallError> {
        let reply =
            self.call(HookRequest::AdjustPodSandboxNetwork { pod, network_configs }).await?;
        expect_reply!(reply, NetworkConfigurations)
    }

    /// Returns the possibly modified network configs.
    pub async fn network_configuration_changed(
        &self,
        cni_configs: Vec<CniConfig>,
    ) -> Result<Vec<CniConfig>, CallError> {
        let reply = self.call(HookRequest::NetworkConfigurationChanged { cni_configs }).await?;
        expect_reply!(reply, CniConfigs)
    }

    /// Sends `PreNetworkDeleted`.
    pub async fn pre_network_deleted(&self, pod: PodSandbox) -> Result<(), CallError> {
        self.notify(HookRequest::PreNetworkDeleted { pod }).await
    }

    /// Sends `PostNetworkDeleted`.
    pub async fn post_network_deleted(&self, pod: PodSandbox) -> Result<(), CallError> {
        self.notify(HookRequest::PostNetworkDeleted { pod }).await
    }
}
