use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use parking_lot::Mutex;
use rand::Rng;

use nri_api::{
    CniCapabilities, CniConfig, Event, EventMask, HookError, NetworkResult, PodSandbox,
};
use nri_stub::Plugin;

mod lifecycle;

/// Records every hook call it receives as `(sandbox key, event)`.
#[derive(Clone, Default)]
pub struct Recorder {
    events: EventMask,
    /// Sleep up to this many milliseconds inside sandbox hooks.
    jitter_ms: u64,
    calls: Arc<Mutex<Vec<(String, Event)>>>,
}

impl Recorder {
    pub fn new(events: EventMask) -> Self {
        Self { events, ..Default::default() }
    }

    pub fn with_jitter(mut self, jitter_ms: u64) -> Self {
        self.jitter_ms = jitter_ms;
        self
    }

    pub fn calls(&self) -> Vec<(String, Event)> {
        self.calls.lock().clone()
    }

    /// Returns the events recorded for one sandbox, in call order.
    pub fn calls_for(&self, key: &str) -> Vec<Event> {
        self.calls.lock().iter().filter(|(k, _)| k == key).map(|(_, e)| *e).collect()
    }

    async fn record(&self, pod: &PodSandbox, event: Event) {
        if self.jitter_ms > 0 {
            let delay = rand::thread_rng().gen_range(0..=self.jitter_ms);
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        self.calls.lock().push((pod.key(), event));
    }
}

#[async_trait]
impl Plugin for Recorder {
    fn events(&self) -> EventMask {
        self.events
    }

    async fn shutdown(&self) {
        self.calls.lock().push((String::new(), Event::Shutdown));
    }

    async fn run_pod_sandbox(&self, pod: &PodSandbox) -> Result<(), HookError> {
        self.record(pod, Event::RunPodSandbox).await;
        Ok(())
    }

    async fn stop_pod_sandbox(&self, pod: &PodSandbox) -> Result<(), HookError> {
        self.record(pod, Event::StopPodSandbox).await;
        Ok(())
    }

    async fn remove_pod_sandbox(&self, pod: &PodSandbox) -> Result<(), HookError> {
        self.record(pod, Event::RemovePodSandbox).await;
        Ok(())
    }

    async fn pre_setup_network(
        &self,
        pod: &PodSandbox,
        cni_configs: Vec<CniConfig>,
    ) -> Result<Vec<CniCapabilities>, HookError> {
        self.record(pod, Event::PreSetupNetwork).await;
        Ok(cni_configs.into_iter().map(|c| CniCapabilities::new(c.name)).collect())
    }

    async fn post_setup_network(
        &self,
        pod: &PodSandbox,
        results: Vec<NetworkResult>,
    ) -> Result<Vec<NetworkResult>, HookError> {
        self.record(pod, Event::PostSetupNetwork).await;
        Ok(results)
    }

    async fn pre_network_deleted(&self, pod: &PodSandbox) -> Result<(), HookError> {
        self.record(pod, Event::PreNetworkDeleted).await;
        Ok(())
    }

    async fn post_network_deleted(&self, pod: &PodSandbox) -> Result<(), HookError> {
        self.record(pod, Event::PostNetworkDeleted).await;
        Ok(())
    }
}

/// The sandbox events, in lifecycle order.
pub const LIFECYCLE: [Event; 7] = [
    Event::PreSetupNetwork,
    Event::PostSetupNetwork,
    Event::RunPodSandbox,
    Event::PreNetworkDeleted,
    Event::PostNetworkDeleted,
    Event::StopPodSandbox,
    Event::RemovePodSandbox,
];

/// The lifecycle events plus `Shutdown`.
pub fn sandbox_events() -> EventMask {
    LIFECYCLE.into_iter().collect::<EventMask>() | Event::Shutdown
}
