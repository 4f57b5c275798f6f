use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn, Instrument};

use nri_api::{EventMask, HookError, HookReply, HookRequest};

use super::StubStats;
use crate::{lifecycle::Lifecycle, plugin::dispatch, transport::Responder, Plugin};

/// A sandbox-scoped call queued for the sandbox worker.
pub(crate) struct SandboxJob {
    pub(crate) request: HookRequest,
    pub(crate) responder: Responder,
}

/// Per-sandbox state owned by a worker task.
pub(crate) struct SandboxWorker<P> {
    pub(crate) key: String,
    pub(crate) worker_id: u64,
    pub(crate) plugin: Arc<P>,
    pub(crate) events: EventMask,
    pub(crate) stats: Arc<StubStats>,
    /// Reject out-of-order hooks instead of dispatching them.
    pub(crate) strict: bool,
}

impl<P: Plugin> SandboxWorker<P> {
    /// Handles every call for one sandbox, in arrival order, until the sandbox is removed or
    /// the driver goes away. Returns the sandbox key and worker ID so the driver can clean up.
    pub(crate) async fn run(self, mut jobs: mpsc::UnboundedReceiver<SandboxJob>) -> (String, u64) {
        let mut lifecycle = Lifecycle::new(self.key.clone());

        while let Some(SandboxJob { request, responder }) = jobs.recv().await {
            let result = self.handle(&mut lifecycle, request).await;

            if lifecycle.is_removed() {
                // Calls made after the reply go to a fresh worker
                jobs.close();
                responder.send(result);
                break;
            }

            responder.send(result);
        }

        // Anything still queued was sent before the removal completed
        jobs.close();
        while let Ok(SandboxJob { request, responder }) = jobs.try_recv() {
            let result = self.handle(&mut lifecycle, request).await;
            responder.send(result);
        }

        debug!(sandbox = %self.key, "Sandbox worker done");

        (self.key, self.worker_id)
    }

    async fn handle(
        &self,
        lifecycle: &mut Lifecycle,
        request: HookRequest,
    ) -> Result<HookReply, HookError> {
        let Some(event) = request.event() else {
            return Err(HookError::Plugin("not a sandbox hook".to_string()));
        };

        if let Err(e) = lifecycle.advance(event) {
            self.stats.increment_out_of_order();

            if self.strict {
                warn!(sandbox = %self.key, error = %e, "Rejecting hook");
                self.stats.increment_rejected();
                return Err(e);
            }

            warn!(sandbox = %self.key, error = %e, "Dispatching out-of-order hook");
        }

        let span = tracing::info_span!("hook", %event, sandbox = %self.key);
        dispatch(&*self.plugin, self.events, &self.stats, request).instrument(span).await
    }
}
