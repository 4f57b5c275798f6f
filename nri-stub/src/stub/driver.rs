use std::{
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::{future::BoxFuture, FutureExt, StreamExt};
use rustc_hash::FxHashMap;
use tokio::{sync::mpsc, task::JoinSet};
use tracing::{debug, error, info, warn, Instrument};

use nri_api::{Event, EventMask, HookError, HookRequest};

use super::{
    runner::OnClose,
    worker::{SandboxJob, SandboxWorker},
    StubError, StubStats,
};
use crate::{
    plugin::dispatch,
    transport::{HookCall, Responder, Transport},
    Plugin,
};

/// The queue into a live sandbox worker.
struct SandboxHandle {
    /// Distinguishes successive workers for the same sandbox key.
    worker_id: u64,
    jobs: mpsc::UnboundedSender<SandboxJob>,
}

/// The stub driver. Future that drives the configured stub until shutdown or connection loss.
pub(crate) struct StubDriver<P: Plugin, T: Transport> {
    /// The configured plugin, shared with every hook task.
    plugin: Arc<P>,
    /// The transport delivering hook calls.
    transport: T,
    /// The events routed to the plugin.
    events: EventMask,
    /// Reject out-of-order sandbox hooks.
    strict_lifecycle: bool,
    /// Statistics, shared with the stub front-end.
    stats: Arc<StubStats>,
    /// Live sandbox workers, keyed by sandbox key.
    sandboxes: FxHashMap<String, SandboxHandle>,
    /// The sandbox worker tasks.
    sandbox_tasks: JoinSet<(String, u64)>,
    /// Runtime-scoped hook tasks.
    runtime_tasks: JoinSet<()>,
    next_worker_id: u64,
    /// Set once `Shutdown` has been received. Completes after the plugin handled it.
    shutdown: Option<BoxFuture<'static, ()>>,
    on_close: Option<OnClose>,
}

impl<P, T> StubDriver<P, T>
where
    P: Plugin,
    T: Transport,
{
    pub(crate) fn new(
        plugin: Arc<P>,
        transport: T,
        events: EventMask,
        strict_lifecycle: bool,
        stats: Arc<StubStats>,
        on_close: Option<OnClose>,
    ) -> Self {
        Self {
            plugin,
            transport,
            events,
            strict_lifecycle,
            stats,
            sandboxes: FxHashMap::default(),
            sandbox_tasks: JoinSet::new(),
            runtime_tasks: JoinSet::new(),
            next_worker_id: 0,
            shutdown: None,
            on_close,
        }
    }

    fn on_call(&mut self, call: HookCall) {
        let (request, responder) = call.into_parts();

        let Some(event) = request.event() else {
            warn!("Received Configure on an already configured connection");
            responder.send(Err(HookError::Plugin("plugin already configured".to_string())));
            return;
        };

        match event {
            Event::Shutdown => self.on_shutdown(request, responder),
            event if event.is_sandbox_scoped() => self.on_sandbox_call(request, responder),
            event => {
                let plugin = Arc::clone(&self.plugin);
                let stats = Arc::clone(&self.stats);
                let events = self.events;
                let span = tracing::info_span!("hook", %event);

                self.runtime_tasks.spawn(
                    async move {
                        let result = dispatch(&*plugin, events, &stats, request).await;
                        responder.send(result);
                    }
                    .instrument(span),
                );
            }
        }
    }

    /// Queues a sandbox-scoped call on the worker for its sandbox, spawning one if needed.
    fn on_sandbox_call(&mut self, request: HookRequest, responder: Responder) {
        let Some(key) = request.pod().map(|pod| pod.key()) else {
            responder.send(Err(HookError::Plugin("sandbox hook without a sandbox".to_string())));
            return;
        };

        let mut job = SandboxJob { request, responder };

        if let Some(handle) = self.sandboxes.get(&key) {
            match handle.jobs.send(job) {
                Ok(()) => return,
                // The worker finished but has not been reaped yet
                Err(mpsc::error::SendError(returned)) => job = returned,
            }
        }

        let (tx, rx) = mpsc::unbounded_channel();
        // The receiver is alive, this cannot fail
        let _ = tx.send(job);

        let worker_id = self.next_worker_id;
        self.next_worker_id += 1;

        debug!(sandbox = %key, worker_id, "Spawning sandbox worker");

        self.sandboxes.insert(key.clone(), SandboxHandle { worker_id, jobs: tx });
        self.stats.increment_active_sandboxes();
        let worker = SandboxWorker {
            key,
            worker_id,
            plugin: Arc::clone(&self.plugin),
            events: self.events,
            stats: Arc::clone(&self.stats),
            strict: self.strict_lifecycle,
        };
        self.sandbox_tasks.spawn(worker.run(rx));
    }

    fn on_shutdown(&mut self, request: HookRequest, responder: Responder) {
        info!("Runtime shutting down");

        let plugin = Arc::clone(&self.plugin);
        let stats = Arc::clone(&self.stats);
        let events = self.events;

        self.shutdown = Some(Box::pin(async move {
            let result = dispatch(&*plugin, events, &stats, request).await;
            responder.send(result);
        }));
    }

    fn on_sandbox_done(&mut self, key: String, worker_id: u64) {
        self.stats.decrement_active_sandboxes();

        // A newer worker may have taken over the key in the meantime
        if self.sandboxes.get(&key).is_some_and(|h| h.worker_id == worker_id) {
            self.sandboxes.remove(&key);
        }
    }

    /// Abandons every in-flight call. Nothing is retried.
    fn abort_all(&mut self) {
        self.sandboxes.clear();
        self.sandbox_tasks.abort_all();
        self.runtime_tasks.abort_all();
    }

    fn close(&mut self) {
        self.abort_all();

        if let Some(on_close) = self.on_close.take() {
            on_close();
        }
    }
}

impl<P, T> Future for StubDriver<P, T>
where
    P: Plugin,
    T: Transport,
{
    type Output = Result<(), StubError>;

    fn poll(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        let this = self.get_mut();

        loop {
            if let Some(shutdown) = this.shutdown.as_mut() {
                if shutdown.poll_unpin(cx).is_pending() {
                    return Poll::Pending;
                }

                this.abort_all();
                return Poll::Ready(Ok(()));
            }

            if let Poll::Ready(Some(result)) = this.sandbox_tasks.poll_join_next(cx) {
                match result {
                    Ok((key, worker_id)) => this.on_sandbox_done(key, worker_id),
                    Err(e) => {
                        // The stale handle is replaced on the next call for that sandbox
                        error!(error = %e, "Sandbox worker failed");
                        this.stats.decrement_active_sandboxes();
                    }
                }

                continue;
            }

            if let Poll::Ready(Some(result)) = this.runtime_tasks.poll_join_next(cx) {
                if let Err(e) = result {
                    error!(error = %e, "Hook task failed");
                }

                continue;
            }

            match this.transport.poll_next_unpin(cx) {
                Poll::Ready(Some(Ok(call))) => {
                    this.on_call(call);
                    continue;
                }
                Poll::Ready(Some(Err(e))) => {
                    error!(error = %e, "Connection to the runtime lost");
                    this.close();
                    return Poll::Ready(Err(e.into()));
                }
                Poll::Ready(None) => {
                    info!("Connection to the runtime lost, exiting...");
                    this.close();
                    return Poll::Ready(Ok(()));
                }
                Poll::Pending => {}
            }

            return Poll::Pending;
        }
    }
}
