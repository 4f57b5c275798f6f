use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, error, info, Instrument};

use nri_api::{Event, EventMask, HookError, HookReply, HookRequest};

use super::{driver::StubDriver, StubError, StubOptions, StubStats};
use crate::{transport::Transport, Plugin};

/// Callback invoked once the connection to the runtime is gone.
pub type OnClose = Box<dyn FnOnce() + Send + 'static>;

/// Connects a [`Plugin`] to a runtime over a [`Transport`].
///
/// The stub expects `Configure` as the very first call and negotiates the event subscription.
/// It then dispatches every following call until the runtime shuts down or the connection is
/// lost. Calls for the same sandbox are handled in order, one at a time; everything else runs
/// concurrently.
pub struct Stub<P: Plugin, T: Transport> {
    plugin: P,
    transport: T,
    options: StubOptions,
    stats: Arc<StubStats>,
    on_close: Option<OnClose>,
}

impl<P: Plugin, T: Transport> std::fmt::Debug for Stub<P, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stub").field("options", &self.options).field("stats", &self.stats).finish()
    }
}

impl<P, T> Stub<P, T>
where
    P: Plugin,
    T: Transport,
{
    /// Creates a new stub with the default [`StubOptions`].
    pub fn new(plugin: P, transport: T) -> Self {
        Self::with_options(plugin, transport, StubOptions::default())
    }

    /// Creates a new stub with the given options.
    pub fn with_options(plugin: P, transport: T, options: StubOptions) -> Self {
        Self { plugin, transport, options, stats: Arc::default(), on_close: None }
    }

    /// Sets the callback invoked when the connection to the runtime is lost. In-flight calls are
    /// abandoned before it runs; a typical callback exits the process.
    pub fn with_on_close<F>(mut self, on_close: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        self.on_close = Some(Box::new(on_close));
        self
    }

    /// Returns the statistics for this stub. They stay readable after [`Stub::run`] returns.
    pub fn stats(&self) -> Arc<StubStats> {
        Arc::clone(&self.stats)
    }

    /// Runs the stub until the runtime shuts down or closes the connection.
    ///
    /// Returns an error if configuration fails or the transport breaks.
    pub async fn run(self) -> Result<(), StubError> {
        self.options.validate()?;

        let span =
            tracing::info_span!(parent: None, "nri_stub", plugin = %self.options.name, idx = %self.options.idx);

        self.serve().instrument(span).await
    }

    async fn serve(mut self) -> Result<(), StubError> {
        let call = match self.transport.next().await {
            Some(Ok(call)) => call,
            Some(Err(e)) => {
                error!(error = %e, "Transport failed before configuration");
                self.close();
                return Err(e.into());
            }
            None => {
                info!("Connection to the runtime closed before configuration");
                self.close();
                return Ok(());
            }
        };

        let (request, responder) = call.into_parts();

        let (config, runtime_name, runtime_version) = match request {
            HookRequest::Configure { config, runtime_name, runtime_version } => {
                (config, runtime_name, runtime_version)
            }
            other => {
                let got = other.event().map(|e| e.to_string()).unwrap_or_default();
                responder.send(Err(HookError::Plugin("plugin is not configured".to_string())));
                return Err(StubError::NotConfigured(got));
            }
        };

        info!("Connected to {}/{}", runtime_name, runtime_version);

        let requested =
            match self.plugin.configure(&config, &runtime_name, &runtime_version).await {
                Ok(mask) => mask,
                Err(e) => {
                    error!(error = %e, "Configuration failed");
                    responder.send(Err(e.clone()));
                    return Err(StubError::Configure(e));
                }
            };

        let events = match negotiate(requested, self.plugin.events()) {
            Ok(events) => events,
            Err(e) => {
                responder.send(Err(HookError::plugin(&e)));
                return Err(e);
            }
        };

        let subscribed = subscription(events);
        debug!(?events, ?subscribed, "Subscribed");
        responder.send(Ok(HookReply::Configured(subscribed)));

        StubDriver::new(
            Arc::new(self.plugin),
            self.transport,
            events,
            self.options.strict_lifecycle,
            self.stats,
            self.on_close,
        )
        .await
    }

    fn close(&mut self) {
        if let Some(on_close) = self.on_close.take() {
            on_close();
        }
    }
}

/// Computes the effective subscription from what `Configure` asked for and what the plugin
/// implements. An empty request subscribes to everything implemented.
fn negotiate(requested: EventMask, implemented: EventMask) -> Result<EventMask, StubError> {
    if requested.is_empty() {
        Ok(implemented)
    } else if implemented.is_superset(requested) {
        Ok(requested)
    } else {
        Err(StubError::InvalidEventMask { requested, implemented })
    }
}

/// Returns the subscription announced to the runtime for the events routed to the plugin.
///
/// `RemovePodSandbox` is always included, since it is what releases a sandbox worker. The
/// plugin only sees it if it asked for it; otherwise the call passes through.
fn subscription(events: EventMask) -> EventMask {
    events.with(Event::RemovePodSandbox)
}
