//! The seam between the stub and whatever carries hook calls from the runtime.
//!
//! Registration, framing and decoding belong to the transport. The stub only sees a stream of
//! decoded [`HookCall`]s, each carrying a one-shot [`Responder`] for its reply. The stream ending
//! means the runtime closed the connection.

use futures::Stream;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::debug;

use nri_api::{HookError, HookReply, HookRequest};

pub mod channel;

/// The result of a hook call, as sent back to the runtime.
pub type HookResult = Result<HookReply, HookError>;

/// An error reported by the transport. The connection is unusable afterwards.
#[derive(Debug, Error)]
#[error("Transport error: {0}")]
pub struct TransportError(#[from] pub Box<dyn std::error::Error + Send + Sync>);

impl TransportError {
    /// Creates a transport error from any error type.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self(Box::new(error))
    }
}

/// Anything that yields decoded hook calls.
pub trait Transport: Stream<Item = Result<HookCall, TransportError>> + Send + Unpin + 'static {}

// Blanket implementation of `Transport` for any stream that yields hook calls.
impl<T> Transport for T where
    T: Stream<Item = Result<HookCall, TransportError>> + Send + Unpin + 'static
{
}

/// A hook call delivered by the transport.
#[derive(Debug)]
pub struct HookCall {
    /// The decoded request.
    request: HookRequest,
    /// The channel to reply on.
    responder: Responder,
}

impl HookCall {
    /// Creates a new call, returning the receiving end for its reply.
    pub fn new(request: HookRequest) -> (Self, oneshot::Receiver<HookResult>) {
        let (tx, rx) = oneshot::channel();
        (Self { request, responder: Responder(tx) }, rx)
    }

    /// Returns a reference to the request.
    pub fn request(&self) -> &HookRequest {
        &self.request
    }

    /// Splits the call into its request and the responder to answer it with.
    pub fn into_parts(self) -> (HookRequest, Responder) {
        (self.request, self.responder)
    }
}

/// The reply half of a [`HookCall`].
#[derive(Debug)]
pub struct Responder(oneshot::Sender<HookResult>);

impl Responder {
    /// Sends the reply. If the runtime side already gave up on the call, the reply is dropped.
    pub fn send(self, result: HookResult) {
        if self.0.send(result).is_err() {
            debug!("Caller went away before the reply was sent");
        }
    }
}
