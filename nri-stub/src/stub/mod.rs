use thiserror::Error;

use nri_api::{EventMask, HookError};

use crate::transport::TransportError;

mod driver;
mod runner;
mod stats;
mod worker;

pub use runner::*;
pub use stats::StubStats;

/// Errors that end a [`Stub`] run.
#[derive(Debug, Error)]
pub enum StubError {
    /// The plugin failed to configure.
    #[error("Configuration rejected: {0}")]
    Configure(HookError),
    /// `Configure` asked for events the plugin does not implement.
    #[error("Runtime subscribed to {requested:?}, but the plugin only implements {implemented:?}")]
    InvalidEventMask {
        /// The events `Configure` asked for.
        requested: EventMask,
        /// The events the plugin implements.
        implemented: EventMask,
    },
    /// The first call was not `Configure`.
    #[error("Expected Configure as the first call, got {0}")]
    NotConfigured(String),
    /// The plugin index is not two digits.
    #[error("Invalid plugin index {0:?}, expected two digits")]
    InvalidIndex(String),
    /// The connection to the runtime broke.
    #[error(transparent)]
    TransportLost(#[from] TransportError),
}

/// Options for a [`Stub`].
#[derive(Debug, Clone)]
pub struct StubOptions {
    /// The plugin name, used to identify the plugin towards the runtime and in logs.
    name: String,
    /// The plugin index. The runtime invokes plugins in ascending index order.
    idx: String,
    /// Whether sandbox hooks that do not move their sandbox forward are rejected.
    strict_lifecycle: bool,
}

impl Default for StubOptions {
    fn default() -> Self {
        Self { name: "nri-qos".to_string(), idx: "10".to_string(), strict_lifecycle: false }
    }
}

impl StubOptions {
    /// Sets the plugin name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the plugin index. Must be exactly two ASCII digits, validated when the stub runs.
    pub fn idx(mut self, idx: impl Into<String>) -> Self {
        self.idx = idx.into();
        self
    }

    /// Rejects sandbox hooks that repeat or go back in the sandbox lifecycle with
    /// [`HookError::LifecycleViolation`], instead of logging and dispatching them. Off by
    /// default: the runtime owns the lifecycle order.
    pub fn strict_lifecycle(mut self, strict: bool) -> Self {
        self.strict_lifecycle = strict;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), StubError> {
        if self.idx.len() == 2 && self.idx.bytes().all(|b| b.is_ascii_digit()) {
            Ok(())
        } else {
            Err(StubError::InvalidIndex(self.idx.clone()))
        }
    }
}
