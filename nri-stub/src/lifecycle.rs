use std::fmt;

use nri_api::{Event, HookError};

/// The lifecycle phase of a single pod sandbox, as observed through its hooks.
///
/// Phases only move forward. Each sandbox hook moves the sandbox to a fixed target phase, see
/// [`SandboxPhase::target`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum SandboxPhase {
    /// No hook seen yet.
    #[default]
    Created,
    /// `PreSetupNetwork` completed.
    NetworkSetupStarted,
    /// `PostSetupNetwork` or `AdjustPodSandboxNetwork` completed.
    NetworkConfigured,
    /// `RunPodSandbox` completed.
    Running,
    /// `PreNetworkDeleted` completed.
    NetworkTeardownStarted,
    /// `PostNetworkDeleted` completed.
    NetworkTeardownComplete,
    /// `StopPodSandbox` completed.
    Stopped,
    /// `RemovePodSandbox` completed.
    Removed,
}

impl SandboxPhase {
    /// Returns the phase a sandbox enters once the hook for `event` completed, or `None` for
    /// events that do not concern a single sandbox.
    pub const fn target(event: Event) -> Option<Self> {
        let phase = match event {
            Event::PreSetupNetwork => Self::NetworkSetupStarted,
            Event::PostSetupNetwork | Event::AdjustPodSandboxNetwork => Self::NetworkConfigured,
            Event::RunPodSandbox => Self::Running,
            Event::PreNetworkDeleted => Self::NetworkTeardownStarted,
            Event::PostNetworkDeleted => Self::NetworkTeardownComplete,
            Event::StopPodSandbox => Self::Stopped,
            Event::RemovePodSandbox => Self::Removed,
            _ => return None,
        };

        Some(phase)
    }
}

impl fmt::Display for SandboxPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Tracks the phase of one sandbox and flags hooks that do not move it forward.
///
/// A hook may skip phases (the plugin may not be subscribed to every event), but may never
/// repeat or go back.
#[derive(Debug)]
pub struct Lifecycle {
    sandbox: String,
    phase: SandboxPhase,
}

impl Lifecycle {
    /// Creates a tracker for the sandbox with the given key, in the `Created` phase.
    pub fn new(sandbox: impl Into<String>) -> Self {
        Self { sandbox: sandbox.into(), phase: SandboxPhase::default() }
    }

    /// Returns the current phase.
    pub const fn phase(&self) -> SandboxPhase {
        self.phase
    }

    /// Returns `true` once `RemovePodSandbox` was seen.
    pub fn is_removed(&self) -> bool {
        self.phase == SandboxPhase::Removed
    }

    /// Moves the sandbox to the target phase of `event`.
    ///
    /// On error the phase is left unchanged.
    pub fn advance(&mut self, event: Event) -> Result<SandboxPhase, HookError> {
        match SandboxPhase::target(event) {
            Some(target) if target > self.phase => {
                self.phase = target;
                Ok(target)
            }
            _ => Err(HookError::LifecycleViolation {
                event,
                sandbox: self.sandbox.clone(),
                phase: self.phase.to_string(),
            }),
        }
    }
}
