use std::{fmt, ops};

use serde::{Deserialize, Serialize};

/// The hook points a plugin can subscribe to.
///
/// `Configure` is not an event: it is always delivered once, first, on every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum Event {
    /// Full runtime state, delivered once after `Configure`.
    Synchronize = 0,
    /// The runtime is shutting down.
    Shutdown = 1,
    /// A sandbox was started.
    RunPodSandbox = 2,
    /// A sandbox was stopped.
    StopPodSandbox = 3,
    /// A sandbox was removed.
    RemovePodSandbox = 4,
    /// Network configuration descriptors are about to be created.
    CreatePodSandboxNetworkConf = 5,
    /// Right before the CNI plugin chain runs for a sandbox.
    PreSetupNetwork = 6,
    /// Right after the CNI plugin chain ran for a sandbox.
    PostSetupNetwork = 7,
    /// The final network configurations of a sandbox may be adjusted.
    AdjustPodSandboxNetwork = 8,
    /// The runtime's network configs changed.
    NetworkConfigurationChanged = 9,
    /// Right before a sandbox network is torn down.
    PreNetworkDeleted = 10,
    /// Right after a sandbox network was torn down.
    PostNetworkDeleted = 11,
}

impl Event {
    /// All events, in protocol order.
    pub const ALL: [Self; 12] = [
        Self::Synchronize,
        Self::Shutdown,
        Self::RunPodSandbox,
        Self::StopPodSandbox,
        Self::RemovePodSandbox,
        Self::CreatePodSandboxNetworkConf,
        Self::PreSetupNetwork,
        Self::PostSetupNetwork,
        Self::AdjustPodSandboxNetwork,
        Self::NetworkConfigurationChanged,
        Self::PreNetworkDeleted,
        Self::PostNetworkDeleted,
    ];

    /// Returns `true` if the event concerns a single pod sandbox, and must therefore be
    /// ordered with the other events for that sandbox.
    pub const fn is_sandbox_scoped(&self) -> bool {
        matches!(
            self,
            Self::RunPodSandbox |
                Self::StopPodSandbox |
                Self::RemovePodSandbox |
                Self::PreSetupNetwork |
                Self::PostSetupNetwork |
                Self::AdjustPodSandboxNetwork |
                Self::PreNetworkDeleted |
                Self::PostNetworkDeleted
        )
    }

    #[inline]
    const fn bit(self) -> u32 {
        1 << self as u8
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A set of [`Event`]s, as exchanged during `Configure`.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventMask(u32);

impl EventMask {
    /// The empty mask. Returned from `Configure` it means "every implemented event".
    pub const fn empty() -> Self {
        Self(0)
    }

    /// The mask of every event.
    pub const fn all() -> Self {
        Self((1 << Event::ALL.len() as u32) - 1)
    }

    /// Returns `true` if the mask holds no event.
    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Returns `true` if `event` is in the mask.
    pub const fn contains(&self, event: Event) -> bool {
        self.0 & event.bit() != 0
    }

    /// Returns `true` if every event in `other` is also in `self`.
    pub const fn is_superset(&self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Adds an event to the mask.
    pub const fn with(self, event: Event) -> Self {
        Self(self.0 | event.bit())
    }

    /// Returns an iterator over the events in this mask, in protocol order.
    pub fn iter(&self) -> impl Iterator<Item = Event> + '_ {
        Event::ALL.into_iter().filter(|e| self.contains(*e))
    }
}

impl FromIterator<Event> for EventMask {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        iter.into_iter().fold(Self::empty(), Self::with)
    }
}

impl From<Event> for EventMask {
    fn from(event: Event) -> Self {
        Self(event.bit())
    }
}

impl ops::BitOr for EventMask {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl ops::BitOr<Event> for EventMask {
    type Output = Self;

    fn bitor(self, rhs: Event) -> Self {
        self.with(rhs)
    }
}

impl ops::BitAnd for EventMask {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self {
        Self(self.0 & rhs.0)
    }
}

impl fmt::Debug for EventMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}
