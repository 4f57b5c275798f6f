use serde::{Deserialize, Serialize};

/// Bandwidth shaping parameters for a single network attachment.
///
/// Rates are in bits per second and bursts in bits. Zero means "unset": a class may only
/// limit ingress, in which case both egress fields stay zero.
///
/// The serialized form is the one the CNI `bandwidth` capability expects:
/// `{"ingressRate":..,"ingressBurst":..,"egressRate":..,"egressBurst":..}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BandwidthSpec {
    /// Ingress rate, in bits per second.
    pub ingress_rate: u64,
    /// Ingress burst, in bits.
    pub ingress_burst: u64,
    /// Egress rate, in bits per second.
    pub egress_rate: u64,
    /// Egress burst, in bits.
    pub egress_burst: u64,
}

impl BandwidthSpec {
    /// Creates a spec that only shapes ingress traffic.
    pub const fn ingress(rate: u64, burst: u64) -> Self {
        Self { ingress_rate: rate, ingress_burst: burst, egress_rate: 0, egress_burst: 0 }
    }

    /// Sets the egress rate and burst.
    pub const fn with_egress(mut self, rate: u64, burst: u64) -> Self {
        self.egress_rate = rate;
        self.egress_burst = burst;
        self
    }
}
