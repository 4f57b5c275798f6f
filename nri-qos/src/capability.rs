//! Encodes resolved bandwidth into CNI capabilities.
//!
//! The payload under [`BANDWIDTH_CAPABILITY`] is the JSON form of [`BandwidthSpec`], which is
//! what the CNI `bandwidth` plugin reads from its runtime config.

use bytes::Bytes;
use thiserror::Error;
use tracing::warn;

use nri_api::{BandwidthSpec, CniCapabilities};

use crate::resolver::QosDecision;

/// The capability key for bandwidth shaping.
pub const BANDWIDTH_CAPABILITY: &str = "bandwidth";

/// The bandwidth for a network config could not be encoded.
#[derive(Debug, Error)]
#[error("Failed to encode bandwidth for network config {config}: {source}")]
pub struct CapabilityEncodeError {
    /// The network config name.
    pub config: String,
    #[source]
    source: serde_json::Error,
}

/// Encodes a bandwidth spec as a capability payload.
pub fn encode_bandwidth(bandwidth: &BandwidthSpec) -> Result<Bytes, serde_json::Error> {
    serde_json::to_vec(bandwidth).map(Bytes::from)
}

/// Decodes a capability payload produced by [`encode_bandwidth`].
pub fn decode_bandwidth(payload: &[u8]) -> Result<BandwidthSpec, serde_json::Error> {
    serde_json::from_slice(payload)
}

/// Builds the capabilities entry for one network config.
pub fn bandwidth_capability(
    config: &str,
    bandwidth: &BandwidthSpec,
) -> Result<CniCapabilities, CapabilityEncodeError> {
    let payload = encode_bandwidth(bandwidth)
        .map_err(|source| CapabilityEncodeError { config: config.to_string(), source })?;

    Ok(CniCapabilities::new(config).with_capability(BANDWIDTH_CAPABILITY, payload))
}

/// Builds the capabilities for every resolved decision, in order. Skipped decisions and configs
/// whose bandwidth fails to encode are left out.
pub fn capabilities(decisions: &[QosDecision]) -> Vec<CniCapabilities> {
    decisions
        .iter()
        .filter_map(|decision| {
            let bandwidth = decision.bandwidth()?;

            match bandwidth_capability(&decision.config, &bandwidth) {
                Ok(caps) => Some(caps),
                Err(e) => {
                    warn!(error = %e, "Skipping network config");
                    None
                }
            }
        })
        .collect()
}
