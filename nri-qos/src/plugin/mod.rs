use tracing::{debug, error};

use nri_api::HookError;

use crate::{config::PluginConfig, resolver::QosResolver};

mod adjust;
mod setup;

pub use adjust::AdjustNetworkPlugin;
pub use setup::SetupNetworkPlugin;

/// Applies the configuration blob delivered by `Configure`. A blank blob keeps the current
/// configuration.
fn reconfigure(resolver: &mut QosResolver, blob: &str) -> Result<(), HookError> {
    if blob.trim().is_empty() {
        return Ok(());
    }

    let config = PluginConfig::parse(blob).map_err(|e| {
        error!(error = %e, "Invalid plugin configuration");
        HookError::ConfigParse(e.to_string())
    })?;

    debug!(?config, "Got configuration data");
    *resolver = QosResolver::new(config);

    Ok(())
}
