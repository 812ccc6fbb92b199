//! Tracing subscriber bootstrap for binaries embedding the editor.

use anyhow::{anyhow, Context};
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber filtered by `RUST_LOG`, falling back to
/// `default_filter` (e.g. `"dondoko=info"`) when the variable is unset.
///
/// Fails instead of panicking if a global subscriber is already installed.
pub fn init_logging(default_filter: &str) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(default_filter)
            .with_context(|| format!("invalid log filter: {default_filter}"))?,
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow!("logging already initialized: {e}"))?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "dondoko editor logging started"
    );
    Ok(())
}
