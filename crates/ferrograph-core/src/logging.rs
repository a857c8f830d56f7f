//! Tracing subscriber setup for binaries and tests embedding the store

use crate::{Error, Result};
use tracing_subscriber::{EnvFilter, fmt};

/// Install a global fmt subscriber filtered by `level`
/// (any `EnvFilter` directive, e.g. `"ferrograph_core=debug"`).
///
/// Fails if the directive is invalid or a subscriber is already installed.
pub fn init_logging(level: &str) -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_new(level)
                .map_err(|e| Error::config(format!("Invalid log level: {e}")))?,
        )
        .with_target(true)
        .try_init()
        .map_err(|_| Error::config("Logging already initialized"))
}
