//! Tracing bootstrap.

use tracing_subscriber::EnvFilter;

use crate::ArenaConfig;

/// Installs a `fmt` subscriber filtered by `RUST_LOG`, falling back to
/// `config.log_filter`. Returns `false` if a global subscriber was already
/// set, which is harmless.
pub fn init_tracing(config: &ArenaConfig) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
