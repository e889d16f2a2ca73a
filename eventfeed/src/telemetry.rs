//! Tracing bootstrap for binaries and demos.

use std::sync::OnceLock;
use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or invalid.
pub const DEFAULT_FILTER: &str = "info";

static INSTALLED: OnceLock<bool> = OnceLock::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install a human-readable `tracing` subscriber filtered by `RUST_LOG`.
///
/// Only the first call (of this or [`init_json_tracing`]) does anything.
/// Returns `false` if another global subscriber was already installed.
pub fn init_tracing() -> bool {
    *INSTALLED.get_or_init(|| {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter())
            .with_target(false)
            .try_init()
            .is_ok()
    })
}

/// Install a JSON `tracing` subscriber writing to stderr.
///
/// Shares the one-shot guard with [`init_tracing`].
pub fn init_json_tracing() -> bool {
    *INSTALLED.get_or_init(|| {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter())
            .with_target(false)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok()
    })
}
