//! Tracing subscriber bootstrap for agent processes.

use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` takes precedence over `level` when set. Returns `false` when a
/// subscriber was already installed (e.g. by the embedding application), in
/// which case nothing changes.
pub fn init_logging(level: &str, json: bool) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_lowercase()));

    let installed = if json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .try_init()
            .is_ok()
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).try_init().is_ok()
    };

    if installed {
        tracing::debug!(level, json, "logging initialized");
    }
    installed
}
