use tracing::Level;

use crate::config::{LOG_VAR, env_value};

/// Install a fmt subscriber at the level named by `LEUKODETECT_LOG`.
///
/// Safe to call more than once; only the first call installs anything.
pub fn init_tracing() {
    let level = env_value(LOG_VAR)
        .and_then(|raw| parse_level(&raw))
        .unwrap_or(Level::INFO);

    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(true)
        .try_init();
}

fn parse_level(raw: &str) -> Option<Level> {
    raw.trim().parse().ok()
}
