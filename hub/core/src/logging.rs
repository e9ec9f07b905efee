//! Tracing Setup
//!
//! The library only emits `tracing` events. Binaries and tests that embed it
//! call [`init_tracing`] once to get formatted output on stderr.

use tracing_subscriber::EnvFilter;

/// Environment variable holding the filter directives (`RUST_LOG` syntax)
pub const LOG_ENV_VAR: &str = "STATUSHUB_LOG";

/// Directive used when [`LOG_ENV_VAR`] is unset or invalid
pub const DEFAULT_DIRECTIVE: &str = "statushub_core=info";

/// Install the global fmt subscriber
///
/// Returns false if a global subscriber was already installed.
pub fn init_tracing() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(true)
        .try_init()
        .is_ok()
}

/// Install a subscriber that writes through the test harness capture
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_test_writer()
        .try_init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_init_is_harmless() {
        init_test_tracing();
        init_test_tracing();
        assert!(!init_tracing());
    }
}
