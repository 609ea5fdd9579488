//! Structured logging setup.
//!
//! Thin wrapper over `tracing-subscriber` driven by
//! [`LoggingConfig`](crate::config::LoggingConfig). Library code only emits
//! `tracing` events; installing a subscriber is the embedding application's
//! call, so `init` is best-effort and tolerates an already-installed global
//! subscriber.

use crate::config::LoggingConfig;

/// Install a global `fmt` subscriber from the given configuration.
///
/// Returns `false` if a global subscriber was already set, which is common
/// in tests and in applications that configure logging themselves.
pub fn init(config: &LoggingConfig) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(config.log_level)
        .with_target(config.log_targets)
        .try_init()
        .is_ok()
}
