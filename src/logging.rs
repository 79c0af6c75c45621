//! Optional tracing subscriber setup
//!
//! The library only emits `tracing` events; installing a subscriber is left to
//! the embedding application. [`init_tracing`] is a convenience for binaries
//! and examples that want plain formatted output on stderr.

use tracing::Level;

/// Environment variable read by [`level_from_env`]
pub const LOG_ENV: &str = "TOPIC_LOG";

/// Install a formatted stderr subscriber at `level`
/// Returns false when a global subscriber was already installed.
pub fn init_tracing(level: Level) -> bool {
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}

/// Parse a log level name (case-insensitive)
/// Recognized: `trace`, `debug`, `info`, `warn`, `error`.
#[must_use]
pub fn parse_level(s: &str) -> Option<Level> {
    match s.to_lowercase().as_str() {
        "trace" => Some(Level::TRACE),
        "debug" => Some(Level::DEBUG),
        "info" => Some(Level::INFO),
        "warn" => Some(Level::WARN),
        "error" => Some(Level::ERROR),
        _ => None,
    }
}

/// Level named by `TOPIC_LOG`, or `default` when unset or unrecognized
#[must_use]
pub fn level_from_env(default: Level) -> Level {
    std::env::var(LOG_ENV)
        .ok()
        .and_then(|s| parse_level(&s))
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_ignores_case() {
        assert_eq!(parse_level("DEBUG"), Some(Level::DEBUG));
        assert_eq!(parse_level("warn"), Some(Level::WARN));
        assert_eq!(parse_level("Error"), Some(Level::ERROR));
    }

    #[test]
    fn parse_level_rejects_unknown() {
        assert_eq!(parse_level("verbose"), None);
        assert_eq!(parse_level(" info"), None);
        assert_eq!(parse_level(""), None);
    }
}
