//! Tracing subscriber setup.
//!
//! Log lines go to stderr so that command output on stdout stays clean.
//! `RUST_LOG` always wins over the configured levels.

use std::str::FromStr;

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Configuration for the telemetry subsystem.
#[derive(Clone, Debug)]
pub struct TelemetryConfig {
    /// Default log level. Overridden by `RUST_LOG`.
    pub log_level: Level,
    /// Per-module level overrides (e.g. `parley_clients` => DEBUG).
    pub module_levels: Vec<(String, Level)>,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            log_level: Level::INFO,
            module_levels: Vec::new(),
            json: false,
        }
    }
}

impl TelemetryConfig {
    /// Build a config from a level name. Unknown names fall back to `info`.
    pub fn from_level_name(level: &str, json: bool) -> Self {
        Self {
            log_level: parse_level(level).unwrap_or(Level::INFO),
            module_levels: Vec::new(),
            json,
        }
    }

    /// Add a per-module override.
    #[must_use]
    pub fn with_module_level(mut self, module: impl Into<String>, level: Level) -> Self {
        self.module_levels.push((module.into(), level));
        self
    }

    /// The filter directive string derived from this config.
    pub fn directives(&self) -> String {
        let mut filter = self.log_level.to_string().to_lowercase();
        for (module, level) in &self.module_levels {
            filter.push(',');
            filter.push_str(module);
            filter.push('=');
            filter.push_str(&level.to_string().to_lowercase());
        }
        filter
    }
}

/// Parse a level name case-insensitively.
pub fn parse_level(name: &str) -> Option<Level> {
    Level::from_str(name.trim()).ok()
}

fn build_filter(config: &TelemetryConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.directives()))
}

/// Install the global subscriber.
///
/// Returns `false` when a subscriber was already installed; the existing one
/// is left untouched.
pub fn init_telemetry(config: &TelemetryConfig) -> bool {
    let json_layer = config.json.then(|| {
        tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_span_list(true)
            .with_writer(std::io::stderr)
            .with_filter(build_filter(config))
    });
    let text_layer = (!config.json).then(|| {
        tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_writer(std::io::stderr)
            .with_filter(build_filter(config))
    });

    tracing_subscriber::registry()
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives() {
        assert_eq!(TelemetryConfig::default().directives(), "info");
    }

    #[test]
    fn module_levels_in_directives() {
        let config = TelemetryConfig::default()
            .with_module_level("parley_clients", Level::DEBUG)
            .with_module_level("reqwest", Level::WARN);
        assert_eq!(
            config.directives(),
            "info,parley_clients=debug,reqwest=warn"
        );
    }

    #[test]
    fn level_names() {
        assert_eq!(parse_level("debug"), Some(Level::DEBUG));
        assert_eq!(parse_level("WARN"), Some(Level::WARN));
        assert_eq!(parse_level(" trace "), Some(Level::TRACE));
        assert_eq!(parse_level("loud"), None);
    }

    #[test]
    fn unknown_level_falls_back_to_info() {
        let config = TelemetryConfig::from_level_name("loud", true);
        assert_eq!(config.log_level, Level::INFO);
        assert!(config.json);
    }

    #[test]
    fn second_init_is_noop() {
        let config = TelemetryConfig::default();
        let _first = init_telemetry(&config);
        assert!(!init_telemetry(&config));
    }
}
