//! Subscriber construction: an env-filter over either a pretty, human
//! readable formatter (for a terminal) or a JSON formatter (for ingestion
//! by a log pipeline).

use tracing_subscriber::fmt;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::{TelemetryError, TelemetryResult};

/// Output encoding for emitted log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable, ANSI-colored lines. The default outside production.
    #[default]
    Pretty,
    /// One JSON object per line, for structured ingestion.
    Json,
}

/// Where log lines are written. Only stderr is implemented; the variant
/// exists so a future sink (e.g. a file appender) can be added without
/// changing [`LogConfig`]'s shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogTarget {
    /// Standard error. The default.
    #[default]
    Stderr,
}

/// Builder for the global tracing subscriber.
#[derive(Debug, Clone)]
pub struct LogConfig {
    default_level: String,
    format: LogFormat,
    target: LogTarget,
    extra_directives: Vec<String>,
}

impl LogConfig {
    /// Start a config with `default_level` (e.g. `"info"`, `"debug"`) as
    /// the base directive.
    #[must_use]
    pub fn new(default_level: impl Into<String>) -> Self {
        Self {
            default_level: default_level.into(),
            format: LogFormat::default(),
            target: LogTarget::default(),
            extra_directives: Vec::new(),
        }
    }

    /// Set the output format.
    #[must_use]
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    /// Set the output target.
    #[must_use]
    pub fn with_target(mut self, target: LogTarget) -> Self {
        self.target = target;
        self
    }

    /// Add a per-module directive (e.g. `"nanoclaw_ipc=trace"`), appended
    /// after the default level so it takes precedence.
    #[must_use]
    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.extra_directives.push(directive.into());
        self
    }

    fn filter_string(&self) -> String {
        if self.extra_directives.is_empty() {
            self.default_level.clone()
        } else {
            format!("{},{}", self.default_level, self.extra_directives.join(","))
        }
    }
}

/// Install the global tracing subscriber from `config`.
///
/// # Errors
/// Returns [`TelemetryError::InvalidDirective`] if the filter string does
/// not parse, or [`TelemetryError::AlreadySet`] if a global subscriber was
/// already installed.
pub fn setup_logging(config: &LogConfig) -> TelemetryResult<()> {
    let filter = EnvFilter::try_new(config.filter_string())
        .map_err(|e| TelemetryError::InvalidDirective(e.to_string()))?;

    let registry = tracing_subscriber::registry().with(filter);

    let result = match config.format {
        LogFormat::Pretty => registry.with(fmt::layer().with_target(true)).try_init(),
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).flatten_event(true))
            .try_init(),
    };

    result.map_err(|e| TelemetryError::AlreadySet(e.to_string()))
}

/// Install a default subscriber: `info` level, pretty formatting, honoring
/// `RUST_LOG` if set.
///
/// # Errors
/// See [`setup_logging`].
pub fn setup_default_logging() -> TelemetryResult<()> {
    let default_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
    setup_logging(&LogConfig::new(default_level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_string_without_directives() {
        let config = LogConfig::new("info");
        assert_eq!(config.filter_string(), "info");
    }

    #[test]
    fn test_filter_string_with_directives() {
        let config = LogConfig::new("info").with_directive("nanoclaw_ipc=trace");
        assert_eq!(config.filter_string(), "info,nanoclaw_ipc=trace");
    }

    #[test]
    fn test_default_format_is_pretty() {
        assert_eq!(LogConfig::new("info").format, LogFormat::Pretty);
    }
}
