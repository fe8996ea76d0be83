use std::sync::Once;

use tracing_subscriber::prelude::*;

/// Tracing target for agent lifecycle and session events.
pub const AGENT_TARGET: &str = "jolt.agent";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// A simple level (`debug`, `warn`, ...) or a full `EnvFilter` directive.
    pub level: String,
}

impl LoggingConfig {
    /// Agent failures stay quiet unless the user asked for `debug`.
    pub fn for_debug(debug: bool) -> Self {
        Self {
            level: if debug { "debug" } else { "warn" }.to_string(),
        }
    }

    fn normalize_level_directives(input: &str) -> String {
        let trimmed = input.trim();
        match trimmed.to_ascii_lowercase().as_str() {
            "" => "warn".to_string(),
            "warning" => "warn".to_string(),
            "trace" | "debug" | "info" | "warn" | "error" | "off" => trimmed.to_ascii_lowercase(),
            _ => trimmed.to_string(),
        }
    }

    /// The effective filter: the configured level merged with `RUST_LOG`.
    pub fn env_filter(&self) -> tracing_subscriber::EnvFilter {
        let config_directives = Self::normalize_level_directives(&self.level);
        let fallback = || {
            tracing_subscriber::EnvFilter::try_new(&config_directives).unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::default()
                    .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
            })
        };

        match std::env::var("RUST_LOG")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
        {
            Some(env_directives) => {
                tracing_subscriber::EnvFilter::try_new(format!("{config_directives},{env_directives}"))
                    .unwrap_or_else(|_| fallback())
            }
            None => fallback(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self::for_debug(false)
    }
}

static TRACING_INIT: Once = Once::new();

/// Installs the agent's stderr subscriber.
///
/// Safe to call repeatedly; only the first call does anything. If the host
/// process already installed a global subscriber, that one is kept and agent
/// events flow into it.
pub fn init_tracing(config: &LoggingConfig) {
    TRACING_INIT.call_once(|| {
        let filter = config.env_filter();
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false);

        let subscriber = tracing_subscriber::registry().with(filter).with(layer);
        if tracing::subscriber::set_global_default(subscriber).is_err() {
            tracing::debug!(
                target: AGENT_TARGET,
                "global subscriber already installed; agent logs go to the host subscriber"
            );
        }
    });
}
