//! Structured logging.
//!
//! Filter priority: explicit CLI value, then `RUST_LOG`, then the config
//! default. Text output for development, JSON for log aggregation.
//! Everything goes to stderr so command output on stdout stays parseable.

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

/// Pick the effective filter string.
pub fn resolve_filter(cli: Option<String>, env: Option<String>, default: &str) -> String {
    cli.or(env)
        .filter(|f| !f.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Install the global subscriber. Calling it twice is harmless.
pub fn init_logging(filter: &str, format: LogFormat) {
    let registry = tracing_subscriber::registry().with(EnvFilter::new(filter));

    let result = match format {
        LogFormat::Text => registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Json => registry
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_priority() {
        let default = "hello_mesh=info";
        assert_eq!(
            resolve_filter(Some("debug".into()), Some("warn".into()), default),
            "debug"
        );
        assert_eq!(resolve_filter(None, Some("warn".into()), default), "warn");
        assert_eq!(resolve_filter(None, None, default), default);
        assert_eq!(resolve_filter(Some(" ".into()), None, default), default);
    }
}
