//! Native log output: `RUST_LOG` filter, pretty or JSON lines on stderr

use tracing_subscriber::{fmt, EnvFilter};

/// Set to `1` for JSON log lines.
pub const LOG_JSON_ENV: &str = "WALLET_SELECTOR_LOG_JSON";
const DEFAULT_DIRECTIVE: &str = "info";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    pub fn from_env() -> Self {
        Self::parse(std::env::var(LOG_JSON_ENV).ok().as_deref())
    }

    fn parse(flag: Option<&str>) -> Self {
        match flag.map(str::trim) {
            Some("1") | Some("true") => LogFormat::Json,
            _ => LogFormat::Pretty,
        }
    }
}

pub fn init_logging() {
    init_logging_with(LogFormat::from_env());
}

/// Install the global subscriber. Later calls leave the first subscriber in place.
pub fn init_logging_with(format: LogFormat) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE));
    let builder = fmt::Subscriber::builder()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr);

    let _ = match format {
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Pretty => builder.pretty().try_init(),
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_only_when_flag_set() {
        assert_eq!(LogFormat::parse(Some("1")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some(" true")), LogFormat::Json);
        assert_eq!(LogFormat::parse(Some("0")), LogFormat::Pretty);
        assert_eq!(LogFormat::parse(None), LogFormat::Pretty);
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_logging_with(LogFormat::Pretty);
        init_logging_with(LogFormat::Json);
    }
}
