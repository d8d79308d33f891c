use std::str::FromStr;

use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::settings::{LogFormat, LoggingConfig};
use crate::config::KitConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match *self {
            LogLevel::TRACE => "TRACE",
            LogLevel::DEBUG => "DEBUG",
            LogLevel::INFO => "INFO",
            LogLevel::WARN => "WARN",
            LogLevel::ERROR => "ERROR",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::TRACE),
            "debug" => Ok(LogLevel::DEBUG),
            "info" => Ok(LogLevel::INFO),
            "warn" => Ok(LogLevel::WARN),
            "error" => Ok(LogLevel::ERROR),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

/// Resolve the effective logging config; an explicit level wins over the file.
pub fn resolve(kit_config: &KitConfig, override_level: Option<LogLevel>) -> LoggingConfig {
    let configured = kit_config.logging.clone().unwrap_or_default();
    match override_level {
        Some(level) => LoggingConfig::new(level.as_str().to_lowercase(), configured.format),
        None => configured,
    }
}

pub fn run(kit_config: &KitConfig, override_level: Option<LogLevel>) {
    init_logging(&resolve(kit_config, override_level));
}

/// Initialize tracing with the desired config. Later calls are no-ops.
pub fn init_logging(cfg: &LoggingConfig) {
    let env_filter = EnvFilter::try_new(&cfg.level).unwrap_or_else(|_| EnvFilter::new("info"));

    // Base layer: filter + writer
    let registry = tracing_subscriber::registry().with(env_filter);

    // Choose format layer
    match cfg.format {
        LogFormat::Json => {
            let layer = fmt::layer()
                .json()
                .with_timer(UtcTime::rfc_3339())
                .flatten_event(true)
                .with_ansi(false);

            let _ = registry.with(layer).try_init();
        }
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_timer(UtcTime::rfc_3339())
                .with_ansi(true);

            let _ = registry.with(layer).try_init();
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::loader::parse_config;

    #[test]
    fn override_level_keeps_format() {
        let cfg = parse_config("logging:\n  level: warn\n  format: json\n").unwrap();
        let resolved = resolve(&cfg, Some(LogLevel::DEBUG));
        assert_eq!(resolved.level, "debug");
        assert_eq!(resolved.format, LogFormat::Json);
        assert_eq!(resolve(&cfg, None).level, "warn");
    }

    #[test]
    fn parses_level_names() {
        assert_eq!("Error".parse::<LogLevel>().unwrap(), LogLevel::ERROR);
        assert!("loud".parse::<LogLevel>().is_err());
    }

    #[test]
    fn init_is_idempotent() {
        init_logging(&LoggingConfig::default());
        init_logging(&LoggingConfig::new("debug".into(), LogFormat::Json));
    }
}
