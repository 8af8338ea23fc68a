//! Logging initialization.
//!
//! Logs always go to stderr; stdout carries the analysis output.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging subsystem at `level`, pretty or JSON.
///
/// The RUST_LOG environment variable overrides the level.
pub fn init(level: &str, json_format: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_writer(std::io::stderr)
                    .with_ansi(true),
            )
            .init();
    }
}

/// Initialize logging from the `[logging]` section with CLI overrides.
pub fn init_from_config(
    config: &chatbrain_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) {
    let (level, json_format) = resolve(config, verbose_override, json_logs_override);
    init(level, json_format);
}

fn resolve(
    config: &chatbrain_core::Config,
    verbose_override: bool,
    json_logs_override: bool,
) -> (&str, bool) {
    let level = if verbose_override {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    let json_format = json_logs_override || config.logging.format == "json";
    (level, json_format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verbose_overrides_level() {
        let mut config = chatbrain_core::Config::default();
        config.logging.level = "warn".to_string();
        assert_eq!(resolve(&config, false, false), ("warn", false));
        assert_eq!(resolve(&config, true, false), ("debug", false));
    }

    #[test]
    fn test_json_logs_from_config_or_flag() {
        let mut config = chatbrain_core::Config::default();
        assert!(resolve(&config, false, true).1);
        config.logging.format = "json".to_string();
        assert!(resolve(&config, false, false).1);
    }
}
