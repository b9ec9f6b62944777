// In crates/app-config/src/lib.rs

use config::{Config, ConfigBuilder, Environment, File, FileFormat, builder::DefaultState};

pub mod error;
pub mod types;

// Re-export the most important types for easy access.
pub use error::{Error, Result};
pub use types::{
    AdvisorySettings, AppSettings, MarketDataSettings, MonitorSettings, NotificationSettings,
    SchedulePolicy, ServerSettings, Settings,
};

/// The base configuration file, relative to the working directory.
pub const DEFAULT_BASE_FILE: &str = "config/base";

/// Loads and validates the application settings.
///
/// This function orchestrates the layered configuration loading:
/// 1. Reads the base file (`config/base.toml` unless overridden).
/// 2. Merges settings from an environment-specific file next to it (e.g., `config/production.toml`).
/// 3. Merges settings from environment variables (e.g., `APP_ADVISORY__API_KEY=...`).
pub fn load_settings_from(base_file: &str) -> Result<Settings> {
    // Get the current environment. Default to "development" if not set.
    let environment = std::env::var("APP_ENVIRONMENT").unwrap_or_else(|_| "development".into());
    let env_file = std::path::Path::new(base_file)
        .with_file_name(&environment)
        .to_string_lossy()
        .into_owned();

    let builder = Config::builder()
        .add_source(File::with_name(base_file))
        .add_source(File::with_name(&env_file).required(false));

    finish(with_environment(builder))
}

/// Parses and validates settings from an in-memory TOML document.
///
/// Environment variables are not consulted.
pub fn parse_settings(toml: &str) -> Result<Settings> {
    finish(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
}

fn with_environment(builder: ConfigBuilder<DefaultState>) -> ConfigBuilder<DefaultState> {
    // The prefix is `APP`, separator is `__`.
    builder.add_source(
        Environment::with_prefix("APP")
            .prefix_separator("_")
            .separator("__")
            .try_parsing(true),
    )
}

fn finish(builder: ConfigBuilder<DefaultState>) -> Result<Settings> {
    let settings: Settings = builder.build()?.try_deserialize()?;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
        [monitor]
        symbols = " aapl, tsla "
    "#;

    #[test]
    fn minimal_file_gets_defaults() {
        let settings = parse_settings(MINIMAL).unwrap();
        let m = &settings.monitor;
        assert_eq!(m.fast_period, 9);
        assert_eq!(m.slow_period, 21);
        assert_eq!(m.volume_window, 10);
        assert_eq!(m.poll_interval_secs, 60);
        assert_eq!(m.cooldown_secs, 600);
        assert_eq!(m.short_interval, "1m");
        assert_eq!(m.long_interval, "15m");
        assert_eq!(m.schedule, SchedulePolicy::Fixed);
        assert!(!settings.advisory.enabled);
        assert!(!settings.notification.enabled);
        assert_eq!(settings.app.log_level, "info");

        let names: Vec<_> = m.symbols().unwrap().into_iter().map(|s| s.0).collect();
        assert_eq!(names, vec!["AAPL", "TSLA"]);
        assert_eq!(m.volatility_symbol().unwrap().0, "^VIX");
    }

    #[test]
    fn backoff_schedule_is_parsed() {
        let toml = r#"
            [monitor]
            symbols = "AAPL"
            poll_interval_secs = 30
            schedule = { kind = "backoff", max_interval_secs = 300 }
        "#;
        let settings = parse_settings(toml).unwrap();
        assert_eq!(
            settings.monitor.schedule,
            SchedulePolicy::Backoff { max_interval_secs: 300 }
        );
    }

    #[test]
    fn empty_symbol_list_is_rejected() {
        let err = parse_settings("[monitor]\nsymbols = \" , \"").unwrap_err();
        assert!(matches!(err, Error::Invalid(_)));
    }

    #[test]
    fn fast_period_must_be_below_slow_period() {
        let toml = "[monitor]\nsymbols = \"AAPL\"\nfast_period = 21\nslow_period = 21";
        assert!(matches!(parse_settings(toml), Err(Error::Invalid(_))));
    }

    #[test]
    fn enabled_advisory_requires_a_key() {
        let toml = "[monitor]\nsymbols = \"AAPL\"\n[advisory]\nenabled = true";
        let err = parse_settings(toml).unwrap_err();
        assert!(err.to_string().contains("advisory.api_key"));
    }

    #[test]
    fn enabled_notification_requires_token_and_chat() {
        let toml = "[monitor]\nsymbols = \"AAPL\"\n[notification]\nenabled = true\nbot_token = \"abc\"";
        let err = parse_settings(toml).unwrap_err();
        assert!(err.to_string().contains("chat_id"));
    }

    #[test]
    fn backoff_ceiling_below_poll_interval_is_rejected() {
        let toml = r#"
            [monitor]
            symbols = "AAPL"
            poll_interval_secs = 60
            schedule = { kind = "backoff", max_interval_secs = 10 }
        "#;
        assert!(matches!(parse_settings(toml), Err(Error::Invalid(_))));
    }

    #[test]
    fn zero_timeouts_are_rejected() {
        for section in ["market_data", "advisory", "notification"] {
            let toml = format!("[monitor]\nsymbols = \"AAPL\"\n[{section}]\ntimeout_secs = 0");
            let err = parse_settings(&toml).unwrap_err();
            assert!(matches!(err, Error::Invalid(_)));
            assert!(err.to_string().contains(&format!("{section}.timeout_secs")));
        }
    }

    #[test]
    fn missing_monitor_section_fails_to_load() {
        assert!(matches!(parse_settings("[app]\nlog_level = \"debug\""), Err(Error::LoadError(_))));
    }
}
