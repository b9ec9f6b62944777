// In crates/app-config/src/types.rs

use core_types::Symbol;
use serde::Deserialize;

use crate::{Error, Result};

#[derive(Deserialize, Debug, Clone)]
pub struct Settings {
    /// The application's general settings.
    #[serde(default)]
    pub app: AppSettings,
    /// What to watch and how to evaluate it.
    pub monitor: MonitorSettings,
    #[serde(default)]
    pub market_data: MarketDataSettings,
    #[serde(default)]
    pub advisory: AdvisorySettings,
    #[serde(default)]
    pub notification: NotificationSettings,
    #[serde(default)]
    pub server: ServerSettings,
}

impl Settings {
    /// Rejects settings the monitor cannot start with.
    ///
    /// Every failure here is fatal at session start; nothing is re-checked once
    /// the loop is running.
    pub fn validate(&self) -> Result<()> {
        let m = &self.monitor;
        if m.symbols()?.is_empty() {
            return Err(Error::Invalid("monitor.symbols must name at least one symbol".into()));
        }
        if m.fast_period == 0 {
            return Err(Error::Invalid("monitor.fast_period must be positive".into()));
        }
        if m.fast_period >= m.slow_period {
            return Err(Error::Invalid(format!(
                "monitor.fast_period ({}) must be smaller than monitor.slow_period ({})",
                m.fast_period, m.slow_period
            )));
        }
        if m.volume_window == 0 {
            return Err(Error::Invalid("monitor.volume_window must be positive".into()));
        }
        if m.poll_interval_secs == 0 {
            return Err(Error::Invalid("monitor.poll_interval_secs must be positive".into()));
        }
        if let SchedulePolicy::Backoff { max_interval_secs } = m.schedule {
            if max_interval_secs < m.poll_interval_secs {
                return Err(Error::Invalid(
                    "monitor.schedule.max_interval_secs must not be below poll_interval_secs".into(),
                ));
            }
        }
        for (key, secs) in [
            ("market_data.timeout_secs", self.market_data.timeout_secs),
            ("advisory.timeout_secs", self.advisory.timeout_secs),
            ("notification.timeout_secs", self.notification.timeout_secs),
        ] {
            if secs == 0 {
                return Err(Error::Invalid(format!("{key} must be positive")));
            }
        }
        if self.advisory.enabled && self.advisory.api_key.trim().is_empty() {
            return Err(Error::Invalid("advisory is enabled but advisory.api_key is missing".into()));
        }
        if self.notification.enabled
            && (self.notification.bot_token.trim().is_empty()
                || self.notification.chat_id.trim().is_empty())
        {
            return Err(Error::Invalid(
                "notification is enabled but notification.bot_token or notification.chat_id is missing"
                    .into(),
            ));
        }
        Ok(())
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AppSettings {
    /// The environment the application is running in (e.g., "development", "production").
    #[serde(default = "default_environment")]
    pub environment: String,
    /// The log level for the application.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            environment: default_environment(),
            log_level: default_log_level(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct MonitorSettings {
    /// Comma-separated symbol list, e.g. "AAPL, TSLA, 2330.TW".
    pub symbols: String,
    #[serde(default = "default_fast_period")]
    pub fast_period: u32,
    #[serde(default = "default_slow_period")]
    pub slow_period: u32,
    /// Width of the trailing volume average.
    #[serde(default = "default_volume_window")]
    pub volume_window: u32,
    /// Current volume above `ratio * average` counts as a spike.
    #[serde(default = "default_volume_spike_ratio")]
    pub volume_spike_ratio: f64,
    /// Bar interval of the horizon crossovers are detected on.
    #[serde(default = "default_short_interval")]
    pub short_interval: String,
    #[serde(default = "default_short_range")]
    pub short_range: String,
    /// Bar interval of the context horizon.
    #[serde(default = "default_long_interval")]
    pub long_interval: String,
    #[serde(default = "default_long_range")]
    pub long_range: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_cooldown")]
    pub cooldown_secs: u64,
    /// Symbol whose latest close is passed to the advisory as market volatility.
    /// An empty string disables the lookup.
    #[serde(default = "default_volatility_symbol")]
    pub volatility_symbol: String,
    #[serde(default)]
    pub schedule: SchedulePolicy,
    #[serde(default = "default_alert_history_size")]
    pub alert_history_size: usize,
}

impl MonitorSettings {
    /// The parsed, normalized symbol list.
    pub fn symbols(&self) -> Result<Vec<Symbol>> {
        Ok(Symbol::parse_list(&self.symbols)?)
    }

    pub fn volatility_symbol(&self) -> Option<Symbol> {
        Symbol::parse(&self.volatility_symbol).ok()
    }
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            symbols: String::new(),
            fast_period: default_fast_period(),
            slow_period: default_slow_period(),
            volume_window: default_volume_window(),
            volume_spike_ratio: default_volume_spike_ratio(),
            short_interval: default_short_interval(),
            short_range: default_short_range(),
            long_interval: default_long_interval(),
            long_range: default_long_range(),
            poll_interval_secs: default_poll_interval(),
            cooldown_secs: default_cooldown(),
            volatility_symbol: default_volatility_symbol(),
            schedule: SchedulePolicy::default(),
            alert_history_size: default_alert_history_size(),
        }
    }
}

/// How long the loop sleeps between ticks.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SchedulePolicy {
    /// Always sleep `poll_interval_secs`.
    #[default]
    Fixed,
    /// Double the delay after every tick in which no symbol could be fetched.
    Backoff { max_interval_secs: u64 },
}

#[derive(Deserialize, Debug, Clone)]
pub struct MarketDataSettings {
    #[serde(default = "default_market_data_url")]
    pub base_url: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for MarketDataSettings {
    fn default() -> Self {
        Self {
            base_url: default_market_data_url(),
            timeout_secs: default_http_timeout(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct AdvisorySettings {
    #[serde(default)]
    pub enabled: bool,
    /// The Gemini API key.
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_advisory_model")]
    pub model: String,
    #[serde(default = "default_advisory_url")]
    pub base_url: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_output_tokens")]
    pub max_output_tokens: u32,
    /// Advisory text longer than this is cut off.
    #[serde(default = "default_max_advice_chars")]
    pub max_advice_chars: usize,
}

impl Default for AdvisorySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: String::new(),
            model: default_advisory_model(),
            base_url: default_advisory_url(),
            timeout_secs: default_http_timeout(),
            max_output_tokens: default_max_output_tokens(),
            max_advice_chars: default_max_advice_chars(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct NotificationSettings {
    #[serde(default)]
    pub enabled: bool,
    /// The Telegram bot token.
    #[serde(default)]
    pub bot_token: String,
    /// The chat that receives alerts.
    #[serde(default)]
    pub chat_id: String,
    #[serde(default = "default_notification_url")]
    pub base_url: String,
    #[serde(default = "default_http_timeout")]
    pub timeout_secs: u64,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            bot_token: String::new(),
            chat_id: String::new(),
            base_url: default_notification_url(),
            timeout_secs: default_http_timeout(),
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ServerSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Helper functions for serde defaults
fn default_environment() -> String { "development".into() }
fn default_log_level() -> String { "info".into() }
fn default_fast_period() -> u32 { 9 }
fn default_slow_period() -> u32 { 21 }
fn default_volume_window() -> u32 { 10 }
fn default_volume_spike_ratio() -> f64 { 1.5 }
fn default_short_interval() -> String { "1m".into() }
fn default_short_range() -> String { "1d".into() }
fn default_long_interval() -> String { "15m".into() }
fn default_long_range() -> String { "5d".into() }
fn default_poll_interval() -> u64 { 60 }
fn default_cooldown() -> u64 { 600 }
fn default_volatility_symbol() -> String { "^VIX".into() }
fn default_alert_history_size() -> usize { 200 }
fn default_market_data_url() -> String { "https://query1.finance.yahoo.com".into() }
fn default_http_timeout() -> u64 { 10 }
fn default_advisory_model() -> String { "gemini-2.0-flash".into() }
fn default_advisory_url() -> String { "https://generativelanguage.googleapis.com".into() }
fn default_max_output_tokens() -> u32 { 64 }
fn default_max_advice_chars() -> usize { 200 }
fn default_notification_url() -> String { "https://api.telegram.org".into() }
fn default_host() -> String { "127.0.0.1".into() }
fn default_port() -> u16 { 8080 }
