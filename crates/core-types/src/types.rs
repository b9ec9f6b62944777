// In crates/core-types/src/types.rs

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A ticker symbol as understood by the market data feed (e.g., "AAPL", "2330.TW").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(pub String);

impl Symbol {
    /// Normalizes free text into a symbol: trimmed and upper-cased.
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(Error::EmptySymbol);
        }
        if trimmed.chars().any(char::is_whitespace) {
            return Err(Error::InvalidSymbol(trimmed.to_string()));
        }
        Ok(Symbol(trimmed.to_uppercase()))
    }

    /// Parses a comma-separated symbol list.
    ///
    /// Empty entries are ignored and duplicates keep their first position, so
    /// `" aapl, tsla,,AAPL "` becomes `[AAPL, TSLA]`.
    pub fn parse_list(raw: &str) -> Result<Vec<Symbol>> {
        let mut symbols: Vec<Symbol> = Vec::new();
        for part in raw.split(',') {
            if part.trim().is_empty() {
                continue;
            }
            let symbol = Symbol::parse(part)?;
            if !symbols.contains(&symbol) {
                symbols.push(symbol);
            }
        }
        Ok(symbols)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A single OHLCV bar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    /// Bar open time in milliseconds since the Unix epoch.
    pub open_time: i64,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

/// Trend classification of the latest bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Bullish,
    Bearish,
}

impl fmt::Display for Trend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trend::Bullish => f.write_str("bullish"),
            Trend::Bearish => f.write_str("bearish"),
        }
    }
}

/// The discrete event produced by comparing the last two fast/slow EMA orderings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CrossoverEvent {
    None,
    BullishCross,
    BearishCross,
}

impl CrossoverEvent {
    pub fn is_cross(&self) -> bool {
        !matches!(self, CrossoverEvent::None)
    }
}

impl fmt::Display for CrossoverEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CrossoverEvent::None => f.write_str("none"),
            CrossoverEvent::BullishCross => f.write_str("bullish_cross"),
            CrossoverEvent::BearishCross => f.write_str("bearish_cross"),
        }
    }
}

/// Why an advisory could not be produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    Timeout,
    TransportError,
    UpstreamError,
    RateLimited,
    /// No advisory provider is configured for this session.
    NotConfigured,
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            UnavailableReason::Timeout => "timeout",
            UnavailableReason::TransportError => "transport_error",
            UnavailableReason::UpstreamError => "upstream_error",
            UnavailableReason::RateLimited => "rate_limited",
            UnavailableReason::NotConfigured => "not_configured",
        };
        f.write_str(label)
    }
}

/// The outcome of an advisory call. Never an error: failures are folded into `Unavailable`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum AdviceResult {
    Advice(String),
    Unavailable(UnavailableReason),
}

impl AdviceResult {
    /// The advisory text, if any.
    pub fn text(&self) -> Option<&str> {
        match self {
            AdviceResult::Advice(text) => Some(text),
            AdviceResult::Unavailable(_) => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryOutcome {
    Sent,
    Suppressed,
    Failed,
}

/// An immutable record of one dispatched alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub symbol: Symbol,
    pub event: CrossoverEvent,
    pub price: Decimal,
    pub short_trend: Trend,
    pub long_trend: Trend,
    pub timestamp: DateTime<Utc>,
    pub advice: Option<String>,
    pub outcome: DeliveryOutcome,
}
