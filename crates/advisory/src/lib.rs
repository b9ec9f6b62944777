// In crates/advisory/src/lib.rs

use async_trait::async_trait;
use core_types::{AdviceResult, CrossoverEvent, Symbol, Trend, UnavailableReason};
use rust_decimal::Decimal;
use signals::IndicatorSnapshot;

pub mod error;
pub mod gemini;

// Re-export public types
pub use error::{Error, Result};
pub use gemini::GeminiAdvisor;

/// Everything an advisor is told about one crossover.
#[derive(Debug, Clone, PartialEq)]
pub struct AdviceRequest {
    pub symbol: Symbol,
    pub price: Decimal,
    pub short_trend: Trend,
    pub long_trend: Trend,
    /// Latest close of the market volatility index, when it could be fetched.
    pub volatility_index: Option<f64>,
    pub event: CrossoverEvent,
}

/// Market-wide context gathered once per tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdviceContext {
    pub volatility_index: Option<f64>,
    pub event: CrossoverEvent,
}

impl AdviceRequest {
    pub fn new(
        symbol: &Symbol,
        short_term: &IndicatorSnapshot,
        long_term: &IndicatorSnapshot,
        context: AdviceContext,
    ) -> Self {
        Self {
            symbol: symbol.clone(),
            price: short_term.close,
            short_trend: short_term.trend,
            long_trend: long_term.trend,
            volatility_index: context.volatility_index,
            event: context.event,
        }
    }

    /// The prompt sent to text-completion advisors.
    pub fn prompt(&self) -> String {
        let volatility = self
            .volatility_index
            .map(|v| format!("{:.2}", v))
            .unwrap_or_else(|| "unknown".to_string());
        format!(
            "You are a day trader. Analyse {}: short-term trend {}, long-term trend {}, \
             volatility index {}, latest signal {}. \
             Reply with one piece of advice in at most 40 characters.",
            self.symbol, self.short_trend, self.long_trend, volatility, self.event
        )
    }
}

/// The universal interface for an advisory provider.
///
/// `get_advice` is a single bounded request with no retries. It never fails:
/// every transport, decoding or upstream problem comes back as
/// `AdviceResult::Unavailable`.
#[async_trait]
pub trait AdvisoryClient: Send + Sync {
    /// The name of the advisor.
    fn name(&self) -> &'static str;

    async fn get_advice(&self, request: &AdviceRequest) -> AdviceResult;
}

/// Stands in when no advisory provider is configured.
#[derive(Debug, Default, Clone)]
pub struct DisabledAdvisor;

#[async_trait]
impl AdvisoryClient for DisabledAdvisor {
    fn name(&self) -> &'static str {
        "Disabled"
    }

    async fn get_advice(&self, _request: &AdviceRequest) -> AdviceResult {
        AdviceResult::Unavailable(UnavailableReason::NotConfigured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use signals::EmaPair;

    fn snapshot(trend: Trend, close: i64) -> IndicatorSnapshot {
        IndicatorSnapshot {
            open_time: 0,
            close: Decimal::from(close),
            current: EmaPair::new(1.0, 1.0),
            previous: EmaPair::new(1.0, 1.0),
            volume: 0.0,
            volume_average: 0.0,
            trend,
            volume_spike: false,
            bar_count: 30,
        }
    }

    #[test]
    fn request_takes_price_from_short_horizon_and_trends_from_both() {
        let request = AdviceRequest::new(
            &Symbol("TSLA".into()),
            &snapshot(Trend::Bullish, 250),
            &snapshot(Trend::Bearish, 240),
            AdviceContext { volatility_index: Some(17.456), event: CrossoverEvent::BullishCross },
        );
        assert_eq!(request.price, Decimal::from(250));
        assert_eq!(request.short_trend, Trend::Bullish);
        assert_eq!(request.long_trend, Trend::Bearish);

        let prompt = request.prompt();
        assert!(prompt.contains("TSLA"));
        assert!(prompt.contains("short-term trend bullish"));
        assert!(prompt.contains("long-term trend bearish"));
        assert!(prompt.contains("volatility index 17.46"));
        assert!(prompt.contains("bullish_cross"));
        assert!(prompt.contains("40 characters"));
    }

    #[test]
    fn missing_volatility_is_reported_as_unknown() {
        let request = AdviceRequest::new(
            &Symbol("AAPL".into()),
            &snapshot(Trend::Bearish, 190),
            &snapshot(Trend::Bearish, 190),
            AdviceContext { volatility_index: None, event: CrossoverEvent::BearishCross },
        );
        assert!(request.prompt().contains("volatility index unknown"));
    }

    #[tokio::test]
    async fn disabled_advisor_reports_not_configured() {
        let request = AdviceRequest::new(
            &Symbol("AAPL".into()),
            &snapshot(Trend::Bullish, 190),
            &snapshot(Trend::Bullish, 190),
            AdviceContext { volatility_index: None, event: CrossoverEvent::BullishCross },
        );
        assert_eq!(
            DisabledAdvisor.get_advice(&request).await,
            AdviceResult::Unavailable(UnavailableReason::NotConfigured)
        );
    }
}
