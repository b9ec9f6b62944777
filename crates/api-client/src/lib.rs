// In crates/api-client/src/lib.rs

use app_config::MarketDataSettings;
use async_trait::async_trait;
use core_types::{PriceBar, Symbol};
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::time::Duration;

pub mod error;
pub mod types;

// Re-export public types
pub use error::{Error, Result};
pub use types::*;

/// The market data collaborator the monitor polls.
///
/// Implementations must return an empty series, not an error, for symbols the
/// upstream knows nothing about.
#[async_trait]
pub trait MarketDataFeed: Send + Sync {
    /// The name of the feed, for logs.
    fn name(&self) -> &'static str;

    /// Fetches the bars of `symbol` at `interval` over the trailing `range`
    /// (e.g. interval "1m", range "1d"), oldest first.
    async fn fetch(&self, symbol: &Symbol, interval: &str, range: &str) -> Result<Vec<PriceBar>>;
}

impl ApiClient {
    /// Constructs a new ApiClient from MarketDataSettings.
    pub fn new(settings: &MarketDataSettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            // The chart endpoint throttles requests without a browser-like agent.
            .user_agent("Mozilla/5.0 (X11; Linux x86_64) trendwatch/0.1")
            .build()
            .map_err(|e| Error::ClientBuildError(e.to_string()))?;

        Ok(ApiClient {
            http_client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Fetches chart bars.
    ///
    /// This corresponds to the `GET /v8/finance/chart/{symbol}` endpoint.
    pub async fn get_chart(&self, symbol: &Symbol, interval: &str, range: &str) -> Result<Vec<PriceBar>> {
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol.0);

        let response = self
            .http_client
            .get(&url)
            .query(&[("interval", interval), ("range", range), ("includePrePost", "false")])
            .send()
            .await
            .map_err(Error::RequestFailed)?;

        let status = response.status();
        let body = response.text().await.map_err(Error::RequestFailed)?;

        let bars = parse_chart_response(status.as_u16(), &body)?;
        tracing::debug!(symbol = %symbol, interval, range, count = bars.len(), "Fetched chart bars.");
        Ok(bars)
    }
}

#[async_trait]
impl MarketDataFeed for ApiClient {
    fn name(&self) -> &'static str {
        "YahooChart"
    }

    async fn fetch(&self, symbol: &Symbol, interval: &str, range: &str) -> Result<Vec<PriceBar>> {
        self.get_chart(symbol, interval, range).await
    }
}

/// Interprets a chart response body into an ordered bar series.
///
/// The chart API reports errors inside the body (often with a 4xx status), so the
/// body is inspected before the status. An unknown symbol is an empty series.
pub fn parse_chart_response(status: u16, body: &str) -> Result<Vec<PriceBar>> {
    let envelope: ChartEnvelope = match serde_json::from_str(body) {
        Ok(envelope) => envelope,
        Err(_) if !(200..300).contains(&status) => return Err(Error::HttpStatus(status)),
        Err(e) => return Err(Error::DeserializationFailed(e)),
    };

    if let Some(error) = envelope.chart.error {
        if error.code.eq_ignore_ascii_case("Not Found") {
            return Ok(Vec::new());
        }
        return Err(Error::ApiError {
            code: error.code,
            msg: error.description.unwrap_or_default(),
        });
    }

    let Some(result) = envelope.chart.result.and_then(|r| r.into_iter().next()) else {
        return Ok(Vec::new());
    };

    Ok(normalize_bars(&result))
}

/// Zips the column arrays into bars.
///
/// Bars missing any OHLC value are dropped and a missing volume counts as zero.
/// A bar whose time is out of range or does not move strictly forward is discarded.
fn normalize_bars(result: &ChartResult) -> Vec<PriceBar> {
    let empty = Quote::default();
    let quote = result.indicators.quote.first().unwrap_or(&empty);
    let at = |column: &[Option<f64>], i: usize| column.get(i).copied().flatten();

    let mut bars: Vec<PriceBar> = Vec::with_capacity(result.timestamp.len());
    for (i, &ts) in result.timestamp.iter().enumerate() {
        let (Some(open), Some(high), Some(low), Some(close)) = (
            at(&quote.open, i).and_then(Decimal::from_f64),
            at(&quote.high, i).and_then(Decimal::from_f64),
            at(&quote.low, i).and_then(Decimal::from_f64),
            at(&quote.close, i).and_then(Decimal::from_f64),
        ) else {
            continue;
        };
        let volume = at(&quote.volume, i)
            .and_then(Decimal::from_f64)
            .unwrap_or(Decimal::ZERO);

        let Some(open_time) = ts.checked_mul(1000) else {
            continue;
        };
        if bars.last().is_some_and(|last| last.open_time >= open_time) {
            continue;
        }

        bars.push(PriceBar { open_time, open, high, low, close, volume });
    }
    bars
}

// Free function to allow api_client::new usage
pub fn new(settings: &MarketDataSettings) -> Result<ApiClient> {
    ApiClient::new(settings)
}
