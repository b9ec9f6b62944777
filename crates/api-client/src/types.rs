// In crates/api-client/src/types.rs

use reqwest::Client;
use serde::Deserialize;

/// The client for the Yahoo Finance chart API.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// The persistent HTTP client, built with the request timeout.
    pub http_client: Client,
    /// The base URL of the chart API (e.g., "https://query1.finance.yahoo.com").
    pub base_url: String,
}

/// Top-level body of `GET /v8/finance/chart/{symbol}`.
#[derive(Debug, Deserialize)]
pub struct ChartEnvelope {
    pub chart: Chart,
}

/// Either `result` or `error` is populated, never both.
#[derive(Debug, Deserialize)]
pub struct Chart {
    pub result: Option<Vec<ChartResult>>,
    pub error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
pub struct ChartError {
    /// e.g. "Not Found", "Bad Request".
    pub code: String,
    pub description: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChartResult {
    /// Bar open times in seconds. Absent when the range holds no trades.
    #[serde(default)]
    pub timestamp: Vec<i64>,
    pub indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
pub struct ChartIndicators {
    #[serde(default)]
    pub quote: Vec<Quote>,
}

/// Column-oriented OHLCV arrays. Any element may be `null` for bars without trades.
#[derive(Debug, Deserialize, Default)]
pub struct Quote {
    #[serde(default)]
    pub open: Vec<Option<f64>>,
    #[serde(default)]
    pub high: Vec<Option<f64>>,
    #[serde(default)]
    pub low: Vec<Option<f64>>,
    #[serde(default)]
    pub close: Vec<Option<f64>>,
    #[serde(default)]
    pub volume: Vec<Option<f64>>,
}
