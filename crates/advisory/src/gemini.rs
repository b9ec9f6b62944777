// In crates/advisory/src/gemini.rs

use crate::{AdviceRequest, AdvisoryClient, Error, Result};
use app_config::AdvisorySettings;
use async_trait::async_trait;
use core_types::{AdviceResult, UnavailableReason};
use serde_json::{Value, json};
use std::time::Duration;

/// An advisor backed by the Gemini `generateContent` REST endpoint.
#[derive(Debug, Clone)]
pub struct GeminiAdvisor {
    /// The persistent HTTP client, built with the request timeout.
    http_client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_output_tokens: u32,
    max_advice_chars: usize,
}

impl GeminiAdvisor {
    pub fn new(settings: &AdvisorySettings) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| Error::ClientBuildError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            max_output_tokens: settings.max_output_tokens,
            max_advice_chars: settings.max_advice_chars,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1beta/models/{}:generateContent", self.base_url, self.model)
    }
}

#[async_trait]
impl AdvisoryClient for GeminiAdvisor {
    fn name(&self) -> &'static str {
        "Gemini"
    }

    async fn get_advice(&self, request: &AdviceRequest) -> AdviceResult {
        let body = json!({
            "contents": [{ "parts": [{ "text": request.prompt() }] }],
            "generationConfig": { "maxOutputTokens": self.max_output_tokens },
        });

        let response = match self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(e) => {
                tracing::warn!(symbol = %request.symbol, error = %e, "Advisory request failed.");
                return AdviceResult::Unavailable(classify_transport_error(&e));
            }
        };

        let status = response.status().as_u16();
        let text = match response.text().await {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(symbol = %request.symbol, error = %e, "Failed to read advisory response.");
                return AdviceResult::Unavailable(classify_transport_error(&e));
            }
        };

        let result = interpret_response(status, &text, self.max_advice_chars);
        if let AdviceResult::Unavailable(reason) = &result {
            tracing::warn!(symbol = %request.symbol, status, %reason, "Advisory unavailable.");
        }
        result
    }
}

fn classify_transport_error(error: &reqwest::Error) -> UnavailableReason {
    if error.is_timeout() {
        UnavailableReason::Timeout
    } else {
        UnavailableReason::TransportError
    }
}

/// Maps a `generateContent` response onto an `AdviceResult`.
///
/// HTTP 429 means rate limiting. Otherwise a top-level `error` field wins over
/// everything else, so an API that is reachable but rejects the request is
/// never mistaken for advice.
pub fn interpret_response(status: u16, body: &str, max_chars: usize) -> AdviceResult {
    if status == 429 {
        return AdviceResult::Unavailable(UnavailableReason::RateLimited);
    }

    let Ok(value) = serde_json::from_str::<Value>(body) else {
        return AdviceResult::Unavailable(UnavailableReason::UpstreamError);
    };

    if value.get("error").is_some_and(|e| !e.is_null()) {
        return AdviceResult::Unavailable(UnavailableReason::UpstreamError);
    }
    if !(200..300).contains(&status) {
        return AdviceResult::Unavailable(UnavailableReason::UpstreamError);
    }

    let text: String = value
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .map(|parts| parts.iter().filter_map(|p| p.get("text").and_then(Value::as_str)).collect())
        .unwrap_or_default();

    let text = text.trim();
    if text.is_empty() {
        return AdviceResult::Unavailable(UnavailableReason::UpstreamError);
    }
    AdviceResult::Advice(truncate_chars(text, max_chars))
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => text[..cut].trim_end().to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{CrossoverEvent, Symbol, Trend};
    use rust_decimal::Decimal;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    const ADVICE: &str = r#"{"candidates":[{"content":{"parts":[{"text":"  Momentum turning up, "},{"text":"scale in slowly. "}],"role":"model"},"finishReason":"STOP"}]}"#;

    fn request() -> AdviceRequest {
        AdviceRequest {
            symbol: Symbol("AAPL".into()),
            price: Decimal::from(190),
            short_trend: Trend::Bullish,
            long_trend: Trend::Bearish,
            volatility_index: Some(15.2),
            event: CrossoverEvent::BullishCross,
        }
    }

    fn advisor(base_url: String, timeout_secs: u64) -> GeminiAdvisor {
        GeminiAdvisor::new(&AdvisorySettings {
            enabled: true,
            api_key: "test-key".into(),
            base_url,
            timeout_secs,
            ..AdvisorySettings::default()
        })
        .unwrap()
    }

    /// Serves exactly one HTTP response on a loopback port and returns its base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|l| {
                            let (name, value) = l.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
                if n == 0 {
                    break;
                }
            }
            let response = format!(
                "{status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
        });
        format!("http://{addr}")
    }

    #[test]
    fn candidate_parts_are_joined_and_trimmed() {
        assert_eq!(
            interpret_response(200, ADVICE, 200),
            AdviceResult::Advice("Momentum turning up, scale in slowly.".into())
        );
    }

    #[test]
    fn long_advice_is_capped() {
        assert_eq!(
            interpret_response(200, ADVICE, 8),
            AdviceResult::Advice("Momentum".into())
        );
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Überkauft, abwarten"}]}}]}"#;
        assert_eq!(interpret_response(200, body, 4), AdviceResult::Advice("Über".into()));
    }

    #[test]
    fn error_field_never_surfaces_as_advice() {
        let rejected = r#"{"error":{"code":400,"message":"API key not valid.","status":"INVALID_ARGUMENT"}}"#;
        let mixed = r#"{"error":{"code":500,"message":"internal"},"candidates":[{"content":{"parts":[{"text":"buy"}]}}]}"#;
        for (status, body) in [(400, rejected), (200, rejected), (200, mixed), (500, mixed)] {
            assert_eq!(
                interpret_response(status, body, 200),
                AdviceResult::Unavailable(UnavailableReason::UpstreamError),
                "status {status}"
            );
        }
    }

    #[test]
    fn too_many_requests_is_rate_limited() {
        let body = r#"{"error":{"code":429,"message":"Resource has been exhausted","status":"RESOURCE_EXHAUSTED"}}"#;
        assert_eq!(
            interpret_response(429, body, 200),
            AdviceResult::Unavailable(UnavailableReason::RateLimited)
        );
    }

    #[test]
    fn malformed_or_empty_responses_are_upstream_errors() {
        for body in ["not json", "{}", r#"{"candidates":[]}"#, r#"{"candidates":[{"content":{"parts":[{"text":"   "}]}}]}"#] {
            assert_eq!(
                interpret_response(200, body, 200),
                AdviceResult::Unavailable(UnavailableReason::UpstreamError),
                "body {body}"
            );
        }
        assert_eq!(
            interpret_response(503, "Service Unavailable", 200),
            AdviceResult::Unavailable(UnavailableReason::UpstreamError)
        );
    }

    #[tokio::test]
    async fn successful_round_trip_returns_advice() {
        let base_url = serve_once("HTTP/1.1 200 OK", ADVICE).await;
        let result = advisor(base_url, 5).get_advice(&request()).await;
        assert_eq!(result, AdviceResult::Advice("Momentum turning up, scale in slowly.".into()));
    }

    #[tokio::test]
    async fn reachable_api_that_rejects_the_request_is_upstream_error() {
        let body = r#"{"error":{"code":403,"message":"Permission denied","status":"PERMISSION_DENIED"}}"#;
        let base_url = serve_once("HTTP/1.1 403 Forbidden", body).await;
        let result = advisor(base_url, 5).get_advice(&request()).await;
        assert_eq!(result, AdviceResult::Unavailable(UnavailableReason::UpstreamError));
    }

    #[tokio::test]
    async fn silent_upstream_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (socket, _) = listener.accept().await.unwrap();
            tokio::time::sleep(Duration::from_secs(30)).await;
            drop(socket);
        });

        let result = advisor(format!("http://{addr}"), 1).get_advice(&request()).await;
        assert_eq!(result, AdviceResult::Unavailable(UnavailableReason::Timeout));
    }

    #[tokio::test]
    async fn unreachable_upstream_is_a_transport_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let result = advisor(format!("http://{addr}"), 2).get_advice(&request()).await;
        assert_eq!(result, AdviceResult::Unavailable(UnavailableReason::TransportError));
    }
}
