// In app/src/tracing_layer.rs

use chrono::Utc;
use events::{EventSender, MonitorEvent, ReplayCache, WsLogMessage};
use std::fmt::Write;
use tracing::{Event, Level, Subscriber};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::Targets;

/// The filter shared by every output layer: `level` by default, HTTP internals capped at WARN.
pub fn log_filter(level: Level) -> Targets {
    Targets::new()
        .with_target("hyper_util", Level::WARN)
        .with_target("reqwest", Level::WARN)
        .with_default(level)
}

/// Mirrors every log event into the WebSocket broadcast channel and its replay cache.
pub struct WsBroadcastLayer {
    tx: EventSender,
    cache: ReplayCache,
}

impl WsBroadcastLayer {
    pub fn new(tx: EventSender, cache: ReplayCache) -> Self {
        Self { tx, cache }
    }
}

impl<S> Layer<S> for WsBroadcastLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = LogMessageVisitor::default();
        event.record(&mut visitor);

        let msg = MonitorEvent::Log(WsLogMessage {
            timestamp: Utc::now(),
            level: event.metadata().level().to_string(),
            message: visitor.finish(),
        });
        // Send to live clients
        let _ = self.tx.send(msg.clone());
        // Also add to the replay cache
        self.cache.push(msg);
    }
}

/// Captures the `message` field and renders the remaining fields as `key=value`.
#[derive(Default)]
struct LogMessageVisitor {
    message: String,
    fields: String,
}

impl LogMessageVisitor {
    fn finish(self) -> String {
        if self.fields.is_empty() {
            self.message
        } else {
            format!("{}{}", self.message, self.fields)
        }
    }
}

impl tracing::field::Visit for LogMessageVisitor {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            let _ = write!(self.fields, " {}={}", field.name(), value);
        }
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            let _ = write!(self.fields, " {}={:?}", field.name(), value);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_subscriber::prelude::*;

    #[test]
    fn log_events_reach_the_cache_with_their_fields() {
        let tx = events::channel();
        let cache = ReplayCache::new(10);
        let subscriber = tracing_subscriber::registry()
            .with(WsBroadcastLayer::new(tx, cache.clone()).with_filter(log_filter(Level::INFO)));

        tracing::subscriber::with_default(subscriber, || {
            tracing::warn!(symbol = "AAPL", skipped = 2, "Skipping symbol.");
        });

        let cached = cache.snapshot();
        assert_eq!(cached.len(), 1);
        match &cached[0] {
            MonitorEvent::Log(log) => {
                assert_eq!(log.level, "WARN");
                assert_eq!(log.message, "Skipping symbol. symbol=AAPL skipped=2");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn broadcast_honours_the_configured_level() {
        let tx = events::channel();
        let cache = ReplayCache::new(10);
        let subscriber = tracing_subscriber::registry()
            .with(WsBroadcastLayer::new(tx, cache.clone()).with_filter(log_filter(Level::WARN)));

        tracing::subscriber::with_default(subscriber, || {
            tracing::trace!(target: "hyper_util::client", "pooling idle connection");
            tracing::debug!("Monitor phase transition.");
            tracing::info!("Tick started.");
            tracing::warn!(target: "reqwest::connect", "slow handshake");
            tracing::error!("Alert delivery failed.");
        });

        let levels: Vec<_> = cache
            .snapshot()
            .into_iter()
            .map(|event| match event {
                MonitorEvent::Log(log) => log.level,
                other => panic!("unexpected event: {other:?}"),
            })
            .collect();
        assert_eq!(levels, vec!["WARN", "ERROR"]);
    }
}
