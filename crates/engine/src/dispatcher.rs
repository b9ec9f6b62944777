// In crates/engine/src/dispatcher.rs

use crate::cooldown::CooldownGate;
use crate::error::Error;
use chrono::{DateTime, Utc};
use core_types::{AdviceResult, AlertRecord, CrossoverEvent, DeliveryOutcome, Symbol, Trend};
use notification::Notifier;
use rust_decimal::Decimal;
use std::sync::Arc;

/// The signal half of an alert: what was detected, where, and at what price.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertSignal {
    pub symbol: Symbol,
    pub event: CrossoverEvent,
    pub price: Decimal,
    pub short_trend: Trend,
    pub long_trend: Trend,
}

/// Composes alert messages and hands them to the notification transport.
pub struct AlertDispatcher {
    notifier: Arc<dyn Notifier>,
    destination: String,
    gate: CooldownGate,
}

impl AlertDispatcher {
    pub fn new(notifier: Arc<dyn Notifier>, destination: String, gate: CooldownGate) -> Self {
        Self {
            notifier,
            destination,
            gate,
        }
    }

    pub fn notifier_name(&self) -> &'static str {
        self.notifier.name()
    }

    /// Sends one alert and records the dispatch with the cooldown gate.
    ///
    /// Transport failures are logged and folded into `DeliveryOutcome::Failed`;
    /// the cooldown is recorded exactly once whatever the transport did.
    pub async fn dispatch(
        &self,
        signal: &AlertSignal,
        advice: &AdviceResult,
        now: DateTime<Utc>,
    ) -> AlertRecord {
        let message = compose_message(signal, advice);

        let outcome = match self.notifier.send(&self.destination, &message).await {
            Ok(()) if self.notifier.delivers() => DeliveryOutcome::Sent,
            Ok(()) => DeliveryOutcome::Suppressed,
            Err(e) => {
                let error = Error::NotificationFailed(e);
                tracing::error!(
                    symbol = %signal.symbol,
                    transport = self.notifier.name(),
                    error = %error,
                    "Alert delivery failed."
                );
                DeliveryOutcome::Failed
            }
        };

        self.gate.record_dispatch(&signal.symbol, now);
        tracing::info!(symbol = %signal.symbol, event = %signal.event, ?outcome, "Alert dispatched.");

        AlertRecord {
            symbol: signal.symbol.clone(),
            event: signal.event,
            price: signal.price,
            short_trend: signal.short_trend,
            long_trend: signal.long_trend,
            timestamp: now,
            advice: advice.text().map(str::to_string),
            outcome,
        }
    }
}

/// The human-readable alert text.
pub fn compose_message(signal: &AlertSignal, advice: &AdviceResult) -> String {
    let headline = match signal.event {
        CrossoverEvent::BullishCross => "Bullish crossover",
        CrossoverEvent::BearishCross => "Bearish crossover",
        CrossoverEvent::None => "No crossover",
    };
    let advice_line = match advice {
        AdviceResult::Advice(text) => text.clone(),
        AdviceResult::Unavailable(reason) => format!("(advice unavailable: {reason})"),
    };
    format!(
        "{headline} on {}\nPrice: {}\nShort-term trend: {}\nLong-term trend: {}\nAdvice: {advice_line}",
        signal.symbol,
        signal.price.normalize(),
        signal.short_trend,
        signal.long_trend,
    )
}
