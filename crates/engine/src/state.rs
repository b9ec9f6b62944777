// In crates/engine/src/state.rs

use crate::cooldown::CooldownState;
use chrono::{DateTime, Utc};
use core_types::{AlertRecord, Symbol};
use events::SnapshotUpdate;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Where the monitor loop currently is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorPhase {
    Idle,
    Fetching,
    Evaluating,
    Dispatching,
    Sleeping,
}

/// The latest successful advisory text of a symbol.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CachedAdvice {
    pub text: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusView {
    pub phase: MonitorPhase,
    pub symbols: Vec<Symbol>,
    pub last_tick: Option<DateTime<Utc>>,
    pub alert_count: usize,
}

#[derive(Debug)]
struct Inner {
    phase: MonitorPhase,
    last_tick: Option<DateTime<Utc>>,
    alerts: VecDeque<AlertRecord>,
    snapshots: BTreeMap<Symbol, SnapshotUpdate>,
    advice: BTreeMap<Symbol, CachedAdvice>,
}

/// Everything one monitoring session knows, owned by the session and shared
/// read-only with the presentation layer. Nothing here outlives the process.
#[derive(Debug)]
pub struct MonitorState {
    symbols: Vec<Symbol>,
    history_size: usize,
    cooldown: CooldownState,
    inner: RwLock<Inner>,
}

impl MonitorState {
    pub fn new(symbols: Vec<Symbol>, history_size: usize) -> Self {
        Self {
            symbols,
            history_size,
            cooldown: CooldownState::new(),
            inner: RwLock::new(Inner {
                phase: MonitorPhase::Idle,
                last_tick: None,
                alerts: VecDeque::with_capacity(history_size),
                snapshots: BTreeMap::new(),
                advice: BTreeMap::new(),
            }),
        }
    }

    pub fn cooldown(&self) -> &CooldownState {
        &self.cooldown
    }

    pub fn phase(&self) -> MonitorPhase {
        self.read().phase
    }

    pub fn set_phase(&self, phase: MonitorPhase) {
        let mut inner = self.write();
        if inner.phase != phase {
            tracing::debug!(from = ?inner.phase, to = ?phase, "Monitor phase transition.");
            inner.phase = phase;
        }
    }

    pub fn last_tick(&self) -> Option<DateTime<Utc>> {
        self.read().last_tick
    }

    pub fn record_tick(&self, at: DateTime<Utc>) {
        self.write().last_tick = Some(at);
    }

    /// Appends to the bounded history, evicting the oldest record when full.
    pub fn push_alert(&self, record: AlertRecord) {
        if self.history_size == 0 {
            return;
        }
        let mut inner = self.write();
        while inner.alerts.len() >= self.history_size {
            inner.alerts.pop_front();
        }
        inner.alerts.push_back(record);
    }

    /// One page of the alert history, newest first, plus the total record count.
    /// Pages are 1-based.
    pub fn alerts_page(&self, page: usize, page_size: usize) -> (Vec<AlertRecord>, usize) {
        let inner = self.read();
        let total = inner.alerts.len();
        let skip = page.saturating_sub(1).saturating_mul(page_size);
        let items = inner.alerts.iter().rev().skip(skip).take(page_size).cloned().collect();
        (items, total)
    }

    pub fn set_snapshot(&self, update: SnapshotUpdate) {
        self.write().snapshots.insert(update.symbol.clone(), update);
    }

    pub fn snapshots(&self) -> Vec<SnapshotUpdate> {
        self.read().snapshots.values().cloned().collect()
    }

    pub fn cache_advice(&self, symbol: &Symbol, text: &str, at: DateTime<Utc>) {
        self.write().advice.insert(
            symbol.clone(),
            CachedAdvice {
                text: text.to_string(),
                at,
            },
        );
    }

    pub fn advice(&self) -> BTreeMap<Symbol, CachedAdvice> {
        self.read().advice.clone()
    }

    pub fn status(&self) -> StatusView {
        let inner = self.read();
        StatusView {
            phase: inner.phase,
            symbols: self.symbols.clone(),
            last_tick: inner.last_tick,
            alert_count: inner.alerts.len(),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Inner> {
        self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Inner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_types::{CrossoverEvent, DeliveryOutcome, Trend};
    use rust_decimal_macros::dec;

    fn record(symbol: &str, secs: i64) -> AlertRecord {
        AlertRecord {
            symbol: Symbol(symbol.into()),
            event: CrossoverEvent::BearishCross,
            price: dec!(100),
            short_trend: Trend::Bearish,
            long_trend: Trend::Bearish,
            timestamp: DateTime::from_timestamp(secs, 0).unwrap(),
            advice: None,
            outcome: DeliveryOutcome::Sent,
        }
    }

    #[test]
    fn history_is_bounded_and_paged_newest_first() {
        let state = MonitorState::new(vec![Symbol("AAPL".into())], 3);
        for secs in 1..=5 {
            state.push_alert(record("AAPL", secs));
        }

        let (page, total) = state.alerts_page(1, 2);
        assert_eq!(total, 3);
        let times: Vec<_> = page.iter().map(|r| r.timestamp.timestamp()).collect();
        assert_eq!(times, vec![5, 4]);

        let (page, _) = state.alerts_page(2, 2);
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].timestamp.timestamp(), 3);

        let (page, _) = state.alerts_page(3, 2);
        assert!(page.is_empty());
    }

    #[test]
    fn page_zero_is_treated_as_the_first_page() {
        let state = MonitorState::new(Vec::new(), 10);
        state.push_alert(record("TSLA", 1));
        assert_eq!(state.alerts_page(0, 10).0.len(), 1);
    }

    #[test]
    fn status_reflects_phase_and_tick() {
        let state = MonitorState::new(vec![Symbol("AAPL".into())], 10);
        assert_eq!(state.status().phase, MonitorPhase::Idle);

        let at = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        state.set_phase(MonitorPhase::Sleeping);
        state.record_tick(at);
        state.cache_advice(&Symbol("AAPL".into()), "Hold.", at);

        let status = state.status();
        assert_eq!(status.phase, MonitorPhase::Sleeping);
        assert_eq!(status.last_tick, Some(at));
        assert_eq!(state.advice()[&Symbol("AAPL".into())].text, "Hold.");
    }
}
