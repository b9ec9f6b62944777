// In crates/engine/src/cooldown.rs

use chrono::{DateTime, Utc};
use core_types::Symbol;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// What the gate remembers about one symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownRecord {
    pub last_alert: DateTime<Utc>,
    /// Dispatches recorded this session.
    pub dispatches: u32,
}

/// Last-alert time per symbol, shared by every handle cloned from it.
///
/// Lives as long as the monitoring session. A single lock around the whole map
/// keeps each read-then-write on one symbol untorn.
#[derive(Debug, Clone, Default)]
pub struct CooldownState {
    records: Arc<Mutex<HashMap<Symbol, CooldownRecord>>>,
}

impl CooldownState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_dispatch(&self, symbol: &Symbol) -> Option<DateTime<Utc>> {
        self.lock().get(symbol).map(|r| r.last_alert)
    }

    /// Zero for a symbol that has never been dispatched.
    pub fn dispatch_count(&self, symbol: &Symbol) -> u32 {
        self.lock().get(symbol).map_or(0, |r| r.dispatches)
    }

    /// A copy of the whole map, sorted by symbol.
    pub fn entries(&self) -> Vec<(Symbol, CooldownRecord)> {
        let mut entries: Vec<_> = self.lock().iter().map(|(s, r)| (s.clone(), *r)).collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    fn record(&self, symbol: &Symbol, now: DateTime<Utc>) {
        let mut records = self.lock();
        let dispatches = records.get(symbol).map_or(0, |r| r.dispatches);
        records.insert(
            symbol.clone(),
            CooldownRecord { last_alert: now, dispatches: dispatches.saturating_add(1) },
        );
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<Symbol, CooldownRecord>> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Decides whether a detected crossover may be dispatched.
#[derive(Debug, Clone)]
pub struct CooldownGate {
    state: CooldownState,
}

impl CooldownGate {
    pub fn new(state: CooldownState) -> Self {
        Self { state }
    }

    /// True when `symbol` has never alerted, or at least `window_secs` have
    /// elapsed since its last alert. The boundary is inclusive. Never mutates.
    pub fn should_dispatch(&self, symbol: &Symbol, now: DateTime<Utc>, window_secs: u64) -> bool {
        let Some(last) = self.state.last_dispatch(symbol) else {
            return true;
        };
        let window_ms = i64::try_from(window_secs)
            .unwrap_or(i64::MAX)
            .saturating_mul(1000);
        (now - last).num_milliseconds() >= window_ms
    }

    pub fn record_dispatch(&self, symbol: &Symbol, now: DateTime<Utc>) {
        self.state.record(symbol, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeDelta;

    fn t0() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn unknown_symbol_may_dispatch() {
        let gate = CooldownGate::new(CooldownState::new());
        assert!(gate.should_dispatch(&Symbol("AAPL".into()), t0(), 600));
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let gate = CooldownGate::new(CooldownState::new());
        let sym = Symbol("AAPL".into());
        gate.record_dispatch(&sym, t0());

        assert!(!gate.should_dispatch(&sym, t0(), 600));
        assert!(!gate.should_dispatch(&sym, t0() + TimeDelta::seconds(599), 600));
        assert!(!gate.should_dispatch(&sym, t0() + TimeDelta::milliseconds(599_999), 600));
        assert!(gate.should_dispatch(&sym, t0() + TimeDelta::seconds(600), 600));
        assert!(gate.should_dispatch(&sym, t0() + TimeDelta::seconds(3600), 600));
    }

    #[test]
    fn symbols_cool_down_independently() {
        let gate = CooldownGate::new(CooldownState::new());
        let aapl = Symbol("AAPL".into());
        let tsla = Symbol("TSLA".into());
        gate.record_dispatch(&aapl, t0());

        assert!(!gate.should_dispatch(&aapl, t0() + TimeDelta::seconds(10), 600));
        assert!(gate.should_dispatch(&tsla, t0() + TimeDelta::seconds(10), 600));
    }

    #[test]
    fn zero_window_never_blocks() {
        let gate = CooldownGate::new(CooldownState::new());
        let sym = Symbol("AAPL".into());
        gate.record_dispatch(&sym, t0());
        assert!(gate.should_dispatch(&sym, t0(), 0));
    }

    #[test]
    fn clones_share_the_same_map() {
        let state = CooldownState::new();
        let gate = CooldownGate::new(state.clone());
        gate.record_dispatch(&Symbol("MSFT".into()), t0());

        assert_eq!(state.last_dispatch(&Symbol("MSFT".into())), Some(t0()));
        assert_eq!(state.entries().len(), 1);
    }

    #[test]
    fn each_record_counts_one_dispatch() {
        let state = CooldownState::new();
        let gate = CooldownGate::new(state.clone());
        let sym = Symbol("AAPL".into());
        assert_eq!(state.dispatch_count(&sym), 0);

        gate.record_dispatch(&sym, t0());
        gate.record_dispatch(&sym, t0() + TimeDelta::seconds(700));

        assert_eq!(state.dispatch_count(&sym), 2);
        assert_eq!(
            state.entries(),
            vec![(
                sym,
                CooldownRecord { last_alert: t0() + TimeDelta::seconds(700), dispatches: 2 }
            )]
        );
    }
}
