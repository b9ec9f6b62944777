// In crates/engine/src/monitor.rs

use crate::cooldown::CooldownGate;
use crate::dispatcher::{AlertDispatcher, AlertSignal};
use crate::error::{Error, Horizon, Result};
use crate::state::{MonitorPhase, MonitorState};
use advisory::{AdviceContext, AdviceRequest, AdvisoryClient};
use api_client::MarketDataFeed;
use app_config::{MonitorSettings, SchedulePolicy};
use chrono::{DateTime, Utc};
use core_types::{AdviceResult, AlertRecord, CrossoverEvent, PriceBar, Symbol};
use events::{EventSender, MonitorEvent, SnapshotUpdate, SuppressedAlert, TickSummary};
use notification::Notifier;
use rust_decimal::prelude::ToPrimitive;
use signals::{CrossoverDetector, IndicatorEngine, IndicatorSettings};
use std::sync::Arc;
use std::time::Duration;

/// A bar series request: interval and trailing range, e.g. "1m" over "1d".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HorizonSpec {
    pub interval: String,
    pub range: String,
}

/// Session parameters, fixed for the lifetime of the loop.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub symbols: Vec<Symbol>,
    pub indicators: IndicatorSettings,
    pub short_horizon: HorizonSpec,
    pub long_horizon: HorizonSpec,
    pub volatility_symbol: Option<Symbol>,
    pub poll_interval: Duration,
    pub cooldown_secs: u64,
    pub schedule: SchedulePolicy,
}

impl MonitorConfig {
    pub fn from_settings(settings: &MonitorSettings) -> Result<Self> {
        Ok(Self {
            symbols: settings.symbols()?,
            indicators: IndicatorSettings {
                fast_period: settings.fast_period as usize,
                slow_period: settings.slow_period as usize,
                volume_window: settings.volume_window as usize,
                volume_spike_ratio: settings.volume_spike_ratio,
            },
            short_horizon: HorizonSpec {
                interval: settings.short_interval.clone(),
                range: settings.short_range.clone(),
            },
            long_horizon: HorizonSpec {
                interval: settings.long_interval.clone(),
                range: settings.long_range.clone(),
            },
            volatility_symbol: settings.volatility_symbol(),
            poll_interval: Duration::from_secs(settings.poll_interval_secs),
            cooldown_secs: settings.cooldown_secs,
            schedule: settings.schedule,
        })
    }
}

/// The external collaborators a loop talks to.
pub struct Collaborators {
    pub feed: Arc<dyn MarketDataFeed>,
    pub advisor: Arc<dyn AdvisoryClient>,
    pub notifier: Arc<dyn Notifier>,
    /// Where the notifier delivers (e.g. a chat id).
    pub destination: String,
}

/// Why a symbol produced no alert this tick.
#[derive(Debug)]
pub struct SkippedSymbol {
    pub symbol: Symbol,
    pub error: Error,
}

/// What one tick did, symbol by symbol.
#[derive(Debug)]
pub struct TickReport {
    pub tick_time: DateTime<Utc>,
    pub alerts: Vec<AlertRecord>,
    pub suppressed: Vec<SuppressedAlert>,
    pub skipped: Vec<SkippedSymbol>,
    /// Symbols whose bars were fetched on both horizons.
    pub fetched: usize,
}

impl TickReport {
    fn new(tick_time: DateTime<Utc>) -> Self {
        Self {
            tick_time,
            alerts: Vec::new(),
            suppressed: Vec::new(),
            skipped: Vec::new(),
            fetched: 0,
        }
    }

    /// True when at least one symbol was attempted and none could be fetched.
    pub fn all_fetches_failed(&self) -> bool {
        self.fetched == 0 && self.skipped.iter().any(|s| s.error.is_fetch_failure())
    }

    fn summary(&self) -> TickSummary {
        TickSummary {
            at: self.tick_time,
            alerts: self.alerts.len(),
            suppressed: self.suppressed.len(),
            skipped: self.skipped.len(),
        }
    }
}

enum SymbolOutcome {
    Quiet,
    Alert(AlertRecord),
    Suppressed(SuppressedAlert),
}

/// The tick-driven pipeline: fetch, evaluate, gate, advise, dispatch, sleep.
pub struct MonitorLoop {
    config: MonitorConfig,
    engine: IndicatorEngine,
    feed: Arc<dyn MarketDataFeed>,
    advisor: Arc<dyn AdvisoryClient>,
    dispatcher: AlertDispatcher,
    gate: CooldownGate,
    state: Arc<MonitorState>,
    events: EventSender,
}

impl MonitorLoop {
    pub fn new(
        config: MonitorConfig,
        collaborators: Collaborators,
        state: Arc<MonitorState>,
        events: EventSender,
    ) -> Result<Self> {
        let engine = IndicatorEngine::new(config.indicators.clone())
            .map_err(|e| Error::ConfigurationInvalid(e.to_string()))?;
        let gate = CooldownGate::new(state.cooldown().clone());
        let dispatcher = AlertDispatcher::new(
            collaborators.notifier,
            collaborators.destination,
            gate.clone(),
        );

        Ok(Self {
            config,
            engine,
            feed: collaborators.feed,
            advisor: collaborators.advisor,
            dispatcher,
            gate,
            state,
            events,
        })
    }

    /// Runs ticks forever, sleeping between them per the schedule policy.
    pub async fn run(&self) {
        tracing::info!(
            symbols = self.config.symbols.len(),
            feed = self.feed.name(),
            advisor = self.advisor.name(),
            notifier = self.dispatcher.notifier_name(),
            "Starting monitor loop."
        );

        let mut consecutive_failed_ticks: u32 = 0;
        loop {
            let report = self.run_tick(Utc::now()).await;

            if report.all_fetches_failed() {
                consecutive_failed_ticks = consecutive_failed_ticks.saturating_add(1);
            } else {
                consecutive_failed_ticks = 0;
            }

            let delay = next_delay(
                self.config.poll_interval,
                consecutive_failed_ticks,
                &self.config.schedule,
            );
            tracing::debug!(delay_secs = delay.as_secs(), "Sleeping until next tick.");
            tokio::time::sleep(delay).await;
        }
    }

    /// Evaluates every configured symbol once. Per-symbol failures end up in
    /// the report's `skipped` list and never stop the remaining symbols.
    pub async fn run_tick(&self, now: DateTime<Utc>) -> TickReport {
        tracing::info!(tick = %now, symbols = self.config.symbols.len(), "Tick started.");
        let mut report = TickReport::new(now);

        self.state.set_phase(MonitorPhase::Fetching);
        let volatility_index = self.fetch_volatility_index().await;

        for symbol in &self.config.symbols {
            match self.process_symbol(symbol, now, volatility_index).await {
                Ok(outcome) => {
                    report.fetched += 1;
                    match outcome {
                        SymbolOutcome::Quiet => {}
                        SymbolOutcome::Alert(record) => report.alerts.push(record),
                        SymbolOutcome::Suppressed(suppressed) => report.suppressed.push(suppressed),
                    }
                }
                Err(error) => {
                    match &error {
                        Error::InsufficientData { .. } => {
                            tracing::info!(symbol = %symbol, reason = %error, "Skipping symbol: no signal yet.");
                        }
                        Error::FetchUnavailable { .. } => {
                            tracing::warn!(symbol = %symbol, error = %error, "Skipping symbol: market data unavailable.");
                        }
                        _ => {
                            tracing::warn!(symbol = %symbol, error = %error, "Skipping symbol.");
                        }
                    }
                    if !error.is_fetch_failure() {
                        report.fetched += 1;
                    }
                    report.skipped.push(SkippedSymbol {
                        symbol: symbol.clone(),
                        error,
                    });
                }
            }
        }

        self.state.record_tick(now);
        self.state.set_phase(MonitorPhase::Sleeping);
        let _ = self.events.send(MonitorEvent::Tick(report.summary()));

        tracing::info!(
            alerts = report.alerts.len(),
            suppressed = report.suppressed.len(),
            skipped = report.skipped.len(),
            "Tick finished."
        );
        report
    }

    /// Fetches and evaluates one symbol on both horizons without recording
    /// anything in the session state. Backs the one-shot `check` command.
    pub async fn evaluate_symbol(&self, symbol: &Symbol, now: DateTime<Utc>) -> Result<SnapshotUpdate> {
        let (short_bars, long_bars) = self.fetch_horizons(symbol).await?;
        self.evaluate_bars(symbol, &short_bars, &long_bars, now)
    }

    fn evaluate_bars(
        &self,
        symbol: &Symbol,
        short_bars: &[PriceBar],
        long_bars: &[PriceBar],
        now: DateTime<Utc>,
    ) -> Result<SnapshotUpdate> {
        let short_term = self
            .engine
            .evaluate(short_bars)
            .map_err(|e| Error::from_indicator(Horizon::Short, e))?;
        let long_term = self
            .engine
            .evaluate(long_bars)
            .map_err(|e| Error::from_indicator(Horizon::Long, e))?;

        // Only the short horizon produces events; the long one is context.
        let event = CrossoverDetector::detect_latest(&short_term);

        Ok(SnapshotUpdate {
            symbol: symbol.clone(),
            short_term,
            long_term,
            event,
            evaluated_at: now,
        })
    }

    async fn process_symbol(
        &self,
        symbol: &Symbol,
        now: DateTime<Utc>,
        volatility_index: Option<f64>,
    ) -> Result<SymbolOutcome> {
        self.state.set_phase(MonitorPhase::Fetching);
        let (short_bars, long_bars) = self.fetch_horizons(symbol).await?;

        self.state.set_phase(MonitorPhase::Evaluating);
        let update = self.evaluate_bars(symbol, &short_bars, &long_bars, now)?;
        let event = update.event;

        self.state.set_snapshot(update.clone());
        let _ = self.events.send(MonitorEvent::Snapshot(Box::new(update.clone())));

        if !event.is_cross() {
            return Ok(SymbolOutcome::Quiet);
        }

        if !self.gate.should_dispatch(symbol, now, self.config.cooldown_secs) {
            let suppressed = SuppressedAlert {
                symbol: symbol.clone(),
                event,
                at: now,
                last_dispatch: self.state.cooldown().last_dispatch(symbol),
            };
            tracing::info!(symbol = %symbol, %event, "Crossover suppressed by cooldown.");
            let _ = self.events.send(MonitorEvent::Suppressed(suppressed.clone()));
            return Ok(SymbolOutcome::Suppressed(suppressed));
        }

        self.state.set_phase(MonitorPhase::Dispatching);
        let record = self.advise_and_dispatch(&update, event, now, volatility_index).await;

        self.state.push_alert(record.clone());
        let _ = self.events.send(MonitorEvent::Alert(record.clone()));
        Ok(SymbolOutcome::Alert(record))
    }

    async fn advise_and_dispatch(
        &self,
        update: &SnapshotUpdate,
        event: CrossoverEvent,
        now: DateTime<Utc>,
        volatility_index: Option<f64>,
    ) -> AlertRecord {
        let request = AdviceRequest::new(
            &update.symbol,
            &update.short_term,
            &update.long_term,
            AdviceContext {
                volatility_index,
                event,
            },
        );
        let advice = self.advisor.get_advice(&request).await;

        match &advice {
            AdviceResult::Advice(text) => self.state.cache_advice(&update.symbol, text, now),
            AdviceResult::Unavailable(reason) => {
                let error = Error::AdvisoryUnavailable { reason: *reason };
                tracing::warn!(symbol = %update.symbol, error = %error, "Dispatching without advice.");
            }
        }

        let signal = AlertSignal {
            symbol: update.symbol.clone(),
            event,
            price: update.short_term.close,
            short_trend: update.short_term.trend,
            long_trend: update.long_term.trend,
        };
        self.dispatcher.dispatch(&signal, &advice, now).await
    }

    async fn fetch_horizons(&self, symbol: &Symbol) -> Result<(Vec<PriceBar>, Vec<PriceBar>)> {
        let short_bars = self.fetch(symbol, Horizon::Short).await?;
        let long_bars = self.fetch(symbol, Horizon::Long).await?;
        Ok((short_bars, long_bars))
    }

    async fn fetch(&self, symbol: &Symbol, horizon: Horizon) -> Result<Vec<PriceBar>> {
        let spec = match horizon {
            Horizon::Short => &self.config.short_horizon,
            Horizon::Long => &self.config.long_horizon,
        };
        self.feed
            .fetch(symbol, &spec.interval, &spec.range)
            .await
            .map_err(|source| Error::FetchUnavailable { horizon, source })
    }

    /// Latest close of the volatility symbol, or `None` when it cannot be had.
    async fn fetch_volatility_index(&self) -> Option<f64> {
        let symbol = self.config.volatility_symbol.as_ref()?;
        match self.fetch(symbol, Horizon::Short).await {
            Ok(bars) => {
                let value = bars.last().and_then(|bar| bar.close.to_f64());
                if value.is_none() {
                    tracing::warn!(symbol = %symbol, "Volatility index has no bars.");
                }
                value
            }
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Volatility index unavailable.");
                None
            }
        }
    }
}

/// The pause before the next tick.
///
/// `Fixed` always waits `base`. `Backoff` doubles `base` for every consecutive
/// tick in which no symbol could be fetched, capped at its maximum.
pub fn next_delay(base: Duration, consecutive_failed_ticks: u32, policy: &SchedulePolicy) -> Duration {
    match policy {
        SchedulePolicy::Fixed => base,
        SchedulePolicy::Backoff { max_interval_secs } => {
            let max = Duration::from_secs(*max_interval_secs).max(base);
            let factor = 1u32.checked_shl(consecutive_failed_ticks).unwrap_or(u32::MAX);
            base.checked_mul(factor).unwrap_or(max).min(max)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_schedule_ignores_failures() {
        let base = Duration::from_secs(60);
        assert_eq!(next_delay(base, 0, &SchedulePolicy::Fixed), base);
        assert_eq!(next_delay(base, 7, &SchedulePolicy::Fixed), base);
    }

    #[test]
    fn backoff_doubles_up_to_the_cap() {
        let base = Duration::from_secs(60);
        let policy = SchedulePolicy::Backoff { max_interval_secs: 600 };
        let delays: Vec<_> = (0..6).map(|n| next_delay(base, n, &policy).as_secs()).collect();
        assert_eq!(delays, vec![60, 120, 240, 480, 600, 600]);
        assert_eq!(next_delay(base, u32::MAX, &policy).as_secs(), 600);
    }

    #[test]
    fn config_is_built_from_settings() {
        let settings = MonitorSettings {
            symbols: " aapl, tsla ".into(),
            volatility_symbol: String::new(),
            ..MonitorSettings::default()
        };
        let config = MonitorConfig::from_settings(&settings).unwrap();
        assert_eq!(config.symbols, vec![Symbol("AAPL".into()), Symbol("TSLA".into())]);
        assert_eq!(config.indicators.fast_period, 9);
        assert_eq!(config.indicators.slow_period, 21);
        assert_eq!(config.short_horizon.interval, "1m");
        assert_eq!(config.long_horizon.range, "5d");
        assert_eq!(config.volatility_symbol, None);
        assert_eq!(config.poll_interval, Duration::from_secs(60));
        assert_eq!(config.cooldown_secs, 600);
    }
}
