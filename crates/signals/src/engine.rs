// In crates/signals/src/engine.rs

use crate::types::{EmaPair, IndicatorSettings, IndicatorSnapshot};
use crate::{Error, Result};
use core_types::PriceBar;
use num_traits::cast::ToPrimitive;
use rust_decimal::Decimal;
use ta::Next;
use ta::indicators::{ExponentialMovingAverage as Ema, SimpleMovingAverage as Sma};

/// Computes fast/slow EMAs, the trend label and the volume-spike flag for the
/// latest bar of a series.
///
/// The engine is stateless: every call replays the full series, so a snapshot
/// depends on nothing but the bars it is given.
#[derive(Debug, Clone)]
pub struct IndicatorEngine {
    settings: IndicatorSettings,
}

impl IndicatorEngine {
    /// Creates a new engine, rejecting periods that cannot produce a crossover.
    pub fn new(settings: IndicatorSettings) -> Result<Self> {
        if settings.fast_period == 0 {
            return Err(Error::InvalidParameters("fast period must be positive".into()));
        }
        if settings.fast_period >= settings.slow_period {
            return Err(Error::InvalidParameters(format!(
                "fast period ({}) must be smaller than slow period ({})",
                settings.fast_period, settings.slow_period
            )));
        }
        if settings.volume_window == 0 {
            return Err(Error::InvalidParameters("volume window must be positive".into()));
        }
        Ok(Self { settings })
    }

    /// The shortest series `evaluate` accepts.
    pub fn required_bars(&self) -> usize {
        self.settings.slow_period.max(2)
    }

    /// Produces the snapshot for the last bar of `bars`.
    ///
    /// Fails with `InsufficientData` when the series is shorter than the slow
    /// period (or shorter than two bars).
    pub fn evaluate(&self, bars: &[PriceBar]) -> Result<IndicatorSnapshot> {
        let required = self.required_bars();
        let Some(latest) = bars.last().filter(|_| bars.len() >= required) else {
            return Err(Error::InsufficientData {
                required,
                available: bars.len(),
            });
        };

        // 1. Replay the close series through both EMAs.
        let mut fast_ema = Ema::new(self.settings.fast_period)
            .map_err(|e| Error::InvalidParameters(format!("{:?}", e)))?;
        let mut slow_ema = Ema::new(self.settings.slow_period)
            .map_err(|e| Error::InvalidParameters(format!("{:?}", e)))?;

        let mut previous = EmaPair::new(0.0, 0.0);
        let mut current = EmaPair::new(0.0, 0.0);
        for bar in bars {
            let close = to_f64(bar.close, bar.open_time, "close")?;
            previous = current;
            current = EmaPair::new(fast_ema.next(close), slow_ema.next(close));
        }

        // 2. Average volume over the trailing window, or whatever is available.
        let window = self.settings.volume_window;
        let mut volume_sma = Sma::new(window)
            .map_err(|e| Error::InvalidParameters(format!("{:?}", e)))?;
        let mut volume_average = 0.0;
        for bar in &bars[bars.len().saturating_sub(window)..] {
            volume_average = volume_sma.next(to_f64(bar.volume, bar.open_time, "volume")?);
        }

        let volume = to_f64(latest.volume, latest.open_time, "volume")?;

        Ok(IndicatorSnapshot {
            open_time: latest.open_time,
            close: latest.close,
            current,
            previous,
            volume,
            volume_average,
            trend: current.trend(),
            volume_spike: volume > volume_average * self.settings.volume_spike_ratio,
            bar_count: bars.len(),
        })
    }
}

fn to_f64(value: Decimal, open_time: i64, field: &'static str) -> Result<f64> {
    value.to_f64().ok_or(Error::NonNumeric { open_time, field })
}
