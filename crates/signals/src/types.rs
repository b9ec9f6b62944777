// In crates/signals/src/types.rs

use core_types::Trend;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IndicatorSettings {
    pub fast_period: usize,
    pub slow_period: usize,
    /// Width of the trailing window the volume average is taken over.
    pub volume_window: usize,
    /// A bar whose volume exceeds `volume_spike_ratio * average` is a spike.
    pub volume_spike_ratio: f64,
}

impl Default for IndicatorSettings {
    fn default() -> Self {
        Self {
            fast_period: 9,
            slow_period: 21,
            volume_window: 10,
            volume_spike_ratio: 1.5,
        }
    }
}

/// Fast and slow EMA values at one bar.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct EmaPair {
    pub fast: f64,
    pub slow: f64,
}

impl EmaPair {
    pub fn new(fast: f64, slow: f64) -> Self {
        Self { fast, slow }
    }

    /// Bullish only when the fast line is strictly above the slow line; a tie is bearish.
    pub fn trend(&self) -> Trend {
        if self.fast > self.slow {
            Trend::Bullish
        } else {
            Trend::Bearish
        }
    }
}

/// Indicator state of the latest bar of a series.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct IndicatorSnapshot {
    /// Open time of the latest bar, in milliseconds.
    pub open_time: i64,
    pub close: Decimal,
    /// EMAs at the latest bar.
    pub current: EmaPair,
    /// EMAs at the bar immediately before the latest one.
    pub previous: EmaPair,
    pub volume: f64,
    pub volume_average: f64,
    pub trend: Trend,
    pub volume_spike: bool,
    /// Number of bars the snapshot was computed from.
    pub bar_count: usize,
}
