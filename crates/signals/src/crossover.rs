// In crates/signals/src/crossover.rs

use crate::types::{EmaPair, IndicatorSnapshot};
use core_types::CrossoverEvent;

/// Turns two consecutive fast/slow EMA orderings into a discrete event.
///
/// The previous sample is compared with `<=`/`>=` and the current one strictly,
/// so an event fires exactly on the bar where the ordering strictly flips and
/// a sustained ordering reports `None`.
#[derive(Debug, Default, Clone, Copy)]
pub struct CrossoverDetector;

impl CrossoverDetector {
    pub fn detect(previous: &EmaPair, current: &EmaPair) -> CrossoverEvent {
        if previous.fast <= previous.slow && current.fast > current.slow {
            // Fast line just crossed above the slow line.
            CrossoverEvent::BullishCross
        } else if previous.fast >= previous.slow && current.fast < current.slow {
            // Fast line just crossed below the slow line.
            CrossoverEvent::BearishCross
        } else {
            CrossoverEvent::None
        }
    }

    /// Compares the latest bar of a snapshot with the bar before it.
    pub fn detect_latest(snapshot: &IndicatorSnapshot) -> CrossoverEvent {
        Self::detect(&snapshot.previous, &snapshot.current)
    }

    /// Compares the latest bars of two snapshots taken on consecutive bars.
    pub fn between(previous: &IndicatorSnapshot, current: &IndicatorSnapshot) -> CrossoverEvent {
        Self::detect(&previous.current, &current.current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{IndicatorEngine, IndicatorSettings};
    use core_types::PriceBar;
    use rust_decimal::Decimal;

    fn pair(fast: f64, slow: f64) -> EmaPair {
        EmaPair::new(fast, slow)
    }

    #[test]
    fn flip_upwards_is_bullish() {
        assert_eq!(
            CrossoverDetector::detect(&pair(9.0, 10.0), &pair(10.5, 10.0)),
            CrossoverEvent::BullishCross
        );
        // Touching on the previous bar still counts.
        assert_eq!(
            CrossoverDetector::detect(&pair(10.0, 10.0), &pair(10.5, 10.0)),
            CrossoverEvent::BullishCross
        );
    }

    #[test]
    fn flip_downwards_is_bearish() {
        assert_eq!(
            CrossoverDetector::detect(&pair(11.0, 10.0), &pair(9.5, 10.0)),
            CrossoverEvent::BearishCross
        );
        assert_eq!(
            CrossoverDetector::detect(&pair(10.0, 10.0), &pair(9.5, 10.0)),
            CrossoverEvent::BearishCross
        );
    }

    #[test]
    fn sustained_ordering_is_none() {
        assert_eq!(
            CrossoverDetector::detect(&pair(11.0, 10.0), &pair(12.0, 10.0)),
            CrossoverEvent::None
        );
        assert_eq!(
            CrossoverDetector::detect(&pair(9.0, 10.0), &pair(8.0, 10.0)),
            CrossoverEvent::None
        );
        // Landing on a tie is not a strict flip.
        assert_eq!(
            CrossoverDetector::detect(&pair(9.0, 10.0), &pair(10.0, 10.0)),
            CrossoverEvent::None
        );
    }

    #[test]
    fn single_flip_in_a_series_is_reported_once_at_its_index() {
        // 40 falling closes followed by 40 rising closes: the fast EMA crosses
        // the slow EMA exactly once on the way up.
        let mut closes: Vec<i64> = (0..40).map(|i| 200 - i * 2).collect();
        closes.extend((1..=40).map(|i| 122 + i * 3));
        let bars: Vec<PriceBar> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| {
                let close = Decimal::from(c);
                PriceBar {
                    open_time: i as i64 * 60_000,
                    open: close,
                    high: close,
                    low: close,
                    close,
                    volume: Decimal::from(1_000),
                }
            })
            .collect();

        let engine = IndicatorEngine::new(IndicatorSettings {
            fast_period: 5,
            slow_period: 13,
            ..IndicatorSettings::default()
        })
        .unwrap();

        // Locate the flip independently of the detector.
        let ema = |period: usize| {
            let k = 2.0 / (period as f64 + 1.0);
            let mut out: Vec<f64> = Vec::new();
            for &c in &closes {
                let next = out.last().map_or(c as f64, |prev| c as f64 * k + prev * (1.0 - k));
                out.push(next);
            }
            out
        };
        let (fast, slow) = (ema(5), ema(13));
        let flip = (1..closes.len())
            .find(|&i| fast[i - 1] <= slow[i - 1] && fast[i] > slow[i])
            .unwrap();
        assert!(flip >= engine.required_bars());

        let mut previous: Option<IndicatorSnapshot> = None;
        for end in engine.required_bars()..=bars.len() {
            let snapshot = engine.evaluate(&bars[..end]).unwrap();
            let index = end - 1;
            let expected = if index == flip {
                CrossoverEvent::BullishCross
            } else {
                CrossoverEvent::None
            };
            assert_eq!(CrossoverDetector::detect_latest(&snapshot), expected, "index {index}");
            if let Some(prev) = &previous {
                assert_eq!(CrossoverDetector::between(prev, &snapshot), expected, "index {index}");
            }
            previous = Some(snapshot);
        }
    }
}
