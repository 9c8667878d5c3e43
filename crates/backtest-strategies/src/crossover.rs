//! Moving average crossover signals.
//!
//! Long when the fast SMA crosses above the slow SMA, short when it
//! crosses below. Averages within [`LEVEL_TOLERANCE`] of each other count as
//! level. Before both averages are ready the pair counts as level, so the
//! first ready bar signals whenever the averages differ.
//!
//! [`LEVEL_TOLERANCE`]: crate::signal::LEVEL_TOLERANCE

use std::cmp::Ordering;
use std::collections::BTreeMap;

use backtest_core::traits::StreamingIndicator;
use backtest_core::types::{Bar, Direction, PriceSource};
use backtest_indicators::StreamingSma;

use crate::signal::{compare_levels, cross_direction, Signal};

/// Streaming SMA crossover detector.
#[derive(Debug, Clone)]
pub struct CrossoverSignals {
    source: PriceSource,
    fast: StreamingSma,
    slow: StreamingSma,
    prev: Option<(f64, f64)>,
    current: Option<(f64, f64)>,
}

impl CrossoverSignals {
    /// Create a new detector. Periods must be non-zero.
    pub fn new(fast_period: usize, slow_period: usize, source: PriceSource) -> Self {
        Self {
            source,
            fast: StreamingSma::new(fast_period),
            slow: StreamingSma::new(slow_period),
            prev: None,
            current: None,
        }
    }

    /// Feed one bar and report a crossover on it.
    pub fn update(&mut self, bar: &Bar) -> Option<Signal> {
        let price = bar.price(self.source);
        let fast = self.fast.update(price);
        let slow = self.slow.update(price);

        self.prev = self.current;
        self.current = fast.zip(slow);

        let (fast, slow) = self.current?;
        let before = self.prev.map_or(Ordering::Equal, |(prev_fast, prev_slow)| {
            compare_levels(prev_fast, prev_slow)
        });

        let direction = cross_direction(before, compare_levels(fast, slow))?;
        let reason = match direction {
            Direction::Long => format!(
                "Bullish crossover: fast SMA ({:.2}) crossed above slow SMA ({:.2})",
                fast, slow
            ),
            Direction::Short => format!(
                "Bearish crossover: fast SMA ({:.2}) crossed below slow SMA ({:.2})",
                fast, slow
            ),
        };
        Some(Signal::new(direction, reason))
    }

    /// Write the ready averages into `out`.
    pub fn record_indicators(&self, out: &mut BTreeMap<String, f64>) {
        if let Some(fast) = self.fast.current() {
            out.insert("sma_fast".to_string(), fast);
        }
        if let Some(slow) = self.slow.current() {
            out.insert("sma_slow".to_string(), slow);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(closes: &[f64]) -> Vec<Bar> {
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| Bar::new(i as i64 * 60_000, c, c, c, c, 1.0))
            .collect()
    }

    fn signals(closes: &[f64], fast: usize, slow: usize) -> Vec<Option<Direction>> {
        let mut detector = CrossoverSignals::new(fast, slow, PriceSource::Close);
        bars(closes)
            .iter()
            .map(|bar| detector.update(bar).map(|s| s.direction))
            .collect()
    }

    #[test]
    fn test_bullish_then_bearish() {
        // Level, then up, then down
        let closes = [8.0, 8.0, 8.0, 8.0, 8.0, 10.0, 12.0, 11.0, 8.0, 5.0];
        let out = signals(&closes, 2, 3);

        let longs: Vec<usize> = out
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == Some(Direction::Long))
            .map(|(i, _)| i)
            .collect();
        let shorts: Vec<usize> = out
            .iter()
            .enumerate()
            .filter(|(_, s)| **s == Some(Direction::Short))
            .map(|(i, _)| i)
            .collect();

        assert_eq!(longs, vec![5]);
        assert_eq!(shorts, vec![8]);
    }

    #[test]
    fn test_no_signal_before_warmup() {
        let closes = [1.0, 5.0, 1.0, 5.0];
        let out = signals(&closes, 2, 4);
        // Both averages are 3.0 on the first ready bar
        assert!(out.iter().all(|s| s.is_none()));
    }

    #[test]
    fn test_first_ready_bar_signals_when_averages_differ() {
        let closes: Vec<f64> = (0..30).map(|i| 100.0 + i as f64).collect();
        let out = signals(&closes, 5, 20);

        assert_eq!(out[19], Some(Direction::Long));
        assert_eq!(out.iter().filter(|s| s.is_some()).count(), 1);
    }

    #[test]
    fn test_flat_series_never_crosses() {
        let out = signals(&[100.0; 50], 5, 20);
        assert!(out.iter().all(|s| s.is_none()));
    }

    #[test]
    fn test_flat_series_at_inexact_prices_never_crosses() {
        for price in [0.1, 0.3, 0.07, 1.1, 123.45, 27_345.67] {
            let out = signals(&[price; 200], 5, 20);
            assert!(
                out.iter().all(|s| s.is_none()),
                "flat series at {} produced a signal",
                price
            );
        }
    }

    #[test]
    fn test_record_indicators() {
        let mut detector = CrossoverSignals::new(2, 3, PriceSource::Close);
        let mut map = BTreeMap::new();
        for bar in bars(&[1.0, 2.0]) {
            detector.update(&bar);
        }
        detector.record_indicators(&mut map);
        assert_eq!(map.get("sma_fast"), Some(&1.5));
        assert!(!map.contains_key("sma_slow"));
    }
}
