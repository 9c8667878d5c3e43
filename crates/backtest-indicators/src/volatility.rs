//! Volatility indicators.

use backtest_core::traits::{BarIndicator, StreamingIndicator};
use backtest_core::types::Bar;

/// Wilder's running moving average (RMA).
///
/// Seeded with the SMA of the first `period` inputs, then
/// `rma = (rma * (period - 1) + x) / period`.
#[derive(Debug, Clone)]
pub struct Rma {
    period: usize,
    count: usize,
    sum: f64,
    current: Option<f64>,
}

impl Rma {
    /// Create a new RMA.
    ///
    /// # Panics
    /// If `period` is zero.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self {
            period,
            count: 0,
            sum: 0.0,
            current: None,
        }
    }
}

impl StreamingIndicator for Rma {
    type Output = f64;

    fn update(&mut self, value: f64) -> Option<f64> {
        let period_f64 = self.period as f64;
        self.count += 1;

        self.current = match self.current {
            Some(prev) => Some((prev * (period_f64 - 1.0) + value) / period_f64),
            None => {
                self.sum += value;
                if self.count == self.period {
                    Some(self.sum / period_f64)
                } else {
                    None
                }
            }
        };
        self.current
    }

    fn current(&self) -> Option<f64> {
        self.current
    }

    fn reset(&mut self) {
        self.count = 0;
        self.sum = 0.0;
        self.current = None;
    }

    fn is_ready(&self) -> bool {
        self.current.is_some()
    }

    fn period(&self) -> usize {
        self.period
    }

    fn name(&self) -> &str {
        "RMA"
    }
}

/// Average True Range (ATR).
///
/// Wilder smoothing of the true range. The first bar has no previous
/// close, so its true range is high - low and the first value appears
/// on bar `period - 1`.
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
}

impl Atr {
    /// Create a new ATR indicator.
    ///
    /// Common period is 14.
    pub fn new(period: usize) -> Self {
        assert!(period > 0, "Period must be greater than 0");
        Self { period }
    }

    /// Calculate ATR over bars, aligned with the input.
    pub fn calculate_bars(&self, bars: &[Bar]) -> Vec<Option<f64>> {
        let mut atr = StreamingAtr::new(self.period);
        bars.iter().map(|bar| atr.update(bar)).collect()
    }

    /// Calculate ATR from OHLC slices, aligned with the input.
    pub fn calculate_ohlc(&self, high: &[f64], low: &[f64], close: &[f64]) -> Vec<Option<f64>> {
        let len = high.len().min(low.len()).min(close.len());
        let mut rma = Rma::new(self.period);
        let mut result = Vec::with_capacity(len);

        for i in 0..len {
            let high_low = high[i] - low[i];
            let tr = if i == 0 {
                high_low
            } else {
                let high_close = (high[i] - close[i - 1]).abs();
                let low_close = (low[i] - close[i - 1]).abs();
                high_low.max(high_close).max(low_close)
            };
            result.push(rma.update(tr));
        }

        result
    }

    pub fn period(&self) -> usize {
        self.period
    }
}

/// Streaming ATR updated once per bar.
#[derive(Debug, Clone)]
pub struct StreamingAtr {
    rma: Rma,
    prev_close: Option<f64>,
}

impl StreamingAtr {
    /// Create a new streaming ATR.
    pub fn new(period: usize) -> Self {
        Self {
            rma: Rma::new(period),
            prev_close: None,
        }
    }
}

impl BarIndicator for StreamingAtr {
    type Output = f64;

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        let tr = bar.true_range(self.prev_close);
        self.prev_close = Some(bar.close);
        self.rma.update(tr)
    }

    fn current(&self) -> Option<f64> {
        self.rma.current()
    }

    fn reset(&mut self) {
        self.rma.reset();
        self.prev_close = None;
    }

    fn period(&self) -> usize {
        self.rma.period()
    }

    fn name(&self) -> &str {
        "ATR"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(data: &[(f64, f64, f64)]) -> Vec<Bar> {
        data.iter()
            .enumerate()
            .map(|(i, &(h, l, c))| Bar::new(i as i64 * 60_000, c, h, l, c, 1.0))
            .collect()
    }

    #[test]
    fn test_rma_seed_and_smoothing() {
        let mut rma = Rma::new(3);
        assert!(rma.update(3.0).is_none());
        assert!(rma.update(6.0).is_none());
        assert_eq!(rma.update(9.0), Some(6.0));
        // (6 * 2 + 3) / 3 = 5
        assert_eq!(rma.update(3.0), Some(5.0));
    }

    #[test]
    fn test_atr_first_value_on_period_minus_one() {
        let data = bars(&[
            (10.0, 8.0, 9.0),
            (11.0, 9.0, 10.0),
            (12.0, 10.0, 11.0),
            (14.0, 11.0, 13.0),
        ]);
        let atr = Atr::new(3).calculate_bars(&data);

        assert!(atr[0].is_none() && atr[1].is_none());
        // TRs: 2, 2, 2 -> seed 2
        assert!((atr[2].unwrap() - 2.0).abs() < 1e-10);
        // TR bar 3 = max(3, |14-11|, |11-11|) = 3 -> (2*2 + 3)/3
        assert!((atr[3].unwrap() - 7.0 / 3.0).abs() < 1e-10);
    }

    #[test]
    fn test_atr_ohlc_matches_bars() {
        let data = bars(&[
            (10.0, 8.0, 9.0),
            (12.0, 8.5, 11.0),
            (11.5, 9.0, 9.5),
            (13.0, 9.5, 12.5),
            (12.8, 11.0, 11.2),
        ]);
        let highs: Vec<f64> = data.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = data.iter().map(|b| b.low).collect();
        let closes: Vec<f64> = data.iter().map(|b| b.close).collect();

        let atr = Atr::new(2);
        assert_eq!(atr.calculate_bars(&data), atr.calculate_ohlc(&highs, &lows, &closes));
    }

    #[test]
    fn test_streaming_atr_reset() {
        let data = bars(&[(10.0, 8.0, 9.0), (11.0, 9.0, 10.0)]);
        let mut atr = StreamingAtr::new(2);
        atr.update(&data[0]);
        assert!(atr.update(&data[1]).is_some());
        atr.reset();
        assert!(!atr.is_ready());
        assert!(atr.update(&data[1]).is_none());
    }
}
