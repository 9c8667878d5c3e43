//! Directional Movement Index (DMI).
//!
//! 1. TR, +DM and -DM from consecutive bars (the first bar has none)
//! 2. Smooth TR, +DM and -DM with Wilder's RMA over `di_length`, all three
//!    over the same bars
//! 3. +DI = 100 * RMA(+DM) / RMA(TR), -DI likewise
//! 4. DX = 100 * |+DI - -DI| / (+DI + -DI), 0 when both are 0
//! 5. ADX = RMA(DX) over `adx_smoothing`

use serde::{Deserialize, Serialize};

use backtest_core::traits::{BarIndicator, StreamingIndicator};
use backtest_core::types::Bar;

use crate::volatility::Rma;

/// One DMI reading.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DmiOutput {
    pub plus_di: f64,
    pub minus_di: f64,
    /// Smoothed directional strength
    pub adx: f64,
}

/// Streaming DMI.
#[derive(Debug, Clone)]
pub struct Dmi {
    di_length: usize,
    adx_smoothing: usize,
    prev: Option<Bar>,
    tr: Rma,
    plus_dm: Rma,
    minus_dm: Rma,
    adx: Rma,
    di: Option<(f64, f64)>,
    current: Option<DmiOutput>,
}

impl Dmi {
    /// Create a new DMI.
    ///
    /// # Panics
    /// If either length is zero.
    pub fn new(di_length: usize, adx_smoothing: usize) -> Self {
        Self {
            di_length,
            adx_smoothing,
            prev: None,
            tr: Rma::new(di_length),
            plus_dm: Rma::new(di_length),
            minus_dm: Rma::new(di_length),
            adx: Rma::new(adx_smoothing),
            di: None,
            current: None,
        }
    }

    /// +DI, available before ADX is.
    pub fn plus_di(&self) -> Option<f64> {
        self.di.map(|(plus, _)| plus)
    }

    /// -DI, available before ADX is.
    pub fn minus_di(&self) -> Option<f64> {
        self.di.map(|(_, minus)| minus)
    }

    /// ADX, the smoothed directional strength.
    pub fn adx(&self) -> Option<f64> {
        self.current.map(|out| out.adx)
    }

    fn directional_movement(prev: &Bar, bar: &Bar) -> (f64, f64) {
        let up = bar.high - prev.high;
        let down = prev.low - bar.low;
        let plus = if up > down && up > 0.0 { up } else { 0.0 };
        let minus = if down > up && down > 0.0 { down } else { 0.0 };
        (plus, minus)
    }
}

impl BarIndicator for Dmi {
    type Output = DmiOutput;

    fn update(&mut self, bar: &Bar) -> Option<DmiOutput> {
        if let Some(prev) = self.prev {
            let (plus, minus) = Self::directional_movement(&prev, bar);
            let smoothed_tr = self.tr.update(bar.true_range(Some(prev.close)));
            let smoothed_plus = self.plus_dm.update(plus);
            let smoothed_minus = self.minus_dm.update(minus);

            if let (Some(tr), Some(plus), Some(minus)) =
                (smoothed_tr, smoothed_plus, smoothed_minus)
            {
                // A zero-range stretch keeps the last DI reading.
                let (plus_di, minus_di) = if tr > 0.0 {
                    (100.0 * plus / tr, 100.0 * minus / tr)
                } else {
                    self.di.unwrap_or((0.0, 0.0))
                };
                self.di = Some((plus_di, minus_di));

                let di_sum = plus_di + minus_di;
                let dx = if di_sum == 0.0 {
                    0.0
                } else {
                    100.0 * (plus_di - minus_di).abs() / di_sum
                };

                if let Some(adx) = self.adx.update(dx) {
                    self.current = Some(DmiOutput {
                        plus_di,
                        minus_di,
                        adx,
                    });
                }
            }
        }

        self.prev = Some(*bar);
        self.current
    }

    fn current(&self) -> Option<DmiOutput> {
        self.current
    }

    fn reset(&mut self) {
        self.prev = None;
        self.tr.reset();
        self.plus_dm.reset();
        self.minus_dm.reset();
        self.adx.reset();
        self.di = None;
        self.current = None;
    }

    /// Bars consumed before the first ADX value.
    fn period(&self) -> usize {
        self.di_length + self.adx_smoothing
    }

    fn name(&self) -> &str {
        "DMI"
    }
}
