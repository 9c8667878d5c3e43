//! EMA versus anchored VWAP signals with delayed confirmation.
//!
//! A raw signal is the EMA crossing the VWAP. With confirmation enabled the
//! raw signal becomes pending and must pass the mode's check on each of the
//! next `confirmation_bars` bars. A failed check, or the EMA crossing back,
//! cancels it. EMA and VWAP within [`LEVEL_TOLERANCE`] of each other count
//! as level.
//!
//! [`LEVEL_TOLERANCE`]: crate::signal::LEVEL_TOLERANCE

use std::cmp::Ordering;
use std::collections::BTreeMap;
use tracing::trace;

use backtest_core::traits::{BarIndicator, StreamingIndicator};
use backtest_core::types::{Bar, Direction};
use backtest_indicators::{AnchoredVwap, Dmi, StreamingAtr, StreamingEma};

use crate::params::{ConfirmationMode, EmaVwapParams};
use crate::signal::{compare_levels, cross_direction, Signal};

#[derive(Debug, Clone, Copy, PartialEq)]
struct Pending {
    direction: Direction,
    confirmed: usize,
}

/// Streaming EMA/VWAP signal generator.
#[derive(Debug, Clone)]
pub struct EmaVwapSignals {
    params: EmaVwapParams,
    ema: StreamingEma,
    vwap: AnchoredVwap,
    atr: StreamingAtr,
    dmi: Option<Dmi>,
    prev: Option<(f64, f64)>,
    current: Option<(f64, f64)>,
    pending: Option<Pending>,
}

impl EmaVwapSignals {
    /// Create a generator from validated parameters.
    pub fn new(params: &EmaVwapParams) -> Self {
        Self {
            ema: StreamingEma::new(params.ema_period),
            vwap: AnchoredVwap::new(params.vwap_anchor, params.vwap_source),
            atr: StreamingAtr::new(params.exits.atr_length),
            dmi: params
                .enable_dmi_filter
                .then(|| Dmi::new(params.dmi_length, params.dmi_smoothing)),
            params: params.clone(),
            prev: None,
            current: None,
            pending: None,
        }
    }

    /// ADX of the trend filter, if enabled and ready.
    pub fn adx(&self) -> Option<f64> {
        self.dmi.as_ref().and_then(|dmi| dmi.adx())
    }

    /// Whether a flip is waiting for confirmation.
    pub fn has_pending(&self) -> bool {
        self.pending.is_some()
    }

    /// Feed one bar and report a confirmed signal on it.
    pub fn update(&mut self, bar: &Bar) -> Option<Signal> {
        let ema = self.ema.update(bar.price(self.params.ema_source));
        let vwap = self.vwap.update(bar);
        let atr = self.atr.update(bar);
        if let Some(dmi) = self.dmi.as_mut() {
            dmi.update(bar);
        }

        self.prev = self.current;
        self.current = ema.zip(vwap);

        let Some((ema, vwap)) = self.current else {
            self.pending = None;
            return None;
        };

        let position = compare_levels(ema, vwap);
        if let Some((prev_ema, prev_vwap)) = self.prev {
            let flip = cross_direction(compare_levels(prev_ema, prev_vwap), position);

            if let Some(direction) = flip {
                if self.params.confirmation_mode == ConfirmationMode::Off {
                    self.pending = None;
                    return Some(Signal::new(direction, Self::describe(direction, ema, vwap)));
                }
                // A new flip replaces whatever was pending in the other direction
                self.pending = Some(Pending {
                    direction,
                    confirmed: 0,
                });
                return None;
            }
        }

        let pending = self.pending.take()?;
        let held = match pending.direction {
            Direction::Long => position == Ordering::Greater,
            Direction::Short => position == Ordering::Less,
        };
        if !held || !self.confirms(pending.direction, bar, vwap, atr) {
            trace!(
                timestamp = bar.timestamp,
                direction = %pending.direction,
                confirmed = pending.confirmed,
                "Pending signal cancelled"
            );
            return None;
        }

        let confirmed = pending.confirmed + 1;
        if confirmed >= self.params.confirmation_bars {
            return Some(Signal::new(
                pending.direction,
                format!(
                    "{} (confirmed {} after {} bars)",
                    Self::describe(pending.direction, ema, vwap),
                    self.params.confirmation_mode,
                    confirmed
                ),
            ));
        }

        self.pending = Some(Pending {
            direction: pending.direction,
            confirmed,
        });
        None
    }

    fn confirms(&self, direction: Direction, bar: &Bar, vwap: f64, atr: Option<f64>) -> bool {
        match (self.params.confirmation_mode, direction) {
            (ConfirmationMode::Off, _) => true,
            (ConfirmationMode::OnClose, Direction::Long) => bar.close > vwap,
            (ConfirmationMode::OnClose, Direction::Short) => bar.close < vwap,
            (ConfirmationMode::OnHighLow, Direction::Long) => bar.low > vwap,
            (ConfirmationMode::OnHighLow, Direction::Short) => bar.high < vwap,
            (ConfirmationMode::AtrBased, direction) => match atr {
                Some(atr) => {
                    let distance = (bar.close - vwap) * direction.sign();
                    distance >= self.params.confirmation_atr_mult * atr
                }
                None => false,
            },
        }
    }

    fn describe(direction: Direction, ema: f64, vwap: f64) -> String {
        match direction {
            Direction::Long => format!("EMA ({:.2}) crossed above VWAP ({:.2})", ema, vwap),
            Direction::Short => format!("EMA ({:.2}) crossed below VWAP ({:.2})", ema, vwap),
        }
    }

    /// Write the ready indicator values into `out`.
    pub fn record_indicators(&self, out: &mut BTreeMap<String, f64>) {
        if let Some(ema) = self.ema.current() {
            out.insert("ema".to_string(), ema);
        }
        if let Some(vwap) = self.vwap.current() {
            out.insert("vwap".to_string(), vwap);
        }
        if self.params.confirmation_mode == ConfirmationMode::AtrBased {
            if let Some(atr) = self.atr.current() {
                out.insert("confirmation_atr".to_string(), atr);
            }
        }
        if let Some(dmi) = &self.dmi {
            if let Some(plus) = dmi.plus_di() {
                out.insert("plus_di".to_string(), plus);
            }
            if let Some(minus) = dmi.minus_di() {
                out.insert("minus_di".to_string(), minus);
            }
            if let Some(adx) = dmi.adx() {
                out.insert("adx".to_string(), adx);
            }
        }
    }
}
