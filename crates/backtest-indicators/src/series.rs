//! Whole-series indicator computation for diagnostics.

use serde::{Deserialize, Serialize};

use backtest_core::error::IndicatorError;
use backtest_core::traits::{BarIndicator, Indicator};
use backtest_core::types::{prices, Bar, PriceSource};

use crate::directional::Dmi;
use crate::moving_average::Ema;
use crate::simd;
use crate::volatility::Atr;
use crate::vwap::{AnchoredVwap, VwapAnchor};

/// Indicator selectable by name from outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IndicatorKind {
    Sma {
        #[serde(default)]
        source: PriceSource,
    },
    Ema {
        #[serde(default)]
        source: PriceSource,
    },
    Atr,
    /// `period` is used for both DI length and ADX smoothing
    Adx,
    PlusDi,
    MinusDi,
    /// `period` is validated but unused
    Vwap {
        #[serde(default)]
        anchor: VwapAnchor,
        #[serde(default = "default_vwap_source")]
        source: PriceSource,
    },
}

fn default_vwap_source() -> PriceSource {
    PriceSource::Hlc3
}

/// Compute one indicator over `bars`.
///
/// Returns only ready values, so the first element belongs to the first
/// bar on which the indicator is defined.
pub fn compute_indicator_series(
    bars: &[Bar],
    kind: IndicatorKind,
    period: usize,
) -> Result<Vec<f64>, IndicatorError> {
    if period == 0 {
        return Err(IndicatorError::InvalidParameter(
            "period must be greater than 0".to_string(),
        ));
    }
    if bars.is_empty() {
        return Err(IndicatorError::InsufficientData {
            required: 1,
            available: 0,
        });
    }

    let values = match kind {
        IndicatorKind::Sma { source } => {
            let input = match source {
                PriceSource::Hlc3 => simd::hlc3_simd(bars),
                other => prices(bars, other),
            };
            simd::sma_simd(&input, period)
        }
        IndicatorKind::Ema { source } => Ema::new(period)
            .calculate(&prices(bars, source))
            .into_iter()
            .flatten()
            .collect(),
        IndicatorKind::Atr => Atr::new(period).calculate_bars(bars).into_iter().flatten().collect(),
        IndicatorKind::Adx => {
            let mut dmi = Dmi::new(period, period);
            bars.iter()
                .filter_map(|bar| dmi.update(bar).map(|out| out.adx))
                .collect()
        }
        IndicatorKind::PlusDi => {
            let mut dmi = Dmi::new(period, period);
            bars.iter()
                .filter_map(|bar| {
                    dmi.update(bar);
                    dmi.plus_di()
                })
                .collect()
        }
        IndicatorKind::MinusDi => {
            let mut dmi = Dmi::new(period, period);
            bars.iter()
                .filter_map(|bar| {
                    dmi.update(bar);
                    dmi.minus_di()
                })
                .collect()
        }
        IndicatorKind::Vwap { anchor, source } => {
            let mut vwap = AnchoredVwap::new(anchor, source);
            bars.iter().filter_map(|bar| vwap.update(bar)).collect()
        }
    };

    if values.iter().any(|v| !v.is_finite()) {
        return Err(IndicatorError::CalculationError(format!(
            "{:?} produced a non-finite value",
            kind
        )));
    }

    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_bars(n: usize) -> Vec<Bar> {
        (0..n)
            .map(|i| {
                let p = 100.0 + (i as f64 * 0.4).sin() * 3.0 + i as f64 * 0.1;
                Bar::new(i as i64 * 3_600_000, p, p + 1.0, p - 1.0, p + 0.2, 100.0 + i as f64)
            })
            .collect()
    }

    #[test]
    fn test_sma_series_length() {
        let bars = sample_bars(50);
        let values = compute_indicator_series(
            &bars,
            IndicatorKind::Sma {
                source: PriceSource::Close,
            },
            10,
        )
        .unwrap();
        assert_eq!(values.len(), 41);
    }

    #[test]
    fn test_hlc3_sma_uses_typical_price() {
        let bars = sample_bars(5);
        let values = compute_indicator_series(
            &bars,
            IndicatorKind::Sma {
                source: PriceSource::Hlc3,
            },
            5,
        )
        .unwrap();
        let expected: f64 = bars.iter().map(|b| b.typical_price()).sum::<f64>() / 5.0;
        assert!((values[0] - expected).abs() < 1e-9);
    }

    #[test]
    fn test_ema_and_atr_start_at_first_ready_bar() {
        let bars = sample_bars(30);
        let ema = compute_indicator_series(
            &bars,
            IndicatorKind::Ema {
                source: PriceSource::Close,
            },
            14,
        )
        .unwrap();
        let atr = compute_indicator_series(&bars, IndicatorKind::Atr, 14).unwrap();
        assert_eq!(ema.len(), 17);
        assert_eq!(atr.len(), 17);
    }

    #[test]
    fn test_dmi_series() {
        let bars = sample_bars(60);
        let adx = compute_indicator_series(&bars, IndicatorKind::Adx, 7).unwrap();
        let plus = compute_indicator_series(&bars, IndicatorKind::PlusDi, 7).unwrap();
        // DI from bar 7, ADX from bar 13
        assert_eq!(plus.len(), 53);
        assert_eq!(adx.len(), 47);
        assert!(adx.iter().all(|v| (0.0..=100.0).contains(v)));
    }

    #[test]
    fn test_vwap_series_covers_every_bar() {
        let bars = sample_bars(12);
        let values = compute_indicator_series(
            &bars,
            IndicatorKind::Vwap {
                anchor: VwapAnchor::Day,
                source: PriceSource::Hlc3,
            },
            1,
        )
        .unwrap();
        assert_eq!(values.len(), 12);
    }

    #[test]
    fn test_invalid_inputs() {
        let bars = sample_bars(5);
        assert!(matches!(
            compute_indicator_series(&bars, IndicatorKind::Atr, 0),
            Err(IndicatorError::InvalidParameter(_))
        ));
        assert!(matches!(
            compute_indicator_series(&[], IndicatorKind::Atr, 3),
            Err(IndicatorError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_kind_deserializes_with_defaults() {
        let kind: IndicatorKind = serde_json::from_str(r#"{"kind":"vwap"}"#).unwrap();
        assert_eq!(
            kind,
            IndicatorKind::Vwap {
                anchor: VwapAnchor::Session,
                source: PriceSource::Hlc3
            }
        );
    }
}
