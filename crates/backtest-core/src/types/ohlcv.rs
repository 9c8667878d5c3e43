//! OHLCV (Open, High, Low, Close, Volume) data types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Compact OHLCV bar.
/// Uses f64 for fast indicator calculations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[repr(C)]
pub struct Bar {
    /// Unix timestamp in milliseconds
    pub timestamp: i64,
    /// Opening price
    pub open: f64,
    /// Highest price
    pub high: f64,
    /// Lowest price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Trading volume
    pub volume: f64,
}

impl Bar {
    /// Create a new bar.
    pub fn new(timestamp: i64, open: f64, high: f64, low: f64, close: f64, volume: f64) -> Self {
        Self {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Calculate the typical price (HLC average).
    #[inline]
    pub fn typical_price(&self) -> f64 {
        (self.high + self.low + self.close) / 3.0
    }

    /// Calculate the bar's range (high - low).
    #[inline]
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    /// Extract the price selected by `source`.
    #[inline]
    pub fn price(&self, source: PriceSource) -> f64 {
        match source {
            PriceSource::Open => self.open,
            PriceSource::High => self.high,
            PriceSource::Low => self.low,
            PriceSource::Close => self.close,
            PriceSource::Hlc3 => self.typical_price(),
        }
    }

    /// Get the timestamp as a DateTime. Out-of-range timestamps map to the epoch.
    pub fn datetime(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.timestamp).unwrap_or_default()
    }

    /// Calculate the true range (used for ATR and DMI).
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => {
                let hl = self.high - self.low;
                let hc = (self.high - pc).abs();
                let lc = (self.low - pc).abs();
                hl.max(hc).max(lc)
            }
            None => self.high - self.low,
        }
    }

    /// Whether every price and the volume are finite numbers.
    pub fn is_finite(&self) -> bool {
        self.open.is_finite()
            && self.high.is_finite()
            && self.low.is_finite()
            && self.close.is_finite()
            && self.volume.is_finite()
    }
}

impl Default for Bar {
    fn default() -> Self {
        Self {
            timestamp: 0,
            open: 0.0,
            high: 0.0,
            low: 0.0,
            close: 0.0,
            volume: 0.0,
        }
    }
}

/// Which price of a bar feeds an indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    Open,
    High,
    Low,
    #[default]
    Close,
    /// (high + low + close) / 3
    Hlc3,
}

impl fmt::Display for PriceSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            PriceSource::Open => "open",
            PriceSource::High => "high",
            PriceSource::Low => "low",
            PriceSource::Close => "close",
            PriceSource::Hlc3 => "hlc3",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for PriceSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "open" => Ok(PriceSource::Open),
            "high" => Ok(PriceSource::High),
            "low" => Ok(PriceSource::Low),
            "close" => Ok(PriceSource::Close),
            "hlc3" | "typical" => Ok(PriceSource::Hlc3),
            _ => Err(format!("Invalid price source: {}", s)),
        }
    }
}

/// Check that bars are non-empty, finite and strictly ascending by timestamp.
pub fn validate_bars(bars: &[Bar]) -> Result<(), ValidationError> {
    if bars.is_empty() {
        return Err(ValidationError::EmptyBars);
    }

    for (index, bar) in bars.iter().enumerate() {
        if !bar.is_finite() {
            return Err(ValidationError::NonFiniteBar { index });
        }
        if index > 0 {
            let previous = bars[index - 1].timestamp;
            if bar.timestamp <= previous {
                return Err(ValidationError::NonMonotonicTimestamp {
                    index,
                    previous,
                    current: bar.timestamp,
                });
            }
        }
    }

    Ok(())
}

/// Extract one price per bar.
pub fn prices(bars: &[Bar], source: PriceSource) -> Vec<f64> {
    bars.iter().map(|b| b.price(source)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bar_calculations() {
        let bar = Bar::new(1000, 100.0, 110.0, 95.0, 105.0, 1000000.0);

        assert!((bar.typical_price() - 103.333333).abs() < 0.001);
        assert!((bar.range() - 15.0).abs() < 0.001);
        assert_eq!(bar.price(PriceSource::Open), 100.0);
        assert_eq!(bar.price(PriceSource::High), 110.0);
        assert_eq!(bar.price(PriceSource::Low), 95.0);
        assert_eq!(bar.price(PriceSource::Close), 105.0);
        assert!((bar.price(PriceSource::Hlc3) - bar.typical_price()).abs() < 1e-12);
    }

    #[test]
    fn test_bar_true_range() {
        let bar = Bar::new(1000, 100.0, 110.0, 95.0, 105.0, 1000000.0);

        // Without previous close
        assert!((bar.true_range(None) - 15.0).abs() < 0.001);

        // With previous close that creates gap
        assert!((bar.true_range(Some(90.0)) - 20.0).abs() < 0.001);
    }

    #[test]
    fn test_validate_bars() {
        let bars = vec![
            Bar::new(1, 100.0, 101.0, 99.0, 100.5, 1000.0),
            Bar::new(2, 100.5, 102.0, 100.0, 101.5, 1000.0),
        ];
        assert!(validate_bars(&bars).is_ok());
        assert_eq!(validate_bars(&[]), Err(ValidationError::EmptyBars));

        let duplicate = vec![bars[0], bars[0]];
        assert!(matches!(
            validate_bars(&duplicate),
            Err(ValidationError::NonMonotonicTimestamp { index: 1, .. })
        ));

        let mut bad = bars.clone();
        bad[1].close = f64::NAN;
        assert_eq!(
            validate_bars(&bad),
            Err(ValidationError::NonFiniteBar { index: 1 })
        );
    }

    #[test]
    fn test_price_source_parse() {
        assert_eq!(PriceSource::from_str("HLC3").unwrap(), PriceSource::Hlc3);
        assert_eq!(PriceSource::from_str("close").unwrap(), PriceSource::Close);
        assert!(PriceSource::from_str("median").is_err());
        assert_eq!(PriceSource::Hlc3.to_string(), "hlc3");
    }
}
