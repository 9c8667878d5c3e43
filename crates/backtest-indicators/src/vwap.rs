//! Anchored volume-weighted average price.

use chrono::{Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use backtest_core::traits::BarIndicator;
use backtest_core::types::{Bar, PriceSource};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// Boundary at which VWAP accumulators reset. Boundaries are computed in UTC.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VwapAnchor {
    /// Exchange session; a UTC day for continuously traded instruments
    #[default]
    Session,
    Day,
    /// ISO week, starting Monday
    Week,
    Month,
}

impl VwapAnchor {
    /// Identifier of the anchor period containing `timestamp` (Unix ms).
    /// Two bars share a period exactly when their keys are equal.
    pub fn period_key(&self, timestamp: i64) -> i64 {
        match self {
            VwapAnchor::Session | VwapAnchor::Day => timestamp.div_euclid(MILLIS_PER_DAY),
            VwapAnchor::Week => {
                let week = Utc
                    .timestamp_millis_opt(timestamp)
                    .single()
                    .map(|dt| dt.iso_week());
                match week {
                    Some(w) => w.year() as i64 * 100 + w.week() as i64,
                    // Monday-aligned 7-day buckets; 1970-01-05 was a Monday.
                    None => (timestamp.div_euclid(MILLIS_PER_DAY) - 4).div_euclid(7),
                }
            }
            VwapAnchor::Month => {
                let month = Utc
                    .timestamp_millis_opt(timestamp)
                    .single()
                    .map(|dt| (dt.year(), dt.month0()));
                match month {
                    Some((year, month0)) => year as i64 * 12 + month0 as i64,
                    None => timestamp.div_euclid(MILLIS_PER_DAY * 30),
                }
            }
        }
    }
}

impl fmt::Display for VwapAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            VwapAnchor::Session => "session",
            VwapAnchor::Day => "day",
            VwapAnchor::Week => "week",
            VwapAnchor::Month => "month",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for VwapAnchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "session" => Ok(VwapAnchor::Session),
            "day" | "daily" => Ok(VwapAnchor::Day),
            "week" | "weekly" => Ok(VwapAnchor::Week),
            "month" | "monthly" => Ok(VwapAnchor::Month),
            _ => Err(format!("Invalid VWAP anchor: {}", s)),
        }
    }
}

/// Streaming anchored VWAP.
///
/// Ready from the first bar. With zero accumulated volume in the
/// current period the value is the current source price.
#[derive(Debug, Clone)]
pub struct AnchoredVwap {
    anchor: VwapAnchor,
    source: PriceSource,
    period_key: Option<i64>,
    cumulative_pv: f64,
    cumulative_volume: f64,
    current: Option<f64>,
}

impl AnchoredVwap {
    pub fn new(anchor: VwapAnchor, source: PriceSource) -> Self {
        Self {
            anchor,
            source,
            period_key: None,
            cumulative_pv: 0.0,
            cumulative_volume: 0.0,
            current: None,
        }
    }

    pub fn anchor(&self) -> VwapAnchor {
        self.anchor
    }
}

impl BarIndicator for AnchoredVwap {
    type Output = f64;

    fn update(&mut self, bar: &Bar) -> Option<f64> {
        let key = self.anchor.period_key(bar.timestamp);
        if self.period_key != Some(key) {
            self.period_key = Some(key);
            self.cumulative_pv = 0.0;
            self.cumulative_volume = 0.0;
        }

        let price = bar.price(self.source);
        self.cumulative_pv += price * bar.volume;
        self.cumulative_volume += bar.volume;

        let value = if self.cumulative_volume > 0.0 {
            self.cumulative_pv / self.cumulative_volume
        } else {
            price
        };
        self.current = Some(value);
        self.current
    }

    fn current(&self) -> Option<f64> {
        self.current
    }

    fn reset(&mut self) {
        self.period_key = None;
        self.cumulative_pv = 0.0;
        self.cumulative_volume = 0.0;
        self.current = None;
    }

    fn period(&self) -> usize {
        1
    }

    fn name(&self) -> &str {
        "VWAP"
    }
}
