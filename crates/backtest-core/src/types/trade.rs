//! Trade direction and trade log events.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Direction of an open position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Long,
    Short,
}

impl Direction {
    /// +1 for long, -1 for short.
    #[inline]
    pub fn sign(&self) -> f64 {
        match self {
            Direction::Long => 1.0,
            Direction::Short => -1.0,
        }
    }

    /// The other direction.
    pub fn opposite(&self) -> Direction {
        match self {
            Direction::Long => Direction::Short,
            Direction::Short => Direction::Long,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => write!(f, "long"),
            Direction::Short => write!(f, "short"),
        }
    }
}

/// Which entry directions a strategy may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum DirectionFilter {
    #[default]
    Both,
    Long,
    Short,
}

impl DirectionFilter {
    /// Whether an entry in `direction` passes the filter.
    pub fn allows(&self, direction: Direction) -> bool {
        match self {
            DirectionFilter::Both => true,
            DirectionFilter::Long => direction == Direction::Long,
            DirectionFilter::Short => direction == Direction::Short,
        }
    }
}

impl fmt::Display for DirectionFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectionFilter::Both => write!(f, "both"),
            DirectionFilter::Long => write!(f, "long"),
            DirectionFilter::Short => write!(f, "short"),
        }
    }
}

impl FromStr for DirectionFilter {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "both" | "all" => Ok(DirectionFilter::Both),
            "long" => Ok(DirectionFilter::Long),
            "short" => Ok(DirectionFilter::Short),
            _ => Err(format!("Invalid direction filter: {}", s)),
        }
    }
}

/// Position state as seen from outside the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PositionSide {
    #[default]
    Flat,
    Long,
    Short,
}

impl From<Direction> for PositionSide {
    fn from(direction: Direction) -> Self {
        match direction {
            Direction::Long => PositionSide::Long,
            Direction::Short => PositionSide::Short,
        }
    }
}

/// Kind of trade log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventType {
    Entry,
    Exit,
}

/// Why a position was closed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    /// Fixed or risk-based stop touched
    StopLoss,
    /// Target touched
    TakeProfit,
    /// Trailing stop touched
    TrailingStop,
    /// Opposite crossover closed the position (minimal crossover)
    OppositeCrossover,
    /// Opposite signal closed the position ahead of a new entry
    Reversal,
}

impl ExitReason {
    /// Whether the exit came from a price level rather than a signal.
    pub fn is_level_exit(&self) -> bool {
        matches!(
            self,
            ExitReason::StopLoss | ExitReason::TakeProfit | ExitReason::TrailingStop
        )
    }
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExitReason::StopLoss => "Stop loss",
            ExitReason::TakeProfit => "Take profit",
            ExitReason::TrailingStop => "Trailing stop",
            ExitReason::OppositeCrossover => "Opposite crossover",
            ExitReason::Reversal => "Reversal",
        };
        write!(f, "{}", s)
    }
}

/// One entry or exit in the trade log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeEvent {
    /// Shared by the entry and exit of one position, sequential from 1
    pub trade_id: u64,
    /// Index of the bar that produced the event
    pub bar_index: usize,
    /// Timestamp of that bar (Unix ms)
    pub timestamp: i64,
    pub event_type: EventType,
    pub direction: Direction,
    /// Human-readable reason
    pub signal: String,
    /// Typed exit reason, exits only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_reason: Option<ExitReason>,
    /// Executed price after slippage and rounding
    pub price: f64,
    pub quantity: f64,
    /// Commission charged on this fill
    pub commission: f64,
    /// Net PnL of the closed trade after both commissions, exits only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pnl: Option<f64>,
    /// Best favorable excursion while open, in price units, exits only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_up_amount: Option<f64>,
    /// Worst adverse excursion while open, in price units, exits only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drawdown_amount: Option<f64>,
}

impl TradeEvent {
    pub fn is_entry(&self) -> bool {
        self.event_type == EventType::Entry
    }

    pub fn is_exit(&self) -> bool {
        self.event_type == EventType::Exit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_helpers() {
        assert_eq!(Direction::Long.sign(), 1.0);
        assert_eq!(Direction::Short.sign(), -1.0);
        assert_eq!(Direction::Long.opposite(), Direction::Short);
        assert_eq!(PositionSide::from(Direction::Short), PositionSide::Short);
    }

    #[test]
    fn test_direction_filter() {
        assert!(DirectionFilter::Both.allows(Direction::Short));
        assert!(DirectionFilter::Long.allows(Direction::Long));
        assert!(!DirectionFilter::Long.allows(Direction::Short));
        assert!(!DirectionFilter::Short.allows(Direction::Long));
        assert_eq!(DirectionFilter::from_str("LONG").unwrap(), DirectionFilter::Long);
    }

    #[test]
    fn test_level_exit_reasons() {
        assert!(ExitReason::StopLoss.is_level_exit());
        assert!(ExitReason::TrailingStop.is_level_exit());
        assert!(!ExitReason::OppositeCrossover.is_level_exit());
        assert!(!ExitReason::Reversal.is_level_exit());
    }

    #[test]
    fn test_entry_event_omits_exit_fields() {
        let event = TradeEvent {
            trade_id: 1,
            bar_index: 3,
            timestamp: 1_700_000_000_000,
            event_type: EventType::Entry,
            direction: Direction::Long,
            signal: "Bullish crossover".to_string(),
            exit_reason: None,
            price: 101.5,
            quantity: 2.0,
            commission: 0.203,
            pnl: None,
            run_up_amount: None,
            drawdown_amount: None,
        };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"entry\""));
        assert!(!json.contains("pnl"));
        assert!(event.is_entry());
    }
}
