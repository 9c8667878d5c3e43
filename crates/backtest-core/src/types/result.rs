//! Outputs of a backtest run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::{PositionSide, TradeEvent};

/// Mark-to-market equity at the close of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: i64,
    pub equity: f64,
}

/// Cumulative return versus initial capital at the close of one bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PnlPoint {
    pub timestamp: i64,
    #[serde(rename = "pnlPercent")]
    pub pnl_percent: f64,
}

/// Aggregate statistics of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub initial_capital: f64,
    /// Mark-to-market equity after the last bar
    pub equity_final: f64,
    /// equity_final - initial_capital
    pub pnl_total: f64,
    /// Realized net PnL of closed trades
    pub net_profit: f64,
    /// Largest peak-to-trough decline, percent of peak, clamped to [0, 100]
    pub max_drawdown_percent: f64,
    /// Largest peak-to-trough decline in currency units
    pub max_drawdown_amount: f64,
    /// gross_profit / |gross_loss|, with documented sentinels
    pub profit_factor: f64,
    /// Closed trades
    pub total_trades: usize,
    pub profitable_trades: usize,
    pub losing_trades: usize,
    pub gross_profit: f64,
    pub gross_loss: f64,
    pub total_commission: f64,
    pub win_rate_percent: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub max_consecutive_losses: usize,
    /// Unrealized PnL of a position still open after the last bar, net of its entry commission
    pub pnl_open: f64,
    pub bars_processed: usize,
}

/// Per-bar diagnostic record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BarRecord {
    pub bar_index: usize,
    pub timestamp: i64,
    pub close: f64,
    /// Position held after the bar was processed
    pub position: PositionSide,
    pub equity: f64,
    /// Ready indicator values keyed by name
    pub indicators: BTreeMap<String, f64>,
    /// Guard decisions and other notes
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub notes: Vec<String>,
}

/// Complete output of one engine invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub trade_log: Vec<TradeEvent>,
    pub equity_curve: Vec<EquityPoint>,
    pub pnl_curve: Vec<PnlPoint>,
    pub summary: BacktestSummary,
    pub bar_log: Vec<BarRecord>,
}

impl BacktestResult {
    /// Entries in the trade log.
    pub fn entries(&self) -> impl Iterator<Item = &TradeEvent> {
        self.trade_log.iter().filter(|e| e.is_entry())
    }

    /// Exits in the trade log.
    pub fn exits(&self) -> impl Iterator<Item = &TradeEvent> {
        self.trade_log.iter().filter(|e| e.is_exit())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pnl_point_field_name() {
        let point = PnlPoint {
            timestamp: 1,
            pnl_percent: 2.5,
        };
        let json = serde_json::to_string(&point).unwrap();
        assert_eq!(json, r#"{"timestamp":1,"pnlPercent":2.5}"#);
    }

    #[test]
    fn test_bar_record_indicator_order_is_stable() {
        let mut indicators = BTreeMap::new();
        indicators.insert("slow_ma".to_string(), 2.0);
        indicators.insert("fast_ma".to_string(), 1.0);
        let record = BarRecord {
            bar_index: 0,
            timestamp: 0,
            close: 1.0,
            position: PositionSide::Flat,
            equity: 100.0,
            indicators,
            notes: vec![],
        };
        let json = serde_json::to_string(&record).unwrap();
        let fast = json.find("fast_ma").unwrap();
        let slow = json.find("slow_ma").unwrap();
        assert!(fast < slow);
        assert!(!json.contains("notes"));
    }
}
