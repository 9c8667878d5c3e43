//! Trade log, curves and summary statistics.

use backtest_core::types::{
    BacktestResult, BacktestSummary, BarRecord, EquityPoint, PnlPoint, TradeEvent,
};

/// Profit factor reported when there are winning trades and no losing ones.
pub const PROFIT_FACTOR_CAP: f64 = 999.0;

/// Collects events and per-bar points during a run.
#[derive(Debug, Clone)]
pub struct Aggregator {
    initial_capital: f64,
    trade_log: Vec<TradeEvent>,
    equity_curve: Vec<EquityPoint>,
    pnl_curve: Vec<PnlPoint>,
    bar_log: Vec<BarRecord>,
    peak_equity: f64,
    max_drawdown_percent: f64,
    max_drawdown_amount: f64,
    gross_profit: f64,
    gross_loss: f64,
    total_commission: f64,
    total_trades: usize,
    profitable_trades: usize,
    losing_trades: usize,
}

impl Aggregator {
    /// Create a new aggregator sized for `bars` bars.
    pub fn new(initial_capital: f64, bars: usize) -> Self {
        Self {
            initial_capital,
            trade_log: Vec::new(),
            equity_curve: Vec::with_capacity(bars),
            pnl_curve: Vec::with_capacity(bars),
            bar_log: Vec::with_capacity(bars),
            peak_equity: initial_capital,
            max_drawdown_percent: 0.0,
            max_drawdown_amount: 0.0,
            gross_profit: 0.0,
            gross_loss: 0.0,
            total_commission: 0.0,
            total_trades: 0,
            profitable_trades: 0,
            losing_trades: 0,
        }
    }

    /// Record a trade event.
    pub fn record_event(&mut self, event: TradeEvent) {
        self.total_commission += event.commission;

        if let Some(pnl) = event.pnl {
            self.total_trades += 1;
            if pnl > 0.0 {
                self.profitable_trades += 1;
                self.gross_profit += pnl;
            } else if pnl < 0.0 {
                self.losing_trades += 1;
                self.gross_loss += pnl.abs();
            }
        }

        self.trade_log.push(event);
    }

    /// Record the mark-to-market state after one bar.
    pub fn record_bar(&mut self, record: BarRecord) {
        let equity = record.equity;

        if equity > self.peak_equity {
            self.peak_equity = equity;
        }
        let drawdown = self.peak_equity - equity;
        if drawdown > self.max_drawdown_amount {
            self.max_drawdown_amount = drawdown;
        }
        if self.peak_equity > 0.0 {
            let drawdown_pct = drawdown / self.peak_equity * 100.0;
            if drawdown_pct > self.max_drawdown_percent {
                self.max_drawdown_percent = drawdown_pct;
            }
        }

        self.equity_curve.push(EquityPoint {
            timestamp: record.timestamp,
            equity,
        });
        self.pnl_curve.push(PnlPoint {
            timestamp: record.timestamp,
            pnl_percent: (equity - self.initial_capital) / self.initial_capital * 100.0,
        });
        self.bar_log.push(record);
    }

    pub fn trade_log(&self) -> &[TradeEvent] {
        &self.trade_log
    }

    /// Finish the run.
    ///
    /// `net_profit` is the realized PnL of closed trades and `pnl_open` the
    /// unrealized PnL of a position still open after the last bar.
    pub fn finalize(
        self,
        net_profit: f64,
        pnl_open: f64,
        max_consecutive_losses: usize,
    ) -> BacktestResult {
        let equity_final = self
            .equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(self.initial_capital);

        let summary = BacktestSummary {
            initial_capital: self.initial_capital,
            equity_final: finite(equity_final),
            pnl_total: finite(equity_final - self.initial_capital),
            net_profit: finite(net_profit),
            max_drawdown_percent: finite(self.max_drawdown_percent).clamp(0.0, 100.0),
            max_drawdown_amount: finite(self.max_drawdown_amount).max(0.0),
            profit_factor: profit_factor(self.gross_profit, self.gross_loss),
            total_trades: self.total_trades,
            profitable_trades: self.profitable_trades,
            losing_trades: self.losing_trades,
            gross_profit: finite(self.gross_profit),
            gross_loss: finite(self.gross_loss),
            total_commission: finite(self.total_commission),
            win_rate_percent: ratio(
                self.profitable_trades as f64 * 100.0,
                self.total_trades as f64,
            ),
            avg_win: ratio(self.gross_profit, self.profitable_trades as f64),
            avg_loss: ratio(self.gross_loss, self.losing_trades as f64),
            max_consecutive_losses,
            pnl_open: finite(pnl_open),
            bars_processed: self.equity_curve.len(),
        };

        BacktestResult {
            trade_log: self.trade_log,
            equity_curve: self.equity_curve,
            pnl_curve: self.pnl_curve,
            summary,
            bar_log: self.bar_log,
        }
    }
}

/// gross_profit / gross_loss, with `gross_loss` as a positive magnitude.
///
/// No profit gives 0.0. Profit with no loss gives [`PROFIT_FACTOR_CAP`].
pub fn profit_factor(gross_profit: f64, gross_loss: f64) -> f64 {
    if gross_profit <= 0.0 || !gross_profit.is_finite() {
        return 0.0;
    }
    if gross_loss <= 0.0 {
        return PROFIT_FACTOR_CAP;
    }
    finite(gross_profit / gross_loss)
}

fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        finite(numerator / denominator)
    } else {
        0.0
    }
}

fn finite(value: f64) -> f64 {
    if value.is_finite() {
        value
    } else {
        0.0
    }
}
