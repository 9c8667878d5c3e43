//! Backtest report generation.

use serde::{Deserialize, Serialize};

use backtest_core::types::BacktestResult;

/// Complete backtest report.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    /// Run label, usually strategy and symbol
    pub label: String,
    /// Engine output
    pub result: BacktestResult,
}

impl BacktestReport {
    pub fn new(label: impl Into<String>, result: BacktestResult) -> Self {
        Self {
            label: label.into(),
            result,
        }
    }

    /// Generate a text summary.
    pub fn summary(&self) -> String {
        let s = &self.result.summary;
        let mut out = String::new();

        out.push_str("═══════════════════════════════════════════════════════════\n");
        out.push_str("                     BACKTEST REPORT                        \n");
        out.push_str("═══════════════════════════════════════════════════════════\n");
        out.push_str(&format!("  {}\n\n", self.label));

        out.push_str("PERFORMANCE\n");
        out.push_str("───────────────────────────────────────────────────────────\n");
        out.push_str(&format!("  Initial Capital:     ${:.2}\n", s.initial_capital));
        out.push_str(&format!("  Final Equity:        ${:.2}\n", s.equity_final));
        out.push_str(&format!(
            "  Total PnL:           ${:.2} ({:.2}%)\n",
            s.pnl_total,
            self.total_return_percent()
        ));
        out.push_str(&format!("  Net Profit:          ${:.2}\n", s.net_profit));
        out.push_str(&format!("  Open PnL:            ${:.2}\n", s.pnl_open));
        out.push_str(&format!("  Max Drawdown:        {:.2}%\n", s.max_drawdown_percent));
        out.push_str(&format!("  Max Drawdown ($):    ${:.2}\n", s.max_drawdown_amount));
        out.push_str(&format!("  Profit Factor:       {:.2}\n", s.profit_factor));
        out.push('\n');

        out.push_str("TRADE STATISTICS\n");
        out.push_str("───────────────────────────────────────────────────────────\n");
        out.push_str(&format!("  Total Trades:        {}\n", s.total_trades));
        out.push_str(&format!("  Winning Trades:      {}\n", s.profitable_trades));
        out.push_str(&format!("  Losing Trades:       {}\n", s.losing_trades));
        out.push_str(&format!("  Win Rate:            {:.2}%\n", s.win_rate_percent));
        out.push_str(&format!("  Avg Win:             ${:.2}\n", s.avg_win));
        out.push_str(&format!("  Avg Loss:            ${:.2}\n", s.avg_loss));
        out.push_str(&format!("  Max Loss Streak:     {}\n", s.max_consecutive_losses));
        out.push('\n');

        out.push_str("EXECUTION\n");
        out.push_str("───────────────────────────────────────────────────────────\n");
        out.push_str(&format!("  Bars Processed:      {}\n", s.bars_processed));
        out.push_str(&format!("  Trade Events:        {}\n", self.result.trade_log.len()));
        out.push_str(&format!("  Total Commission:    ${:.2}\n", s.total_commission));
        out.push('\n');

        out.push_str("═══════════════════════════════════════════════════════════\n");

        out
    }

    fn total_return_percent(&self) -> f64 {
        let s = &self.result.summary;
        if s.initial_capital > 0.0 {
            s.pnl_total / s.initial_capital * 100.0
        } else {
            0.0
        }
    }

    /// Export to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Export the equity and PnL curves to CSV.
    pub fn equity_to_csv(&self) -> String {
        let mut csv = String::from("timestamp,equity,pnl_percent\n");
        for (equity, pnl) in self
            .result
            .equity_curve
            .iter()
            .zip(self.result.pnl_curve.iter())
        {
            csv.push_str(&format!(
                "{},{},{}\n",
                equity.timestamp, equity.equity, pnl.pnl_percent
            ));
        }
        csv
    }

    /// Export the trade log to CSV.
    pub fn trades_to_csv(&self) -> String {
        let mut csv = String::from(concat!(
            "trade_id,bar_index,timestamp,event,direction,price,quantity,",
            "commission,pnl,run_up,drawdown,signal\n",
        ));
        for e in &self.result.trade_log {
            let event = if e.is_entry() { "entry" } else { "exit" };
            csv.push_str(&format!(
                "{},{},{},{},{},{},{},{},{},{},{},\"{}\"\n",
                e.trade_id,
                e.bar_index,
                e.timestamp,
                event,
                e.direction,
                e.price,
                e.quantity,
                e.commission,
                optional(e.pnl),
                optional(e.run_up_amount),
                optional(e.drawdown_amount),
                e.signal.replace('"', "\"\"")
            ));
        }
        csv
    }
}

fn optional(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
