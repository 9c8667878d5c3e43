//! The single open position of a run.

use backtest_core::types::{Bar, Direction};
use backtest_risk::Levels;

/// An open position. At most one exists at any time.
#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub trade_id: u64,
    pub direction: Direction,
    /// Bar on whose close the position was opened
    pub entry_bar: usize,
    pub entry_price: f64,
    pub quantity: f64,
    pub entry_commission: f64,
    /// Protective levels; none for the minimal crossover
    pub levels: Option<Levels>,
    /// Best price seen since entry, the trailing stop reference
    pub anchor: f64,
    /// Best favorable excursion in price units
    pub run_up: f64,
    /// Worst adverse excursion in price units
    pub drawdown: f64,
    pub bars_held: usize,
}

impl OpenPosition {
    pub fn new(
        trade_id: u64,
        direction: Direction,
        entry_bar: usize,
        entry_price: f64,
        quantity: f64,
        entry_commission: f64,
        levels: Option<Levels>,
    ) -> Self {
        Self {
            trade_id,
            direction,
            entry_bar,
            entry_price,
            quantity,
            entry_commission,
            levels,
            anchor: entry_price,
            run_up: 0.0,
            drawdown: 0.0,
            bars_held: 0,
        }
    }

    /// Price move in the position's favor, per unit.
    #[inline]
    pub fn favorable_move(&self, price: f64) -> f64 {
        self.direction.sign() * (price - self.entry_price)
    }

    /// Unrealized PnL at `price`, net of the entry commission.
    pub fn unrealized_pnl(&self, price: f64) -> f64 {
        self.favorable_move(price) * self.quantity - self.entry_commission
    }

    /// Fold a bar's range into the excursions.
    pub fn observe_bar(&mut self, bar: &Bar) {
        self.bars_held += 1;
        let (best, worst) = match self.direction {
            Direction::Long => (bar.high, bar.low),
            Direction::Short => (bar.low, bar.high),
        };
        self.observe_price(best);
        self.observe_price(worst);
    }

    /// Fold a single price into the excursions.
    pub fn observe_price(&mut self, price: f64) {
        let moved = self.favorable_move(price);
        self.run_up = self.run_up.max(moved);
        self.drawdown = self.drawdown.max(-moved);
    }

    /// Move the trailing anchor to the best price of `bar`.
    pub fn advance_anchor(&mut self, bar: &Bar) {
        self.anchor = match self.direction {
            Direction::Long => self.anchor.max(bar.high),
            Direction::Short => self.anchor.min(bar.low),
        };
    }
}
