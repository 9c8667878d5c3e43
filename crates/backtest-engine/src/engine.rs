//! Bar-by-bar simulation.
//!
//! Per bar, in order:
//! 1. Update indicators and the signal generator
//! 2. If a position opened on an earlier bar is still open, fold the bar into
//!    its excursions and check its stop and target (stop first)
//! 3. Advance the trailing stop, after the stop check
//! 4. On an opposite signal, exit at the close
//! 5. If flat and a signal fired, attempt an entry at the close
//! 6. Mark to market and record the bar

use std::collections::BTreeMap;
use tracing::{debug, trace};

use backtest_core::error::{EngineError, ValidationError};
use backtest_core::traits::BarIndicator;
use backtest_core::types::{
    validate_bars, BacktestResult, Bar, BarRecord, CostConfig, DirectionFilter, EventType,
    ExitReason, PositionSide, RoundingFlags, TradeEvent,
};
use backtest_execution::ExecutionModel;
use backtest_indicators::StreamingAtr;
use backtest_risk::{
    check_levels, initial_levels, observe_equity, trail, EntryGuards, ExitParams, GuardCheck,
    GuardParams, LevelHit, PositionSizer, RunState, SizingParams,
};
use backtest_strategies::{
    CrossoverParams, EmaVwapParams, MinimalCrossoverParams, Signal, SignalGenerator,
    StrategyParams,
};

use crate::position::OpenPosition;
use crate::statistics::Aggregator;

/// Run the SMA crossover with protective exits and guards.
pub fn run_crossover_backtest(
    bars: &[Bar],
    cost: CostConfig,
    initial_capital: f64,
    params: &CrossoverParams,
) -> Result<BacktestResult, EngineError> {
    run_backtest(
        bars,
        cost,
        initial_capital,
        &StrategyParams::Crossover(params.clone()),
        params.rounding,
    )
}

/// Run the SMA crossover that only exits on the opposite crossover.
pub fn run_crossover_minimal_backtest(
    bars: &[Bar],
    cost: CostConfig,
    initial_capital: f64,
    params: &MinimalCrossoverParams,
    rounding: RoundingFlags,
) -> Result<BacktestResult, EngineError> {
    run_backtest(
        bars,
        cost,
        initial_capital,
        &StrategyParams::CrossoverMinimal(params.clone()),
        rounding,
    )
}

/// Run the EMA/VWAP strategy.
pub fn run_ema_vwap_backtest(
    bars: &[Bar],
    cost: CostConfig,
    initial_capital: f64,
    params: &EmaVwapParams,
) -> Result<BacktestResult, EngineError> {
    run_backtest(
        bars,
        cost,
        initial_capital,
        &StrategyParams::EmaVwap(params.clone()),
        params.rounding,
    )
}

/// Run any strategy family.
///
/// `rounding` applies to the minimal crossover. The other families carry
/// their own flags, which take precedence.
pub fn run_backtest(
    bars: &[Bar],
    cost: CostConfig,
    initial_capital: f64,
    params: &StrategyParams,
    rounding: RoundingFlags,
) -> Result<BacktestResult, EngineError> {
    validate_inputs(bars, &cost, initial_capital, params)?;

    debug!(
        strategy = params.name(),
        bars = bars.len(),
        initial_capital,
        "Starting backtest"
    );

    let result = Simulation::new(bars.len(), cost, initial_capital, params, rounding).run(bars);

    debug!(
        strategy = params.name(),
        trades = result.summary.total_trades,
        equity_final = result.summary.equity_final,
        max_drawdown_pct = result.summary.max_drawdown_percent,
        "Backtest complete"
    );

    Ok(result)
}

fn validate_inputs(
    bars: &[Bar],
    cost: &CostConfig,
    initial_capital: f64,
    params: &StrategyParams,
) -> Result<(), ValidationError> {
    validate_bars(bars)?;
    cost.validate()?;
    if !(initial_capital.is_finite() && initial_capital > 0.0) {
        return Err(ValidationError::InvalidCapital(initial_capital));
    }
    params.validate()
}

/// Per-family behavior resolved once per run.
#[derive(Debug, Clone, Copy)]
struct RunRules {
    sizing: SizingParams,
    exits: Option<ExitParams>,
    guards: GuardParams,
    direction: DirectionFilter,
    dmi_threshold: Option<f64>,
    /// Reason recorded when an opposite signal closes the position
    signal_exit: ExitReason,
    rounding: RoundingFlags,
}

impl RunRules {
    fn from_params(params: &StrategyParams, rounding: RoundingFlags) -> Self {
        match params {
            StrategyParams::Crossover(p) => Self {
                sizing: p.sizing,
                exits: Some(p.exits),
                guards: p.guards,
                direction: p.direction,
                dmi_threshold: None,
                signal_exit: ExitReason::Reversal,
                rounding: p.rounding,
            },
            StrategyParams::CrossoverMinimal(p) => Self {
                sizing: p.sizing,
                exits: None,
                guards: GuardParams::default(),
                direction: p.direction,
                dmi_threshold: None,
                signal_exit: ExitReason::OppositeCrossover,
                rounding,
            },
            StrategyParams::EmaVwap(p) => Self {
                sizing: p.sizing,
                exits: Some(p.exits),
                guards: p.guards,
                direction: p.direction,
                dmi_threshold: p.enable_dmi_filter.then_some(p.dmi_threshold),
                signal_exit: ExitReason::Reversal,
                rounding: p.rounding,
            },
        }
    }
}

/// Mutable state of one run. Created per invocation and dropped after it.
struct Simulation {
    initial_capital: f64,
    rules: RunRules,
    execution: ExecutionModel,
    sizer: PositionSizer,
    guards: EntryGuards,
    generator: SignalGenerator,
    /// ATR for risk-based levels
    atr: Option<StreamingAtr>,
    state: RunState,
    position: Option<OpenPosition>,
    realized: f64,
    next_trade_id: u64,
    stats: Aggregator,
}

impl Simulation {
    fn new(
        bars: usize,
        cost: CostConfig,
        initial_capital: f64,
        params: &StrategyParams,
        rounding: RoundingFlags,
    ) -> Self {
        let rules = RunRules::from_params(params, rounding);

        let mut guards = EntryGuards::new(rules.guards, rules.direction);
        if let Some(threshold) = rules.dmi_threshold {
            guards = guards.with_dmi_filter(threshold);
        }

        let atr = rules
            .exits
            .filter(|exits| exits.needs_atr())
            .map(|exits| StreamingAtr::new(exits.atr_length));

        Self {
            initial_capital,
            rules,
            execution: ExecutionModel::new(cost, rules.rounding),
            sizer: PositionSizer::new(rules.sizing),
            guards,
            generator: SignalGenerator::from_params(params),
            atr,
            state: RunState::new(initial_capital),
            position: None,
            realized: 0.0,
            next_trade_id: 1,
            stats: Aggregator::new(initial_capital, bars),
        }
    }

    fn run(mut self, bars: &[Bar]) -> BacktestResult {
        for (index, bar) in bars.iter().enumerate() {
            self.step(index, bar);
        }

        let pnl_open = match (&self.position, bars.last()) {
            (Some(position), Some(last)) => position.unrealized_pnl(last.close),
            _ => 0.0,
        };
        let max_consecutive_losses = self.state.max_consecutive_losses;
        self.stats
            .finalize(self.realized, pnl_open, max_consecutive_losses)
    }

    fn step(&mut self, index: usize, bar: &Bar) {
        let atr = self.atr.as_mut().and_then(|atr| atr.update(bar));
        let signal = self.generator.update(bar);
        let mut notes = Vec::new();

        self.manage_open_position(index, bar);

        if let Some(signal) = signal {
            let open_direction = self.position.as_ref().map(|p| p.direction);
            match open_direction {
                Some(direction) if direction != signal.direction => {
                    let reason = format!("{}: {}", self.rules.signal_exit, signal.reason);
                    self.close_position(index, bar, bar.close, self.rules.signal_exit, reason);
                    self.try_enter(index, bar, &signal, atr, &mut notes);
                }
                Some(_) => {}
                None => self.try_enter(index, bar, &signal, atr, &mut notes),
            }
        }

        let equity = self.equity(bar.close);
        observe_equity(&self.rules.guards, &mut self.state, equity);

        let mut indicators = BTreeMap::new();
        self.generator.record_indicators(&mut indicators);
        if let Some(atr) = atr {
            indicators.insert("atr".to_string(), atr);
        }
        if let Some(levels) = self.position.as_ref().and_then(|p| p.levels) {
            indicators.insert("stop".to_string(), levels.stop);
            if let Some(target) = levels.target {
                indicators.insert("target".to_string(), target);
            }
        }

        self.stats.record_bar(BarRecord {
            bar_index: index,
            timestamp: bar.timestamp,
            close: bar.close,
            position: self
                .position
                .as_ref()
                .map(|p| PositionSide::from(p.direction))
                .unwrap_or_default(),
            equity,
            indicators,
            notes,
        });
    }

    /// Intrabar exits and trailing for a position opened on an earlier bar.
    fn manage_open_position(&mut self, index: usize, bar: &Bar) {
        let Some(position) = self.position.as_mut() else {
            return;
        };
        if position.entry_bar >= index {
            return;
        }

        position.observe_bar(bar);

        let Some(levels) = position.levels else {
            return;
        };

        if let Some(hit) = check_levels(&levels, position.direction, bar) {
            let (reason, label) = match hit {
                LevelHit::Stop { .. } => (levels.stop_reason(), levels.stop_label()),
                LevelHit::Target { .. } => (ExitReason::TakeProfit, levels.target_label()),
            };
            self.close_position(index, bar, hit.price(), reason, label.to_string());
            return;
        }

        if let Some(exits) = self.rules.exits {
            position.advance_anchor(bar);
            let execution = self.execution;
            position.levels = Some(trail(
                &exits,
                position.direction,
                &levels,
                position.anchor,
                |level| execution.round_level(level),
            ));
        }
    }

    fn close_position(
        &mut self,
        index: usize,
        bar: &Bar,
        raw_price: f64,
        reason: ExitReason,
        label: String,
    ) {
        let Some(mut position) = self.position.take() else {
            return;
        };

        let fill = self
            .execution
            .fill_exit(raw_price, position.quantity, position.direction);
        position.observe_price(fill.price);

        let pnl = position.favorable_move(fill.price) * position.quantity
            - position.entry_commission
            - fill.commission;
        self.realized += pnl;
        self.state.record_closed_trade(pnl);

        let event = TradeEvent {
            trade_id: position.trade_id,
            bar_index: index,
            timestamp: bar.timestamp,
            event_type: EventType::Exit,
            direction: position.direction,
            signal: label,
            exit_reason: Some(reason),
            price: fill.price,
            quantity: fill.quantity,
            commission: fill.commission,
            pnl: Some(pnl),
            run_up_amount: Some(position.run_up),
            drawdown_amount: Some(position.drawdown),
        };
        trace!(
            trade_id = event.trade_id,
            bar = index,
            reason = %reason,
            price = event.price,
            pnl,
            "Exit"
        );
        self.stats.record_event(event);
    }

    fn try_enter(
        &mut self,
        index: usize,
        bar: &Bar,
        signal: &Signal,
        atr: Option<f64>,
        notes: &mut Vec<String>,
    ) {
        let direction = signal.direction;
        let equity = self.equity(bar.close);
        observe_equity(&self.rules.guards, &mut self.state, equity);

        if let GuardCheck::Blocked { reason } =
            self.guards.check(&self.state, direction, self.generator.adx())
        {
            debug!(bar = index, %direction, %reason, "Entry blocked");
            notes.push(format!("{} entry blocked: {}", direction, reason));
            return;
        }

        let price = self.execution.apply_entry_cost(bar.close, direction);
        let mut quantity = self.sizer.calculate(equity, price);
        if self.sizer.rounds_to_step() {
            quantity = self.execution.round_quantity(quantity);
        }
        if quantity <= 0.0 {
            debug!(bar = index, %direction, "Entry skipped, quantity rounds to zero");
            notes.push(format!("{} entry skipped: quantity rounds to zero", direction));
            return;
        }

        let levels = match self.rules.exits {
            Some(exits) => {
                let execution = self.execution;
                match initial_levels(&exits, direction, price, atr, |level| {
                    execution.round_level(level)
                }) {
                    Some(levels) => Some(levels),
                    None => {
                        debug!(bar = index, %direction, "Entry skipped, ATR not ready");
                        notes.push(format!("{} entry skipped: ATR not ready", direction));
                        return;
                    }
                }
            }
            None => None,
        };

        let fill = self.execution.fill_entry(bar.close, quantity, direction);
        let trade_id = self.next_trade_id;
        self.next_trade_id += 1;

        self.position = Some(OpenPosition::new(
            trade_id,
            direction,
            index,
            fill.price,
            fill.quantity,
            fill.commission,
            levels,
        ));

        let event = TradeEvent {
            trade_id,
            bar_index: index,
            timestamp: bar.timestamp,
            event_type: EventType::Entry,
            direction,
            signal: signal.reason.clone(),
            exit_reason: None,
            price: fill.price,
            quantity: fill.quantity,
            commission: fill.commission,
            pnl: None,
            run_up_amount: None,
            drawdown_amount: None,
        };
        trace!(
            trade_id,
            bar = index,
            %direction,
            price = event.price,
            quantity = event.quantity,
            "Entry"
        );
        self.stats.record_event(event);
    }

    /// Mark-to-market equity at `price`.
    fn equity(&self, price: f64) -> f64 {
        let open = self
            .position
            .as_ref()
            .map(|p| p.unrealized_pnl(price))
            .unwrap_or(0.0);
        self.initial_capital + self.realized + open
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use backtest_core::types::{Direction, PriceSource};
    use backtest_risk::{OrderSizeMode, SlTpMethod};

    const DAY: i64 = 86_400_000;

    fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> Bar {
        Bar::new(i as i64 * DAY, open, high, low, close, 1_000.0)
    }

    fn flat_bar(i: usize, close: f64) -> Bar {
        bar(i, close, close, close, close)
    }

    fn no_cost() -> CostConfig {
        CostConfig {
            commission_percent: 0.0,
            slippage_ticks: 0.0,
            tick_size: 0.01,
            step_size: 0.0001,
        }
    }

    /// fast 2 / slow 3: level until the cross on bar 5
    fn long_setup() -> Vec<Bar> {
        [8.0, 8.0, 8.0, 8.0, 8.0, 10.0]
            .iter()
            .enumerate()
            .map(|(i, &c)| flat_bar(i, c))
            .collect()
    }

    fn crossover(method: SlTpMethod) -> CrossoverParams {
        CrossoverParams {
            fast_period: 2,
            slow_period: 3,
            source: PriceSource::Close,
            sizing: SizingParams {
                order_size_mode: OrderSizeMode::FixedQuantity,
                order_size_value: 1.0,
            },
            exits: ExitParams {
                sl_tp_method: method,
                fixed_sl_perc: 10.0,
                fixed_tp_perc: 20.0,
                trailing_sl_perc: 10.0,
                ..Default::default()
            },
            rounding: RoundingFlags::none(),
            ..Default::default()
        }
    }

    #[test]
    fn test_validation_is_atomic() {
        let bars = long_setup();
        let params = crossover(SlTpMethod::FixedPercent);

        assert!(matches!(
            run_crossover_backtest(&[], no_cost(), 1_000.0, &params),
            Err(EngineError::Validation(ValidationError::EmptyBars))
        ));
        assert!(matches!(
            run_crossover_backtest(&bars, no_cost(), 0.0, &params),
            Err(EngineError::Validation(ValidationError::InvalidCapital(_)))
        ));

        let mut unordered = bars.clone();
        unordered.swap(1, 2);
        assert!(matches!(
            run_crossover_backtest(&unordered, no_cost(), 1_000.0, &params),
            Err(EngineError::Validation(ValidationError::NonMonotonicTimestamp { .. }))
        ));

        let bad_cost = CostConfig {
            tick_size: 0.0,
            ..no_cost()
        };
        assert!(matches!(
            run_crossover_backtest(&bars, bad_cost, 1_000.0, &params),
            Err(EngineError::Validation(ValidationError::InvalidCost(_)))
        ));
    }

    #[test]
    fn test_entry_at_close_of_signal_bar() {
        let params = crossover(SlTpMethod::FixedPercent);
        let result = run_crossover_backtest(&long_setup(), no_cost(), 1_000.0, &params).unwrap();

        assert_eq!(result.trade_log.len(), 1);
        let entry = &result.trade_log[0];
        assert_eq!(entry.trade_id, 1);
        assert_eq!(entry.bar_index, 5);
        assert_eq!(entry.direction, Direction::Long);
        assert_eq!(entry.price, 10.0);
        assert!(entry.signal.starts_with("Bullish crossover"));

        // Still open after the last bar
        assert_eq!(result.bar_log[5].position, PositionSide::Long);
        assert_eq!(result.summary.total_trades, 0);
        assert_eq!(result.summary.pnl_open, 0.0);
    }

    #[test]
    fn test_stop_wins_simultaneous_touch() {
        let mut bars = long_setup();
        // Stop 9.0, target 12.0: both touched on bar 6
        bars.push(bar(6, 10.0, 12.5, 8.5, 10.0));

        let params = crossover(SlTpMethod::FixedPercent);
        let result = run_crossover_backtest(&bars, no_cost(), 1_000.0, &params).unwrap();
        let exit = result.exits().next().unwrap();

        assert_eq!(exit.exit_reason, Some(ExitReason::StopLoss));
        assert!((exit.price - 9.0).abs() < 1e-9);
        assert!((exit.pnl.unwrap() + 1.0).abs() < 1e-9);
        assert_eq!(exit.run_up_amount, Some(2.5));
        assert_eq!(exit.drawdown_amount, Some(1.5));
    }

    #[test]
    fn test_gap_through_stop_fills_at_open() {
        let mut bars = long_setup();
        bars.push(bar(6, 8.0, 8.2, 7.5, 7.8));

        let params = crossover(SlTpMethod::FixedPercent);
        let result = run_crossover_backtest(&bars, no_cost(), 1_000.0, &params).unwrap();
        let exit = result.exits().next().unwrap();

        assert_eq!(exit.exit_reason, Some(ExitReason::StopLoss));
        assert_eq!(exit.price, 8.0);
    }

    #[test]
    fn test_target_exit() {
        let mut bars = long_setup();
        bars.push(bar(6, 10.5, 12.5, 10.2, 12.2));

        let params = crossover(SlTpMethod::FixedPercent);
        let result = run_crossover_backtest(&bars, no_cost(), 1_000.0, &params).unwrap();
        let exit = result.exits().next().unwrap();

        assert_eq!(exit.exit_reason, Some(ExitReason::TakeProfit));
        assert!((exit.price - 12.0).abs() < 1e-9);
        assert_eq!(result.summary.profit_factor, crate::PROFIT_FACTOR_CAP);
    }

    #[test]
    fn test_trailing_stop_does_not_fire_on_the_bar_that_raises_it() {
        let mut bars = long_setup();
        // Anchor 10 -> 12, stop 9 -> 10.8, but this bar's low only reaches 10.9
        bars.push(bar(6, 10.0, 12.0, 10.9, 11.5));
        // Next bar drops through the raised stop
        bars.push(bar(7, 11.2, 11.3, 10.5, 10.6));

        let params = crossover(SlTpMethod::TrailingPercent);
        let result = run_crossover_backtest(&bars, no_cost(), 1_000.0, &params).unwrap();
        let exit = result.exits().next().unwrap();

        assert_eq!(exit.bar_index, 7);
        assert_eq!(exit.exit_reason, Some(ExitReason::TrailingStop));
        assert!((exit.price - 10.8).abs() < 1e-9);
    }

    #[test]
    fn test_risk_based_entry_skipped_without_atr() {
        let mut params = crossover(SlTpMethod::RiskBased);
        params.exits.atr_length = 50;

        let result = run_crossover_backtest(&long_setup(), no_cost(), 1_000.0, &params).unwrap();
        assert!(result.trade_log.is_empty());
        assert!(result.bar_log[5]
            .notes
            .iter()
            .any(|n| n.contains("ATR not ready")));
    }

    /// Same closes as `long_setup`, with a one-point range on every bar so
    /// ATR(2) is 1.75 at the entry bar.
    fn ranged_setup() -> Vec<Bar> {
        [8.0, 8.0, 8.0, 8.0, 8.0, 10.0]
            .iter()
            .enumerate()
            .map(|(i, &c)| bar(i, c, c + 0.5, c - 0.5, c))
            .collect()
    }

    fn combined(fixed_tp_perc: f64) -> CrossoverParams {
        let mut params = crossover(SlTpMethod::Combined);
        params.exits.atr_length = 2;
        params.exits.atr_mult_rb = 1.0;
        params.exits.reward_mult_rb = 2.0;
        params.exits.fixed_tp_perc = fixed_tp_perc;
        params
    }

    #[test]
    fn test_combined_exit_labels_target_source() {
        // Risk-based: stop 8.25, target 13.5. Fixed: stop 9, target 12 or 15.
        let mut bars = ranged_setup();
        bars.push(bar(6, 10.5, 16.0, 10.2, 15.5));

        let result = run_crossover_backtest(&bars, no_cost(), 1_000.0, &combined(20.0)).unwrap();
        let levels = &result.bar_log[5].indicators;
        assert!((levels["stop"] - 9.0).abs() < 1e-9);
        assert!((levels["target"] - 12.0).abs() < 1e-9);

        let exit = result.exits().next().unwrap();
        assert_eq!(exit.bar_index, 6);
        assert_eq!(exit.exit_reason, Some(ExitReason::TakeProfit));
        assert_eq!(exit.signal, "TakeProfit (fixed)");
        assert!((exit.price - 12.0).abs() < 1e-9);

        let result = run_crossover_backtest(&bars, no_cost(), 1_000.0, &combined(50.0)).unwrap();
        let exit = result.exits().next().unwrap();
        assert_eq!(exit.exit_reason, Some(ExitReason::TakeProfit));
        assert_eq!(exit.signal, "TakeProfit (risk-based)");
        assert!((exit.price - 13.5).abs() < 1e-9);
    }

    #[test]
    fn test_reversal_on_opposite_signal() {
        let closes = [8.0, 8.0, 8.0, 8.0, 8.0, 10.0, 10.5, 10.0, 8.0];
        let bars: Vec<Bar> = closes
            .iter()
            .enumerate()
            .map(|(i, &c)| flat_bar(i, c))
            .collect();
        let mut params = crossover(SlTpMethod::FixedPercent);
        params.exits.fixed_sl_perc = 50.0;

        let result = run_crossover_backtest(&bars, no_cost(), 1_000.0, &params).unwrap();
        let kinds: Vec<(EventType, Direction, usize)> = result
            .trade_log
            .iter()
            .map(|e| (e.event_type, e.direction, e.bar_index))
            .collect();

        assert_eq!(
            kinds,
            vec![
                (EventType::Entry, Direction::Long, 5),
                (EventType::Exit, Direction::Long, 8),
                (EventType::Entry, Direction::Short, 8),
            ]
        );
        assert_eq!(result.trade_log[1].exit_reason, Some(ExitReason::Reversal));
        assert_eq!(result.trade_log[2].trade_id, 2);
    }

    #[test]
    fn test_commission_and_slippage_reach_pnl() {
        let mut bars = long_setup();
        bars.push(bar(6, 10.5, 12.5, 10.2, 12.2));
        let cost = CostConfig {
            commission_percent: 1.0,
            slippage_ticks: 10.0,
            tick_size: 0.01,
            step_size: 0.0001,
        };

        let params = crossover(SlTpMethod::FixedPercent);
        let result = run_crossover_backtest(&bars, cost, 1_000.0, &params).unwrap();
        let entry = &result.trade_log[0];
        let exit = &result.trade_log[1];

        // Entry 10 + 0.1, target 20% above fill, exit 0.1 below target
        assert!((entry.price - 10.1).abs() < 1e-9);
        assert!((exit.price - (10.1 * 1.2 - 0.1)).abs() < 1e-9);
        let expected = (exit.price - entry.price) - entry.commission - exit.commission;
        assert!((exit.pnl.unwrap() - expected).abs() < 1e-9);
        assert!((result.summary.equity_final - (1_000.0 + expected)).abs() < 1e-9);
    }
}
