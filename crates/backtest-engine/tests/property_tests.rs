//! Property tests for engine invariants.
//!
//! Uses proptest to verify:
//! 1. Determinism: identical inputs serialize to identical JSON
//! 2. Curve lengths match the bar count
//! 3. Trade ids pair each exit with the entry before it
//! 4. Drawdown stays within [0, 100] and no output is non-finite
//! 5. Fill prices sit on the tick grid when price rounding is on
//! 6. The minimal crossover never exits on a level
//! 7. Equity that never decreases has no drawdown

use proptest::prelude::*;

use backtest_core::types::{
    BacktestResult, Bar, CostConfig, DirectionFilter, EventType, RoundingFlags,
};
use backtest_engine::run_backtest;
use backtest_risk::{ExitParams, SlTpMethod};
use backtest_strategies::{
    ConfirmationMode, CrossoverParams, EmaVwapParams, MinimalCrossoverParams, StrategyParams,
};

// ── Strategies (proptest) ────────────────────────────────────────────

fn arb_bars() -> impl Strategy<Value = Vec<Bar>> {
    (
        20.0..500.0_f64,
        prop::collection::vec(
            (-0.03..0.03_f64, 0.0..0.01_f64, 0.0..0.01_f64, 1.0..1000.0_f64),
            30..200,
        ),
    )
        .prop_map(|(start, steps)| {
            let mut prev_close = start;
            steps
                .into_iter()
                .enumerate()
                .map(|(i, (ret, up, down, volume))| {
                    let open = prev_close;
                    let close = open * (1.0 + ret);
                    prev_close = close;
                    Bar::new(
                        i as i64 * 3_600_000,
                        open,
                        open.max(close) * (1.0 + up),
                        open.min(close) * (1.0 - down),
                        close,
                        volume,
                    )
                })
                .collect()
        })
}

/// Strictly rising closes, each bar spanning the previous close to its own.
fn arb_rising_bars() -> impl Strategy<Value = Vec<Bar>> {
    (20.0..500.0_f64, prop::collection::vec(0.0001..0.02_f64, 30..200)).prop_map(
        |(start, steps)| {
            let mut prev_close = start;
            steps
                .into_iter()
                .enumerate()
                .map(|(i, step)| {
                    let open = prev_close;
                    let close = open * (1.0 + step);
                    prev_close = close;
                    Bar::new(i as i64 * 3_600_000, open, close, open, close, 100.0)
                })
                .collect()
        },
    )
}

fn arb_method() -> impl Strategy<Value = SlTpMethod> {
    prop_oneof![
        Just(SlTpMethod::RiskBased),
        Just(SlTpMethod::FixedPercent),
        Just(SlTpMethod::TrailingPercent),
        Just(SlTpMethod::Combined),
    ]
}

fn arb_exits() -> impl Strategy<Value = ExitParams> {
    (arb_method(), 0.5..8.0_f64, 0.5..15.0_f64).prop_map(|(method, sl, tp)| ExitParams {
        sl_tp_method: method,
        atr_length: 5,
        fixed_sl_perc: sl,
        fixed_tp_perc: tp,
        trailing_sl_perc: sl,
        ..Default::default()
    })
}

fn arb_params() -> impl Strategy<Value = StrategyParams> {
    let crossover = (2..6usize, 7..20usize, arb_exits()).prop_map(|(fast, slow, exits)| {
        StrategyParams::Crossover(CrossoverParams {
            fast_period: fast,
            slow_period: slow,
            exits,
            ..Default::default()
        })
    });
    let minimal = (2..6usize, 7..20usize).prop_map(|(fast, slow)| {
        StrategyParams::CrossoverMinimal(MinimalCrossoverParams {
            fast_period: fast,
            slow_period: slow,
            ..Default::default()
        })
    });
    let ema_vwap = (3..15usize, arb_exits(), any::<bool>()).prop_map(|(period, exits, confirm)| {
        StrategyParams::EmaVwap(EmaVwapParams {
            ema_period: period,
            confirmation_mode: if confirm {
                ConfirmationMode::OnClose
            } else {
                ConfirmationMode::Off
            },
            exits,
            ..Default::default()
        })
    });
    prop_oneof![crossover, minimal, ema_vwap]
}

fn cost() -> CostConfig {
    CostConfig {
        commission_percent: 0.1,
        slippage_ticks: 2.0,
        tick_size: 0.01,
        step_size: 0.001,
    }
}

fn run(bars: &[Bar], params: &StrategyParams) -> BacktestResult {
    run_backtest(bars, cost(), 10_000.0, params, RoundingFlags::all()).unwrap()
}

proptest! {
    #[test]
    fn identical_inputs_identical_output(bars in arb_bars(), params in arb_params()) {
        let a = serde_json::to_string(&run(&bars, &params)).unwrap();
        let b = serde_json::to_string(&run(&bars, &params)).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn curves_cover_every_bar(bars in arb_bars(), params in arb_params()) {
        let result = run(&bars, &params);
        prop_assert_eq!(result.equity_curve.len(), bars.len());
        prop_assert_eq!(result.pnl_curve.len(), bars.len());
        prop_assert_eq!(result.bar_log.len(), bars.len());
        prop_assert_eq!(result.summary.bars_processed, bars.len());
    }

    #[test]
    fn trade_ids_pair_entries_and_exits(bars in arb_bars(), params in arb_params()) {
        let result = run(&bars, &params);
        let mut open: Option<u64> = None;
        let mut next_id = 1;

        for event in &result.trade_log {
            match event.event_type {
                EventType::Entry => {
                    prop_assert!(open.is_none());
                    prop_assert_eq!(event.trade_id, next_id);
                    open = Some(event.trade_id);
                    next_id += 1;
                }
                EventType::Exit => {
                    prop_assert_eq!(open, Some(event.trade_id));
                    prop_assert!(event.pnl.is_some());
                    prop_assert!(event.run_up_amount.unwrap() >= 0.0);
                    prop_assert!(event.drawdown_amount.unwrap() >= 0.0);
                    open = None;
                }
            }
        }
        prop_assert_eq!(result.summary.total_trades, result.exits().count());
    }

    #[test]
    fn drawdown_bounded_and_finite(bars in arb_bars(), params in arb_params()) {
        let s = run(&bars, &params).summary;
        prop_assert!((0.0..=100.0).contains(&s.max_drawdown_percent));
        prop_assert!(s.max_drawdown_amount >= 0.0);
        prop_assert!(s.profit_factor.is_finite() && s.profit_factor >= 0.0);
        prop_assert!(s.equity_final.is_finite());
        prop_assert!(s.win_rate_percent.is_finite());
    }

    #[test]
    fn fills_on_tick_grid(bars in arb_bars(), params in arb_params()) {
        let tick = cost().tick_size;
        for event in &run(&bars, &params).trade_log {
            let ticks = event.price / tick;
            prop_assert!(
                (ticks - ticks.round()).abs() <= 1e-9 * ticks.abs().max(1.0),
                "price {} is not a multiple of {}", event.price, tick
            );
        }
    }

    #[test]
    fn minimal_never_exits_on_levels(bars in arb_bars(), fast in 2..6usize, slow in 7..20usize) {
        let params = StrategyParams::CrossoverMinimal(MinimalCrossoverParams {
            fast_period: fast,
            slow_period: slow,
            ..Default::default()
        });
        for exit in run(&bars, &params).exits() {
            prop_assert!(!exit.exit_reason.unwrap().is_level_exit());
        }
    }

    #[test]
    fn rising_equity_has_no_drawdown(
        bars in arb_rising_bars(),
        fast in 2..6usize,
        slow in 7..20usize
    ) {
        let params = StrategyParams::CrossoverMinimal(MinimalCrossoverParams {
            fast_period: fast,
            slow_period: slow,
            direction: DirectionFilter::Long,
            ..Default::default()
        });
        let no_cost = CostConfig {
            commission_percent: 0.0,
            slippage_ticks: 0.0,
            ..cost()
        };
        let result =
            run_backtest(&bars, no_cost, 10_000.0, &params, RoundingFlags::none()).unwrap();

        prop_assert!(result.entries().count() > 0);
        prop_assert!(result.equity_curve[0].equity >= result.summary.initial_capital);
        for pair in result.equity_curve.windows(2) {
            prop_assert!(pair[1].equity >= pair[0].equity);
        }
        prop_assert_eq!(result.summary.max_drawdown_percent, 0.0);
        prop_assert_eq!(result.summary.max_drawdown_amount, 0.0);
    }
}
