//! Property tests for the entry-position planner.
//!
//! Uses proptest to verify the two hard invariants:
//! 1. Ordering — every emitted plan has stop < entry < exit, with the stop
//!    also strictly below the current market price
//! 2. Risk gate — every emitted plan respects the risk ceiling and the
//!    risk:reward floor; anything else must be a rejection, never a plan

use proptest::prelude::*;
use signalpilot_core::indicators::BollingerBands;
use signalpilot_core::planner::{plan_entry, PlanError, PlanInputs, PlannerConfig, TopOfBook};

fn arb_price() -> impl Strategy<Value = f64> {
    (100.0..100_000.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

// ATR up to ~1% of a mid-range price so both accepted and rejected plans occur.
fn arb_atr() -> impl Strategy<Value = f64> {
    0.01..600.0_f64
}

fn arb_inputs() -> impl Strategy<Value = PlanInputs> {
    (
        arb_price(),
        arb_atr(),
        0.0..100.0_f64,          // rsi
        prop::option::of(-5.0..5.0_f64), // roc
        0.80..0.999_f64,         // lower band as a fraction of price
        1.001..1.20_f64,         // upper band as a multiple of price
        prop::option::of(0.95..1.05_f64), // vwap as a multiple of price
        prop::option::of(1.0..1.01_f64),  // ask as a multiple of price
    )
        .prop_map(
            |(price, atr, rsi, roc, lower_frac, upper_mult, vwap_mult, ask_mult)| PlanInputs {
                price,
                bar_low: price * 0.99,
                bar_high: price * 1.01,
                atr,
                rsi,
                roc,
                bands: BollingerBands {
                    lower: price * lower_frac,
                    middle: price,
                    upper: price * upper_mult,
                },
                vwap: vwap_mult.map(|m| price * m),
                book: ask_mult.map(|m| TopOfBook {
                    ask: price * m,
                    bid: price * 0.999,
                }),
            },
        )
}

proptest! {
    /// Every plan the planner emits is correctly ordered.
    #[test]
    fn emitted_plans_order_stop_entry_exit(inputs in arb_inputs()) {
        let config = PlannerConfig::default();
        if let Ok(plan) = plan_entry(&inputs, &config) {
            prop_assert!(plan.stop_loss < plan.entry_price);
            // The ask-derived entry can sit above the last trade; the stop
            // must still sit below the market, not just below the entry.
            prop_assert!(plan.stop_loss < inputs.price);
            prop_assert!(plan.entry_price < plan.exit_price);
            // Entry stays inside the triggering bar's range.
            prop_assert!(plan.entry_price >= inputs.bar_low);
            prop_assert!(plan.entry_price <= inputs.bar_high);
        }
    }

    /// Every emitted plan satisfies the risk policy; violations surface as
    /// rejections, never as returned plans.
    #[test]
    fn risk_policy_is_a_hard_gate(inputs in arb_inputs()) {
        let config = PlannerConfig::default();
        match plan_entry(&inputs, &config) {
            Ok(plan) => {
                prop_assert!(plan.risk_pct <= config.max_risk_pct + 1e-9);
                prop_assert!(plan.rr_ratio >= config.min_risk_reward - 1e-9);
                prop_assert!(plan.risk_pct > 0.0);
            }
            Err(PlanError::RiskTooHigh { risk_pct, .. }) => {
                prop_assert!(risk_pct > config.max_risk_pct);
            }
            Err(PlanError::RewardTooLow { rr_ratio, .. }) => {
                prop_assert!(rr_ratio < config.min_risk_reward);
            }
            Err(PlanError::InvalidInput(_)) => {}
        }
    }

    /// The derived percentages are consistent with the absolute levels.
    #[test]
    fn plan_percentages_are_self_consistent(inputs in arb_inputs()) {
        if let Ok(plan) = plan_entry(&inputs, &PlannerConfig::default()) {
            let risk_pct = (plan.entry_price - plan.stop_loss) / plan.entry_price * 100.0;
            let reward_pct = (plan.exit_price - plan.entry_price) / plan.entry_price * 100.0;
            prop_assert!((plan.risk_pct - risk_pct).abs() < 1e-9);
            prop_assert!((plan.reward_pct - reward_pct).abs() < 1e-9);
            prop_assert!((plan.rr_ratio - reward_pct / risk_pct).abs() < 1e-9);
        }
    }
}
