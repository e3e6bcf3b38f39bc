//! Entry-position planner — derives an executable long-entry plan from
//! indicator values, enforcing risk policy as a hard gate.
//!
//! The planner is a pure function of its inputs and configuration. Only
//! BUY-side setups are planned; SELL and HOLD recommendations never carry an
//! entry position.
//!
//! Stop-loss combination rule: the stop is the **max** of the candidate stops
//! (ATR stop, buffered lower Bollinger band, VWAP when it sits below entry) —
//! the highest floor still strictly below entry. The tighter floor keeps the
//! risk percentage small enough to pass the gate while staying under every
//! reference level.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::indicators::BollingerBands;

/// Planner tunables. Defaults mirror the production signal configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// ATR multiples between entry and the ATR-based stop.
    pub atr_buffer: f64,
    /// Percent below the lower Bollinger band for the band-based stop.
    pub bollinger_buffer_pct: f64,
    /// Base risk:reward target before momentum adjustment.
    pub risk_reward_ratio: f64,
    /// Floor for the adjusted ratio; plans below it are rejected.
    pub min_risk_reward: f64,
    /// Hard ceiling on risk as a percentage of entry price.
    pub max_risk_pct: f64,
    /// Weight pulling entry back toward VWAP when price trades above it.
    pub vwap_pullback_weight: f64,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            atr_buffer: 1.75,
            bollinger_buffer_pct: 3.0,
            risk_reward_ratio: 3.0,
            min_risk_reward: 1.5,
            max_risk_pct: 1.0,
            vwap_pullback_weight: 0.6,
        }
    }
}

/// Best visible quote, when order-book depth is available.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TopOfBook {
    pub ask: f64,
    pub bid: f64,
}

/// Everything the planner looks at for one setup.
#[derive(Debug, Clone, Copy)]
pub struct PlanInputs {
    /// Current close.
    pub price: f64,
    /// Low of the triggering bar; entry is clamped into [low, high].
    pub bar_low: f64,
    /// High of the triggering bar.
    pub bar_high: f64,
    pub atr: f64,
    pub rsi: f64,
    pub roc: Option<f64>,
    pub bands: BollingerBands,
    pub vwap: Option<f64>,
    /// Optional order-book capability; the planner falls back to
    /// ATR/Bollinger-only levels when absent.
    pub book: Option<TopOfBook>,
}

/// A concrete long-entry trade plan. Construction goes through
/// [`plan_entry`], which enforces `stop_loss < entry_price < exit_price`,
/// the risk ceiling, and the risk:reward floor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntryPosition {
    pub entry_price: f64,
    pub stop_loss: f64,
    pub exit_price: f64,
    pub risk_pct: f64,
    pub reward_pct: f64,
    pub rr_ratio: f64,
    pub position_size: Option<f64>,
    pub rationale: String,
}

/// Planner failures. `RiskTooHigh` and `RewardTooLow` are expected,
/// non-exceptional outcomes: the cycle proceeds with no actionable trade
/// rather than retrying with different parameters.
#[derive(Debug, Error)]
pub enum PlanError {
    #[error("plan rejected: risk {risk_pct:.2}% exceeds maximum {max_risk_pct:.2}%")]
    RiskTooHigh { risk_pct: f64, max_risk_pct: f64 },

    #[error("plan rejected: risk:reward {rr_ratio:.2} below minimum {min_risk_reward:.2}")]
    RewardTooLow {
        rr_ratio: f64,
        min_risk_reward: f64,
    },

    #[error("invalid planner input: {0}")]
    InvalidInput(String),
}

impl PlanError {
    /// True for the risk-policy rejections a cycle treats as "no trade".
    pub fn is_rejection(&self) -> bool {
        matches!(self, PlanError::RiskTooHigh { .. } | PlanError::RewardTooLow { .. })
    }
}

/// Derive a long-entry plan, or reject it on risk policy.
pub fn plan_entry(inputs: &PlanInputs, config: &PlannerConfig) -> Result<EntryPosition, PlanError> {
    validate_inputs(inputs)?;

    let entry_price = entry_price(inputs, config);
    let stop_loss = stop_loss(entry_price, inputs, config);
    let adjusted_rr = adjusted_risk_reward(inputs, config);

    let risk = entry_price - stop_loss;
    let raw_exit = entry_price + risk * adjusted_rr;
    let exit_price = cap_exit(raw_exit, entry_price, inputs);

    let risk_pct = risk / entry_price * 100.0;
    let reward = exit_price - entry_price;
    let reward_pct = reward / entry_price * 100.0;
    let rr_ratio = reward_pct / risk_pct;

    if risk_pct > config.max_risk_pct {
        return Err(PlanError::RiskTooHigh {
            risk_pct,
            max_risk_pct: config.max_risk_pct,
        });
    }
    if rr_ratio < config.min_risk_reward {
        return Err(PlanError::RewardTooLow {
            rr_ratio,
            min_risk_reward: config.min_risk_reward,
        });
    }

    let rationale = format!(
        "Entry {entry_price:.4} (market {:.4}, vwap {}, ask {}); \
         stop {stop_loss:.4} = max(ATR stop {:.4}, band stop {:.4}{}); \
         target RR {adjusted_rr:.2} (base {:.2}); exit {exit_price:.4} \
         (raw {raw_exit:.4}, capped at band upper {:.4}); \
         risk {risk_pct:.3}% reward {reward_pct:.3}% rr {rr_ratio:.2}",
        inputs.price,
        opt(inputs.vwap),
        opt(inputs.book.map(|b| b.ask)),
        entry_price - inputs.atr * config.atr_buffer,
        inputs.bands.lower * (1.0 - config.bollinger_buffer_pct / 100.0),
        inputs
            .vwap
            .filter(|v| *v < entry_price.min(inputs.price))
            .map(|v| format!(", vwap stop {v:.4}"))
            .unwrap_or_default(),
        config.risk_reward_ratio,
        inputs.bands.upper,
    );

    Ok(EntryPosition {
        entry_price,
        stop_loss,
        exit_price,
        risk_pct,
        reward_pct,
        rr_ratio,
        position_size: None,
        rationale,
    })
}

fn opt(value: Option<f64>) -> String {
    value.map(|v| format!("{v:.4}")).unwrap_or_else(|| "n/a".into())
}

fn validate_inputs(inputs: &PlanInputs) -> Result<(), PlanError> {
    if !(inputs.price > 0.0) {
        return Err(PlanError::InvalidInput(format!(
            "price must be positive, got {}",
            inputs.price
        )));
    }
    if !(inputs.atr > 0.0) || !inputs.atr.is_finite() {
        return Err(PlanError::InvalidInput(format!(
            "atr must be positive and finite, got {}",
            inputs.atr
        )));
    }
    if inputs.bands.is_nan() {
        return Err(PlanError::InvalidInput("bollinger bands not warmed up".into()));
    }
    if inputs.bar_low > inputs.bar_high {
        return Err(PlanError::InvalidInput(format!(
            "bar low {} above bar high {}",
            inputs.bar_low, inputs.bar_high
        )));
    }
    Ok(())
}

/// Entry price policy: VWAP-pullback weighting when price trades above VWAP,
/// else the best visible ask, else the market price. Always clamped into the
/// triggering bar's [low, high].
fn entry_price(inputs: &PlanInputs, config: &PlannerConfig) -> f64 {
    let raw = match inputs.vwap {
        Some(vwap) if inputs.price > vwap => {
            vwap + (inputs.price - vwap) * config.vwap_pullback_weight
        }
        _ => match inputs.book {
            Some(book) if book.ask > 0.0 => book.ask,
            _ => inputs.price,
        },
    };
    raw.clamp(inputs.bar_low, inputs.bar_high)
}

/// Max of the candidate stops, clamped strictly below both the entry and the
/// current market price. The ask-derived entry can print above the last
/// trade, and a stop anchored there would already be breached at fill time.
fn stop_loss(entry: f64, inputs: &PlanInputs, config: &PlannerConfig) -> f64 {
    let ceiling = inputs.price.min(entry);
    let atr_stop = entry - inputs.atr * config.atr_buffer;
    let band_stop = inputs.bands.lower * (1.0 - config.bollinger_buffer_pct / 100.0);

    let mut stop = atr_stop.max(band_stop);
    if let Some(vwap) = inputs.vwap {
        if vwap < ceiling {
            stop = stop.max(vwap);
        }
    }
    if stop >= ceiling {
        // Band or VWAP floor above the ceiling, or an ATR stop off an
        // above-market ask; re-anchor the ATR stop at the ceiling, which is
        // strictly below it whenever ATR is positive.
        stop = ceiling - inputs.atr * config.atr_buffer;
    }
    stop
}

/// Start from the configured ratio, back off 0.5 on weak momentum, add 0.5 on
/// strong momentum, and never drop below the configured floor.
fn adjusted_risk_reward(inputs: &PlanInputs, config: &PlannerConfig) -> f64 {
    let roc = inputs.roc.unwrap_or(0.0);
    let mut rr = config.risk_reward_ratio;
    if roc < 0.0 || inputs.rsi < 50.0 {
        rr -= 0.5;
    }
    if inputs.rsi > 70.0 || roc > 0.5 {
        rr += 0.5;
    }
    rr.max(config.min_risk_reward)
}

/// Cap the exit at visible resistance and liquidity, but only at levels that
/// sit above entry — a reference level already below entry is broken, not
/// resistance.
fn cap_exit(raw_exit: f64, entry: f64, inputs: &PlanInputs) -> f64 {
    let mut exit = raw_exit;
    if inputs.bands.upper > entry {
        exit = exit.min(inputs.bands.upper);
    }
    if let Some(book) = inputs.book {
        if book.ask > entry {
            exit = exit.min(book.ask);
        }
    }
    exit
}
