#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! # Risk
//!
//! Expected-value gating primitives shared by the value-bet engine and the
//! trade-signal engine (§4.6). Pure arithmetic, no I/O: callers in
//! `arbihawk-strategies` supply the model probability, market price and
//! context, and read back an EV this crate decides whether to gate on.

pub mod error;

pub use error::{Result, RiskError};

/// Direction of a prospective trade, determining which side of `entry` the
/// stop-loss sits on.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Direction {
    Long,
    Short,
}

/// `1 / odds` (§4.6 value-bet).
pub fn implied_probability(odds: f64) -> Result<f64> {
    if odds <= 1.0 {
        return Err(RiskError::InvalidOdds(odds));
    }
    Ok(1.0 / odds)
}

/// `implied / (1 + market_margin)` (§4.6 value-bet).
pub fn adjusted_implied_probability(odds: f64, market_margin: f64) -> Result<f64> {
    Ok(implied_probability(odds)? / (1.0 + market_margin))
}

/// `(model_prob - adjusted_implied) * odds` (§4.6 value-bet).
pub fn value_bet_ev(model_prob: f64, odds: f64, market_margin: f64) -> Result<f64> {
    let adjusted_implied = adjusted_implied_probability(odds, market_margin)?;
    Ok((model_prob - adjusted_implied) * odds)
}

/// A prospective value bet, ready to be checked against an [`EvThresholdCheck`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ValueBetCandidate {
    pub model_prob: f64,
    pub odds: f64,
    pub market_margin: f64,
}

/// General interface for a single go/no-go risk gate.
pub trait RiskCheck {
    type Input;

    fn name(&self) -> &'static str;
    fn passes(&self, input: &Self::Input) -> bool;
}

/// Gates a [`ValueBetCandidate`] on `EV >= ev_threshold` (§4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvThresholdCheck {
    pub ev_threshold: f64,
}

impl RiskCheck for EvThresholdCheck {
    type Input = ValueBetCandidate;

    fn name(&self) -> &'static str {
        "EvThresholdCheck"
    }

    fn passes(&self, input: &Self::Input) -> bool {
        match value_bet_ev(input.model_prob, input.odds, input.market_margin) {
            Ok(ev) => ev >= self.ev_threshold,
            Err(_) => false,
        }
    }
}

/// Stop-loss price `k` ATRs from `entry`, on the losing side of `direction`.
pub fn atr_stop_loss(entry: f64, atr: f64, k: f64, direction: Direction) -> f64 {
    match direction {
        Direction::Long => entry - k * atr,
        Direction::Short => entry + k * atr,
    }
}

/// Take-profit at `risk_reward` multiples of the stop-loss distance, on the
/// winning side of `direction`.
pub fn take_profit_from_risk_reward(
    entry: f64,
    stop_loss: f64,
    risk_reward: f64,
    direction: Direction,
) -> f64 {
    let risk_distance = (entry - stop_loss).abs();
    match direction {
        Direction::Long => entry + risk_distance * risk_reward,
        Direction::Short => entry - risk_distance * risk_reward,
    }
}

/// `|TP - entry| / entry` (§4.6 trade-signal).
pub fn expected_return(entry: f64, take_profit: f64) -> Result<f64> {
    if entry <= 0.0 {
        return Err(RiskError::InvalidEntry(entry));
    }
    Ok((take_profit - entry).abs() / entry)
}

/// `|entry - SL| / entry` (§4.6 trade-signal).
pub fn trade_risk(entry: f64, stop_loss: f64) -> Result<f64> {
    if entry <= 0.0 {
        return Err(RiskError::InvalidEntry(entry));
    }
    Ok((entry - stop_loss).abs() / entry)
}

/// `p * expected_return - (1 - p) * risk` (§4.6 trade-signal).
pub fn trade_signal_ev(probability: f64, entry: f64, take_profit: f64, stop_loss: f64) -> Result<f64> {
    let gain = expected_return(entry, take_profit)?;
    let loss = trade_risk(entry, stop_loss)?;
    Ok(probability * gain - (1.0 - probability) * loss)
}

/// `expected_return / risk` — the ratio `min_risk_reward` gates on (§4.6).
pub fn risk_reward_ratio(entry: f64, take_profit: f64, stop_loss: f64) -> Result<f64> {
    let gain = expected_return(entry, take_profit)?;
    let loss = trade_risk(entry, stop_loss)?;
    if loss == 0.0 {
        return Ok(f64::INFINITY);
    }
    Ok(gain / loss)
}

/// A prospective trade signal, ready to be checked against a [`TradeSignalGate`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeSignalCandidate {
    pub probability: f64,
    pub confidence: f64,
    pub entry: f64,
    pub take_profit: f64,
    pub stop_loss: f64,
}

/// Gates a [`TradeSignalCandidate`] on `EV >= 0`, `risk_reward >= min_risk_reward`
/// and `confidence >= strategy_min_confidence` (§4.6).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeSignalGate {
    pub min_risk_reward: f64,
    pub strategy_min_confidence: f64,
}

impl RiskCheck for TradeSignalGate {
    type Input = TradeSignalCandidate;

    fn name(&self) -> &'static str {
        "TradeSignalGate"
    }

    fn passes(&self, input: &Self::Input) -> bool {
        if input.confidence < self.strategy_min_confidence {
            return false;
        }
        let (Ok(ev), Ok(rr)) = (
            trade_signal_ev(input.probability, input.entry, input.take_profit, input.stop_loss),
            risk_reward_ratio(input.entry, input.take_profit, input.stop_loss),
        ) else {
            return false;
        };
        ev >= 0.0 && rr >= self.min_risk_reward
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_bet_ev_rewards_underpriced_outcomes() {
        let ev = value_bet_ev(0.55, 2.0, 0.05).unwrap();
        assert!(ev > 0.0);
    }

    #[test]
    fn ev_threshold_check_gates_on_configured_threshold() {
        let check = EvThresholdCheck { ev_threshold: 0.05 };
        let strong = ValueBetCandidate { model_prob: 0.6, odds: 2.2, market_margin: 0.05 };
        let weak = ValueBetCandidate { model_prob: 0.48, odds: 2.0, market_margin: 0.05 };
        assert!(check.passes(&strong));
        assert!(!check.passes(&weak));
    }

    #[test]
    fn invalid_odds_is_rejected() {
        assert!(implied_probability(1.0).is_err());
        assert!(implied_probability(0.5).is_err());
    }

    #[test]
    fn atr_stop_loss_is_below_entry_when_long() {
        let sl = atr_stop_loss(100.0, 2.0, 1.5, Direction::Long);
        assert_eq!(sl, 97.0);
    }

    #[test]
    fn take_profit_scales_with_risk_reward_multiple() {
        let sl = atr_stop_loss(100.0, 2.0, 1.5, Direction::Long);
        let tp = take_profit_from_risk_reward(100.0, sl, 2.0, Direction::Long);
        assert_eq!(tp, 106.0);
    }

    #[test]
    fn trade_signal_gate_rejects_low_confidence() {
        let gate = TradeSignalGate { min_risk_reward: 1.5, strategy_min_confidence: 0.6 };
        let candidate = TradeSignalCandidate {
            probability: 0.7,
            confidence: 0.4,
            entry: 100.0,
            take_profit: 110.0,
            stop_loss: 95.0,
        };
        assert!(!gate.passes(&candidate));
    }

    #[test]
    fn trade_signal_gate_accepts_qualifying_candidate() {
        let gate = TradeSignalGate { min_risk_reward: 1.5, strategy_min_confidence: 0.6 };
        let candidate = TradeSignalCandidate {
            probability: 0.7,
            confidence: 0.8,
            entry: 100.0,
            take_profit: 110.0,
            stop_loss: 95.0,
        };
        assert!(gate.passes(&candidate));
    }
}
