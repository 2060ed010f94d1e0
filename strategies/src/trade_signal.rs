//! Trade-signal engine (§4.6): per strategy, computes technical context for
//! each watch-listed symbol, asks a model collaborator for a probability,
//! derives ATR-based stop-loss/take-profit, and gates on EV/risk-reward/
//! confidence.

use crate::error::Result;
use crate::technical::{self, TechnicalContext};
use arbihawk_instrument::AssetType;
use arbihawk_markets::TradingStrategy;
use arbihawk_risk::{
    atr_stop_loss, risk_reward_ratio, take_profit_from_risk_reward, trade_signal_ev, Direction,
    RiskCheck, TradeSignalCandidate, TradeSignalGate,
};
use arbihawk_store::Store;
use smol_str::SmolStr;

/// Tunables for [`find_trade_signals`], defaulted per strategy from the
/// reference trainer's `strategies` config block (§4.6, §9).
#[derive(Debug, Clone, Copy)]
pub struct TradeSignalConfig {
    pub atr_multiplier: f64,
    pub risk_reward_multiple: f64,
    pub min_risk_reward: f64,
    pub strategy_min_confidence: f64,
    pub bollinger_squeeze_threshold: f64,
    pub lookback_bars: u32,
}

impl TradeSignalConfig {
    pub fn for_strategy(strategy: TradingStrategy) -> Self {
        let strategy_min_confidence = match strategy {
            TradingStrategy::Momentum => 0.60,
            TradingStrategy::Swing => 0.65,
            TradingStrategy::Volatility => 0.65,
        };
        Self {
            atr_multiplier: 2.0,
            risk_reward_multiple: 2.0,
            min_risk_reward: 2.0,
            strategy_min_confidence,
            bollinger_squeeze_threshold: 0.05,
            lookback_bars: 60,
        }
    }
}

/// A probability/confidence quote from the active model for one symbol
/// under one strategy — the out-of-scope training collaborator's output
/// (§1), consumed but never produced here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub probability: f64,
    pub confidence: f64,
}

/// Supplies model predictions to [`find_trade_signals`].
pub trait TradePredictor {
    fn predict(&self, strategy: TradingStrategy, symbol: &str, context: &TechnicalContext) -> Option<Prediction>;
}

/// A trade candidate that cleared the EV/risk-reward/confidence gate,
/// ordered by EV descending once collected by [`find_trade_signals`].
#[derive(Debug, Clone, PartialEq)]
pub struct TradeSignal {
    pub symbol: SmolStr,
    pub asset_type: AssetType,
    pub strategy: TradingStrategy,
    pub direction: Direction,
    pub entry: f64,
    pub stop_loss: f64,
    pub take_profit: f64,
    pub probability: f64,
    pub confidence: f64,
    pub ev: f64,
    pub risk_reward: f64,
    pub context: TechnicalContext,
}

/// Scans `symbols` for `strategy`/`direction` and returns every signal that
/// clears the gate, ordered by EV descending (§4.6).
pub fn find_trade_signals(
    store: &Store,
    predictor: &dyn TradePredictor,
    strategy: TradingStrategy,
    direction: Direction,
    asset_type: AssetType,
    symbols: &[String],
    config: &TradeSignalConfig,
) -> Result<Vec<TradeSignal>> {
    let gate = TradeSignalGate {
        min_risk_reward: config.min_risk_reward,
        strategy_min_confidence: config.strategy_min_confidence,
    };

    let mut signals = Vec::new();
    for symbol in symbols {
        let mut bars = store.price_bars(symbol, asset_type, config.lookback_bars)?;
        if bars.len() < 2 {
            continue;
        }
        bars.reverse(); // price_bars is newest-first; indicators want oldest-first.

        let highs: Vec<f64> = bars.iter().map(|b| b.high).collect();
        let lows: Vec<f64> = bars.iter().map(|b| b.low).collect();
        let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();

        let Some(context) = technical::technical_context(&highs, &lows, &closes, config.bollinger_squeeze_threshold)
        else {
            continue;
        };
        let Some(prediction) = predictor.predict(strategy, symbol, &context) else {
            continue;
        };

        let entry = *closes.last().unwrap();
        let stop_loss = atr_stop_loss(entry, context.atr, config.atr_multiplier, direction);
        let take_profit = take_profit_from_risk_reward(entry, stop_loss, config.risk_reward_multiple, direction);

        let Ok(ev) = trade_signal_ev(prediction.probability, entry, take_profit, stop_loss) else {
            continue;
        };
        let Ok(risk_reward) = risk_reward_ratio(entry, take_profit, stop_loss) else {
            continue;
        };

        let candidate = TradeSignalCandidate {
            probability: prediction.probability,
            confidence: prediction.confidence,
            entry,
            take_profit,
            stop_loss,
        };
        if !gate.passes(&candidate) {
            continue;
        }

        signals.push(TradeSignal {
            symbol: SmolStr::new(symbol),
            asset_type,
            strategy,
            direction,
            entry,
            stop_loss,
            take_profit,
            probability: prediction.probability,
            confidence: prediction.confidence,
            ev,
            risk_reward,
            context,
        });
    }

    signals.sort_by(|a, b| b.ev.partial_cmp(&a.ev).unwrap_or(std::cmp::Ordering::Equal));
    Ok(signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbihawk_instrument::PriceBar;
    use chrono::{Duration, Utc};

    struct FixedPredictor {
        probability: f64,
        confidence: f64,
    }

    impl TradePredictor for FixedPredictor {
        fn predict(&self, _strategy: TradingStrategy, _symbol: &str, _context: &TechnicalContext) -> Option<Prediction> {
            Some(Prediction { probability: self.probability, confidence: self.confidence })
        }
    }

    fn seeded_store(symbol: &str, trend_up: bool) -> Store {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        let mut bars = Vec::new();
        let mut price = 100.0;
        for i in 0..40 {
            let step = if i % 5 == 0 { if trend_up { -0.3 } else { 0.3 } } else if trend_up { 1.0 } else { -1.0 };
            price += step;
            bars.push(PriceBar {
                symbol: symbol.into(),
                asset_type: AssetType::Stock,
                timestamp: now - Duration::days(40 - i),
                open: price,
                high: price + 0.5,
                low: price - 0.5,
                close: price,
                volume: 1_000.0,
            });
        }
        store.insert_price_bars_batch(&bars).unwrap();
        store
    }

    #[test]
    fn emits_a_signal_for_a_confident_prediction_with_good_risk_reward() {
        let store = seeded_store("AAPL", true);
        let predictor = FixedPredictor { probability: 0.75, confidence: 0.8 };
        let config = TradeSignalConfig::for_strategy(TradingStrategy::Momentum);

        let signals = find_trade_signals(
            &store,
            &predictor,
            TradingStrategy::Momentum,
            Direction::Long,
            AssetType::Stock,
            &["AAPL".to_string()],
            &config,
        )
        .unwrap();

        assert_eq!(signals.len(), 1);
        assert!(signals[0].ev >= 0.0);
    }

    #[test]
    fn low_confidence_prediction_is_gated_out() {
        let store = seeded_store("MSFT", true);
        let predictor = FixedPredictor { probability: 0.75, confidence: 0.1 };
        let config = TradeSignalConfig::for_strategy(TradingStrategy::Momentum);

        let signals = find_trade_signals(
            &store,
            &predictor,
            TradingStrategy::Momentum,
            Direction::Long,
            AssetType::Stock,
            &["MSFT".to_string()],
            &config,
        )
        .unwrap();

        assert!(signals.is_empty());
    }

    #[test]
    fn symbol_with_too_little_history_is_skipped() {
        let store = Store::open_in_memory().unwrap();
        let predictor = FixedPredictor { probability: 0.9, confidence: 0.9 };
        let config = TradeSignalConfig::for_strategy(TradingStrategy::Momentum);

        let signals = find_trade_signals(
            &store,
            &predictor,
            TradingStrategy::Momentum,
            Direction::Long,
            AssetType::Stock,
            &["GHOST".to_string()],
            &config,
        )
        .unwrap();

        assert!(signals.is_empty());
    }
}
