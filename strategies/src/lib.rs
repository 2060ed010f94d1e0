#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! # Strategies
//!
//! The value-bet engine (sports betting) and trade-signal engine (stocks
//! and crypto), both EV-gated through [`arbihawk_risk`] (§4.6).

pub mod error;
pub mod technical;
pub mod trade_signal;
pub mod value_bet;

pub use error::{Result, StrategiesError};
pub use technical::TechnicalContext;
pub use trade_signal::{find_trade_signals, Prediction, TradePredictor, TradeSignal, TradeSignalConfig};
pub use value_bet::{find_value_bets, ValueBetConfig, ValueBetSignal};
