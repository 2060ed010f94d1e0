#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! # Markets
//!
//! Shared vocabulary: which product line a piece of work belongs to
//! ([`Domain`]), which scraper produced a payload ([`SourceKind`]), and
//! which betting/trading market a row describes ([`BettingMarket`],
//! [`TradingStrategy`]).

mod domain;
mod market;
mod source;

pub use domain::{Domain, UnknownDomain};
pub use market::{
    BettingMarket, FixtureStatus, TradingStrategy, UnknownFixtureStatus, UnknownTradingStrategy,
};
pub use source::SourceKind;
