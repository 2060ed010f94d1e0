#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! # Instrument
//!
//! The value types of the §3 data model: [`Fixture`], [`OddsRow`], [`Score`],
//! [`Bet`] on the betting side; [`AssetMeta`], [`PriceBar`], [`Position`],
//! [`Trade`], [`PortfolioSnapshot`] on the trading side; [`ModelVersion`],
//! [`IngestionMetadata`] and [`RunHistory`] shared by both. No persistence
//! and no I/O lives here — `arbihawk-store` maps these to rows.

mod betting;
mod ingestion;
mod model_version;
mod trading;

pub use betting::{Bet, BetResult, Fixture, OddsRow, Score, UnknownBetResult};
pub use ingestion::{IngestionMetadata, RunHistory, ValidationStatus};
pub use model_version::ModelVersion;
pub use trading::{
    AssetMeta, AssetType, PortfolioSnapshot, Position, PriceBar, Trade, TradeType,
    UnknownAssetType, UnknownTradeType,
};

pub use arbihawk_markets::FixtureStatus;
