use arbihawk_markets::TradingStrategy;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::fmt;
use std::str::FromStr;

/// Which market a [`PriceBar`]/[`Position`] belongs to; stocks and crypto
/// share a schema but never a symbol namespace.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Stock,
    Crypto,
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AssetType::Stock => "stock",
            AssetType::Crypto => "crypto",
        })
    }
}

/// Error returned by [`AssetType::from_str`] for an unrecognised asset-type string.
#[derive(Debug, thiserror::Error)]
#[error("unknown asset type: {0}")]
pub struct UnknownAssetType(String);

impl FromStr for AssetType {
    type Err = UnknownAssetType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "stock" => Ok(Self::Stock),
            "crypto" => Ok(Self::Crypto),
            other => Err(UnknownAssetType(other.to_string())),
        }
    }
}

/// Static metadata for a tradable symbol (§3 `assets`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssetMeta {
    pub symbol: SmolStr,
    pub asset_type: AssetType,
    pub name: String,
    pub sector: Option<String>,
}

/// One OHLCV candle (§3 `price_bars`). Ingested from the stocks/crypto
/// scraper subprocesses on a fixed interval; the interval itself is a
/// scraper-side concern and not tracked here.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub symbol: SmolStr,
    pub asset_type: AssetType,
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// Kind of fill recorded in [`Trade`] (§3 `trades.trade_type`).
///
/// `as_str`/`Display`/`FromStr` are generated by `#[derive(AsStrEnum)]`
/// rather than hand-written, since every variant's wire string is exactly
/// its snake_case name.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, arbihawk_macros::AsStrEnum)]
#[serde(rename_all = "snake_case")]
pub enum TradeType {
    Buy,
    Sell,
    StopLoss,
    TakeProfit,
}

/// A single fill, opening, adding to, or closing a [`Position`] (§3 `trades`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub id: Option<i64>,
    pub symbol: SmolStr,
    pub asset_type: AssetType,
    pub trade_type: TradeType,
    pub strategy: TradingStrategy,
    pub quantity: f64,
    pub price: f64,
    pub timestamp: DateTime<Utc>,
}

impl Trade {
    pub fn notional(&self) -> f64 {
        self.quantity * self.price
    }
}

/// An open holding, mark-to-market on every price-bar ingestion cycle
/// (§3 `positions`). `stop_loss`/`take_profit` are ATR-derived exit levels
/// set by the strategy that opened the position (§4.6).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: SmolStr,
    pub asset_type: AssetType,
    pub strategy: TradingStrategy,
    pub quantity: f64,
    pub avg_entry_price: f64,
    pub current_price: f64,
    pub stop_loss: Option<f64>,
    pub take_profit: Option<f64>,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    pub fn market_value(&self) -> f64 {
        self.quantity * self.current_price
    }

    pub fn unrealized_pnl(&self) -> f64 {
        self.quantity * (self.current_price - self.avg_entry_price)
    }

    /// `true` once the current price has crossed an exit level the strategy
    /// set when the position was opened.
    pub fn exit_triggered(&self) -> bool {
        let hit_stop = self.stop_loss.is_some_and(|sl| self.current_price <= sl);
        let hit_target = self.take_profit.is_some_and(|tp| self.current_price >= tp);
        hit_stop || hit_target
    }
}

/// A point-in-time rollup of cash plus marked-to-market positions
/// (§3 `portfolio_snapshots`), written once per trading cycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub cash_balance: f64,
    pub total_position_value: f64,
    pub realized_pnl: f64,
    pub unrealized_pnl: f64,
    pub timestamp: DateTime<Utc>,
}

impl PortfolioSnapshot {
    pub fn total_value(&self) -> f64 {
        self.cash_balance + self.total_position_value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn position(current: f64, stop: Option<f64>, target: Option<f64>) -> Position {
        Position {
            symbol: "AAPL".into(),
            asset_type: AssetType::Stock,
            strategy: TradingStrategy::Momentum,
            quantity: 10.0,
            avg_entry_price: 100.0,
            current_price: current,
            stop_loss: stop,
            take_profit: target,
            opened_at: Utc::now(),
        }
    }

    #[test]
    fn exit_triggers_on_stop_loss() {
        assert!(position(89.0, Some(90.0), Some(120.0)).exit_triggered());
    }

    #[test]
    fn exit_triggers_on_take_profit() {
        assert!(position(121.0, Some(90.0), Some(120.0)).exit_triggered());
    }

    #[test]
    fn no_exit_inside_band() {
        assert!(!position(105.0, Some(90.0), Some(120.0)).exit_triggered());
    }

    #[test]
    fn unrealized_pnl_tracks_direction() {
        assert_eq!(position(110.0, None, None).unrealized_pnl(), 100.0);
        assert_eq!(position(95.0, None, None).unrealized_pnl(), -50.0);
    }
}
