use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Lifecycle status of a [fixture](crate) (§3 data model).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FixtureStatus {
    Scheduled,
    Live,
    Finished,
    Cancelled,
    Postponed,
}

impl FixtureStatus {
    pub const fn as_str(&self) -> &'static str {
        match self {
            FixtureStatus::Scheduled => "scheduled",
            FixtureStatus::Live => "live",
            FixtureStatus::Finished => "finished",
            FixtureStatus::Cancelled => "cancelled",
            FixtureStatus::Postponed => "postponed",
        }
    }
}

impl fmt::Display for FixtureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by [`FixtureStatus::from_str`] for an unrecognised status string.
#[derive(Debug, thiserror::Error)]
#[error("unknown fixture status: {0}")]
pub struct UnknownFixtureStatus(String);

impl FromStr for FixtureStatus {
    type Err = UnknownFixtureStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scheduled" => Ok(Self::Scheduled),
            "live" => Ok(Self::Live),
            "finished" => Ok(Self::Finished),
            "cancelled" => Ok(Self::Cancelled),
            "postponed" => Ok(Self::Postponed),
            other => Err(UnknownFixtureStatus(other.to_string())),
        }
    }
}

/// Betting market kinds dispatched on by Settlement (§4.5) and the value-bet
/// engine (§4.6). Classification is case-insensitive substring matching over
/// the stored `market_name`, matching the reference scraper's free-text
/// market naming (English and Portuguese variants both occur in the wild).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BettingMarket {
    MatchResult,
    OverUnder,
    BothTeamsToScore,
    DoubleChance,
}

impl BettingMarket {
    /// Classify a free-text market name, or `None` for an unrecognised market
    /// (which Settlement leaves pending and the value-bet engine skips).
    pub fn classify(market_name: &str) -> Option<Self> {
        let lower = market_name.to_lowercase();

        const MATCH_RESULT: &[&str] = &["1x2", "match result", "resultado", "full time"];
        const OVER_UNDER: &[&str] = &["over", "under", "gols", "goals", "total"];
        const BTTS: &[&str] = &["btts", "both teams", "ambas marcam", "ambos marcam"];
        const DOUBLE_CHANCE: &[&str] = &["double chance", "dupla chance"];

        if MATCH_RESULT.iter().any(|kw| lower.contains(kw)) {
            Some(Self::MatchResult)
        } else if OVER_UNDER.iter().any(|kw| lower.contains(kw)) {
            Some(Self::OverUnder)
        } else if BTTS.iter().any(|kw| lower.contains(kw)) {
            Some(Self::BothTeamsToScore)
        } else if DOUBLE_CHANCE.iter().any(|kw| lower.contains(kw)) {
            Some(Self::DoubleChance)
        } else {
            None
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            BettingMarket::MatchResult => "1x2",
            BettingMarket::OverUnder => "over_under",
            BettingMarket::BothTeamsToScore => "btts",
            BettingMarket::DoubleChance => "double_chance",
        }
    }
}

impl fmt::Display for BettingMarket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trade-signal strategies (§4.6).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradingStrategy {
    Momentum,
    Swing,
    Volatility,
}

impl TradingStrategy {
    pub const ALL: [TradingStrategy; 3] = [
        TradingStrategy::Momentum,
        TradingStrategy::Swing,
        TradingStrategy::Volatility,
    ];

    pub const fn as_str(&self) -> &'static str {
        match self {
            TradingStrategy::Momentum => "momentum",
            TradingStrategy::Swing => "swing",
            TradingStrategy::Volatility => "volatility",
        }
    }
}

impl fmt::Display for TradingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned by [`TradingStrategy::from_str`] for an unrecognised strategy string.
#[derive(Debug, thiserror::Error)]
#[error("unknown trading strategy: {0}")]
pub struct UnknownTradingStrategy(String);

impl FromStr for TradingStrategy {
    type Err = UnknownTradingStrategy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "momentum" => Ok(Self::Momentum),
            "swing" => Ok(Self::Swing),
            "volatility" => Ok(Self::Volatility),
            other => Err(UnknownTradingStrategy(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_known_market_names() {
        assert_eq!(BettingMarket::classify("Match Result"), Some(BettingMarket::MatchResult));
        assert_eq!(BettingMarket::classify("Over/Under 2.5 Goals"), Some(BettingMarket::OverUnder));
        assert_eq!(BettingMarket::classify("Both Teams To Score"), Some(BettingMarket::BothTeamsToScore));
        assert_eq!(BettingMarket::classify("Dupla Chance"), Some(BettingMarket::DoubleChance));
        assert_eq!(BettingMarket::classify("Correct Score"), None);
    }
}
