use arbihawk_markets::FixtureStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use std::str::FromStr;

/// A scheduled or completed match (§3 `fixtures`).
///
/// `fixture_id` is the provider's own identifier when one is known, or a
/// [synthetic id](arbihawk_identity::synthetic) built by the Matcher when
/// reconciling a scoreboard feed that has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fixture {
    pub fixture_id: SmolStr,
    pub source: SmolStr,
    pub tournament_name: Option<String>,
    pub home_team_name: String,
    pub away_team_name: String,
    pub start_time: DateTime<Utc>,
    pub status: FixtureStatus,
    pub created_at: DateTime<Utc>,
}

/// One bookmaker's price for one outcome of one market on one fixture
/// (§3 `odds`). Several rows share a `fixture_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OddsRow {
    pub fixture_id: SmolStr,
    pub bookmaker_name: String,
    pub market_name: String,
    pub outcome_name: String,
    pub odds_value: f64,
    pub created_at: DateTime<Utc>,
}

/// The latest known scoreline for a fixture (§3 `scores`), written by
/// Flashscore/Livescore ingestion and read by Settlement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Score {
    pub home_score: i32,
    pub away_score: i32,
    pub status: FixtureStatus,
    pub updated_at: DateTime<Utc>,
}

impl Score {
    /// A completed, unambiguous scoreline is one Settlement can act on.
    pub const fn is_final(&self) -> bool {
        matches!(self.status, FixtureStatus::Finished)
    }
}

/// Terminal state of a [`Bet`] (§3 `bet_history.result`).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BetResult {
    Pending,
    Win,
    Loss,
    Void,
}

impl BetResult {
    pub const fn as_str(&self) -> &'static str {
        match self {
            BetResult::Pending => "pending",
            BetResult::Win => "win",
            BetResult::Loss => "loss",
            BetResult::Void => "void",
        }
    }
}

/// Error returned by [`BetResult::from_str`] for an unrecognised result string.
#[derive(Debug, thiserror::Error)]
#[error("unknown bet result: {0}")]
pub struct UnknownBetResult(String);

impl FromStr for BetResult {
    type Err = UnknownBetResult;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "win" => Ok(Self::Win),
            "loss" => Ok(Self::Loss),
            "void" => Ok(Self::Void),
            other => Err(UnknownBetResult(other.to_string())),
        }
    }
}

/// A placed (real or paper) bet, keyed by `model_market` for ROI rollups
/// (§9 Open Question: `bet_history.model_market` is the join key against
/// model performance, chosen over a separate foreign key table because the
/// reference implementation never normalises it either).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bet {
    pub id: Option<i64>,
    pub fixture_id: SmolStr,
    pub market_name: String,
    pub outcome_name: String,
    pub model_market: String,
    pub odds: f64,
    pub stake: f64,
    pub placed_at: DateTime<Utc>,
    pub settled_at: Option<DateTime<Utc>>,
    pub result: BetResult,
    pub payout: f64,
}

impl Bet {
    /// Net profit or loss once settled; zero while still `Pending`.
    pub fn profit(&self) -> f64 {
        match self.result {
            BetResult::Pending => 0.0,
            BetResult::Void => 0.0,
            BetResult::Win | BetResult::Loss => self.payout - self.stake,
        }
    }
}
