use crate::domain::Domain;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which scraper produced an ingested payload (§6 scraper subprocess contract).
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Odds + fixtures provider.
    Betano,
    /// Completed-match scores, primary.
    Flashscore,
    /// Completed-match scores, fallback when Flashscore fails entirely.
    Livescore,
    Stocks,
    Crypto,
}

impl SourceKind {
    pub const fn as_str(&self) -> &'static str {
        match self {
            SourceKind::Betano => "betano",
            SourceKind::Flashscore => "flashscore",
            SourceKind::Livescore => "livescore",
            SourceKind::Stocks => "stocks",
            SourceKind::Crypto => "crypto",
        }
    }

    pub const fn domain(&self) -> Domain {
        match self {
            SourceKind::Betano | SourceKind::Flashscore | SourceKind::Livescore => Domain::Betting,
            SourceKind::Stocks | SourceKind::Crypto => Domain::Trading,
        }
    }

    /// Odds-root sources carry a list of leagues or a `{league_id, fixtures}` object.
    pub const fn expects_odds_root(&self) -> bool {
        matches!(self, SourceKind::Betano)
    }

    /// Score-root sources carry a `{matches: [...]}` object.
    pub const fn expects_score_root(&self) -> bool {
        matches!(self, SourceKind::Flashscore | SourceKind::Livescore)
    }

    pub const fn expects_price_root(&self) -> bool {
        matches!(self, SourceKind::Stocks | SourceKind::Crypto)
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
