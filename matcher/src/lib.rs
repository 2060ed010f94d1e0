#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! # Matcher
//!
//! Reconciles a scoreboard result (home/away team names, kickoff time) to a
//! stored [`Fixture`](arbihawk_instrument::Fixture) when no shared id exists
//! between the scores provider and the odds provider (§4.4).

pub mod error;

pub use error::{MatcherError, Result};

use arbihawk_identity::Normalizer;
use arbihawk_store::Store;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use parking_lot::Mutex;
use smol_str::SmolStr;

/// Tunables for [`Matcher`], defaulting to the reference values named in §4.4.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatcherConfig {
    pub tolerance: Duration,
    pub min_match_score: u8,
}

impl Default for MatcherConfig {
    fn default() -> Self {
        Self { tolerance: Duration::hours(24), min_match_score: 75 }
    }
}

/// Why a scoreboard result could not be resolved to a fixture, recorded in
/// the in-memory unmatched log (§4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct UnmatchedEntry {
    pub home: String,
    pub away: String,
    pub match_time: String,
    pub reason: String,
}

/// Aggregate result of [`Matcher::match_batch`] (§4.4).
#[derive(Debug, Clone, PartialEq)]
pub struct BatchMatchResult {
    pub total: usize,
    pub matched: usize,
    pub unmatched: usize,
    pub match_rate: f64,
    pub results: Vec<Option<SmolStr>>,
}

/// One scoreboard result to resolve in [`Matcher::match_batch`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreCandidate {
    pub home: String,
    pub away: String,
    pub match_time: String,
}

/// Reconciles scoreboard results against stored fixtures by fuzzy team-name
/// similarity within a time window. Holds its own unmatched log; construct
/// one per collection run.
pub struct Matcher<'s> {
    store: &'s Store,
    config: MatcherConfig,
    normalizer: Normalizer,
    unmatched: Mutex<Vec<UnmatchedEntry>>,
}

impl<'s> std::fmt::Debug for Matcher<'s> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Matcher").field("config", &self.config).finish_non_exhaustive()
    }
}

impl<'s> Matcher<'s> {
    pub fn new(store: &'s Store) -> Self {
        Self::with_config(store, MatcherConfig::default())
    }

    pub fn with_config(store: &'s Store, config: MatcherConfig) -> Self {
        Self { store, config, normalizer: Normalizer::default(), unmatched: Mutex::new(Vec::new()) }
    }

    /// `match_score(home, away, match_time) -> fixture_id | nil` (§4.4).
    pub fn match_score(&self, home: &str, away: &str, match_time: &str) -> Result<Option<SmolStr>> {
        let parsed_time = parse_match_time(match_time)
            .ok_or_else(|| MatcherError::InvalidMatchTime(match_time.to_string()))?;

        let candidates = self.store.fixtures_in_window(parsed_time, self.config.tolerance)?;
        if candidates.is_empty() {
            self.record_unmatched(home, away, match_time, "no fixtures in window");
            return Ok(None);
        }

        let mut best: Option<(SmolStr, u32)> = None;
        for fixture in &candidates {
            let home_score = self.normalizer.similarity(home, &fixture.home_team_name) as u32;
            let away_score = self.normalizer.similarity(away, &fixture.away_team_name) as u32;
            let combined = (home_score + away_score) / 2;

            // Strict maximum: on a tie, the first fixture encountered wins.
            let beats_current = match &best {
                None => true,
                Some((_, score)) => combined > *score,
            };
            if beats_current {
                best = Some((fixture.fixture_id.clone(), combined));
            }
        }

        let (fixture_id, score) = best.expect("candidates is non-empty");
        if score >= self.config.min_match_score as u32 {
            Ok(Some(fixture_id))
        } else {
            self.record_unmatched(
                home,
                away,
                match_time,
                &format!("best score {score} below threshold {}", self.config.min_match_score),
            );
            Ok(None)
        }
    }

    /// Iterates [`Matcher::match_score`] over `items`, aggregating a match-rate
    /// summary (§4.4 batch variant).
    pub fn match_batch(&self, items: &[ScoreCandidate]) -> Result<BatchMatchResult> {
        let mut results = Vec::with_capacity(items.len());
        let mut matched = 0usize;
        for item in items {
            let result = self.match_score(&item.home, &item.away, &item.match_time)?;
            if result.is_some() {
                matched += 1;
            }
            results.push(result);
        }

        let total = items.len();
        let unmatched = total - matched;
        let match_rate = if total == 0 { 0.0 } else { matched as f64 / total as f64 };

        Ok(BatchMatchResult { total, matched, unmatched, match_rate, results })
    }

    /// Snapshot of every unresolved scoreboard result recorded so far.
    pub fn unmatched(&self) -> Vec<UnmatchedEntry> {
        self.unmatched.lock().clone()
    }

    fn record_unmatched(&self, home: &str, away: &str, match_time: &str, reason: &str) {
        self.unmatched.lock().push(UnmatchedEntry {
            home: home.to_string(),
            away: away.to_string(),
            match_time: match_time.to_string(),
            reason: reason.to_string(),
        });
    }
}

fn parse_match_time(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}
