#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! # Settlement
//!
//! Resolves pending bets against final scores and records win/loss/payout
//! (§4.5). Two score sources are tried in order: the bet's own `fixture_id`,
//! then — if that id has no score row because it came from a provider that
//! never shares fixture ids with the scoreboard feed — a synthetic-id scan
//! reconciled back to the bet's fixture by team-name similarity and date.

pub mod dispatch;
pub mod error;

pub use error::{Result, SettlementError};

use arbihawk_identity::{parse_synthetic_id, similarity, DEFAULT_SYNTHETIC_SOURCES};
use arbihawk_instrument::{Bet, BetResult, Score};
use arbihawk_markets::BettingMarket;
use arbihawk_store::Store;
use chrono::{Duration, Utc};

/// Minimum combined team-name similarity for the synthetic-id fallback to
/// accept a score as belonging to a bet's fixture (matches the Matcher's
/// default threshold, §4.4).
const FALLBACK_MIN_SCORE: u32 = 75;

/// How far (in hours) a synthetic score's date may drift from the fixture's
/// kickoff date and still be considered the same match.
const FALLBACK_DATE_TOLERANCE_HOURS: i64 = 24;

/// Aggregate result of [`settle_pending_bets`].
#[derive(Debug, Clone, PartialEq)]
pub struct SettlementBatchResult {
    pub total_pending: usize,
    pub settled: usize,
    pub wins: usize,
    pub losses: usize,
    pub total_payout: f64,
    pub results: Vec<(i64, Option<BetResult>)>,
}

/// Attempts to settle one bet. Returns `Ok(None)` if the bet does not exist,
/// is already settled, has no resolvable final score yet, or its market is
/// not one Settlement can dispatch — all of which leave it pending for a
/// later run.
pub fn settle_bet(store: &Store, bet_id: i64) -> Result<Option<BetResult>> {
    let Some(bet) = store.get_bet(bet_id)? else {
        return Ok(None);
    };
    if bet.result != BetResult::Pending {
        return Ok(None);
    }

    let Some(score) = resolve_score(store, &bet)? else {
        return Ok(None);
    };
    if !score.is_final() {
        return Ok(None);
    }

    let Some(market) = BettingMarket::classify(&bet.market_name) else {
        return Ok(None);
    };
    let Some(won) = dispatch::evaluate(market, &bet.outcome_name, score.home_score, score.away_score) else {
        return Ok(None);
    };

    let result = if won { BetResult::Win } else { BetResult::Loss };
    let payout = if won { bet.stake * bet.odds } else { 0.0 };

    store.settle_bet(bet_id, result, payout, Utc::now())?;
    Ok(Some(result))
}

/// Settles every currently-pending bet, aggregating outcomes.
pub fn settle_pending_bets(store: &Store) -> Result<SettlementBatchResult> {
    let pending = store.pending_bets()?;
    let total_pending = pending.len();

    let mut settled = 0usize;
    let mut wins = 0usize;
    let mut losses = 0usize;
    let mut total_payout = 0.0;
    let mut results = Vec::with_capacity(total_pending);

    for bet in &pending {
        let id = bet.id.expect("pending bets are always persisted");
        let outcome = settle_bet(store, id)?;
        if let Some(result) = outcome {
            settled += 1;
            match result {
                BetResult::Win => wins += 1,
                BetResult::Loss => losses += 1,
                BetResult::Pending | BetResult::Void => {}
            }
            if let Some(settled_bet) = store.get_bet(id)? {
                total_payout += settled_bet.payout;
            }
        }
        results.push((id, outcome));
    }

    Ok(SettlementBatchResult { total_pending, settled, wins, losses, total_payout, results })
}

/// Looks up the bet's final score under its own `fixture_id`; if there is
/// none, scans synthetic-id scores for the best team-name/date match against
/// the bet's own fixture.
fn resolve_score(store: &Store, bet: &Bet) -> Result<Option<Score>> {
    if let Some(score) = store.get_score(&bet.fixture_id)? {
        return Ok(Some(score));
    }

    let Some(fixture) = store.get_fixture(&bet.fixture_id)? else {
        return Ok(None);
    };

    let prefixes: Vec<String> = DEFAULT_SYNTHETIC_SOURCES.iter().map(|s| format!("{s}_")).collect();
    let prefix_refs: Vec<&str> = prefixes.iter().map(String::as_str).collect();
    let candidates = store.scores_with_id_prefix(&prefix_refs)?;

    let mut best: Option<(u32, Score)> = None;
    for (id, score) in candidates {
        let Some(parsed) = parse_synthetic_id(&id) else { continue };
        if !within_date_tolerance(&parsed.date, fixture.start_time) {
            continue;
        }

        let home_score = similarity(&fixture.home_team_name, &parsed.home) as u32;
        let away_score = similarity(&fixture.away_team_name, &parsed.away) as u32;
        let combined = (home_score + away_score) / 2;

        if combined < FALLBACK_MIN_SCORE {
            continue;
        }
        let better = match &best {
            None => true,
            Some((current, _)) => combined > *current,
        };
        if better {
            best = Some((combined, score));
        }
    }

    Ok(best.map(|(_, score)| score))
}

fn within_date_tolerance(date: &str, fixture_start: chrono::DateTime<Utc>) -> bool {
    let Some(naive) = chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").ok() else {
        return false;
    };
    let Some(midnight) = naive.and_hms_opt(0, 0, 0) else {
        return false;
    };
    let score_date = midnight.and_utc();
    (score_date - fixture_start).abs() <= Duration::hours(2 * FALLBACK_DATE_TOLERANCE_HOURS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbihawk_instrument::Fixture;
    use arbihawk_markets::FixtureStatus;
    use chrono::Utc;

    fn seeded_fixture(store: &Store, id: &str, home: &str, away: &str, start: chrono::DateTime<Utc>) {
        store
            .upsert_fixture(&Fixture {
                fixture_id: id.into(),
                source: "betano".into(),
                tournament_name: Some("Premier League".into()),
                home_team_name: home.into(),
                away_team_name: away.into(),
                start_time: start,
                status: FixtureStatus::Scheduled,
                created_at: Utc::now(),
            })
            .unwrap();
    }

    fn pending_bet(fixture_id: &str, market: &str, outcome: &str, odds: f64, stake: f64) -> Bet {
        Bet {
            id: None,
            fixture_id: fixture_id.into(),
            market_name: market.into(),
            outcome_name: outcome.into(),
            model_market: market.into(),
            odds,
            stake,
            placed_at: Utc::now(),
            settled_at: None,
            result: BetResult::Pending,
            payout: 0.0,
        }
    }

    #[test]
    fn settles_a_bet_with_its_own_fixture_score() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        seeded_fixture(&store, "f1", "Arsenal", "Chelsea", now);
        store
            .upsert_score("f1", &Score { home_score: 2, away_score: 0, status: FixtureStatus::Finished, updated_at: now })
            .unwrap();
        let bet_id = store.insert_bet(&pending_bet("f1", "Match Result", "Home", 2.0, 10.0)).unwrap();

        let result = settle_bet(&store, bet_id).unwrap();
        assert_eq!(result, Some(BetResult::Win));

        let bet = store.get_bet(bet_id).unwrap().unwrap();
        assert_eq!(bet.payout, 20.0);
    }

    #[test]
    fn falls_back_to_synthetic_score_by_team_and_date() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        seeded_fixture(&store, "betano_f2", "Manchester United", "Liverpool", now);
        let synthetic_id = format!("flashscore_ManchesterUnited_Liverpool_{}", now.format("%Y-%m-%d"));
        store
            .upsert_score(
                &synthetic_id,
                &Score { home_score: 1, away_score: 1, status: FixtureStatus::Finished, updated_at: now },
            )
            .unwrap();
        let bet_id = store.insert_bet(&pending_bet("betano_f2", "Match Result", "Draw", 3.0, 5.0)).unwrap();

        let result = settle_bet(&store, bet_id).unwrap();
        assert_eq!(result, Some(BetResult::Win));
    }

    #[test]
    fn no_score_leaves_bet_pending() {
        let store = Store::open_in_memory().unwrap();
        seeded_fixture(&store, "f3", "Arsenal", "Chelsea", Utc::now());
        let bet_id = store.insert_bet(&pending_bet("f3", "Match Result", "Home", 2.0, 10.0)).unwrap();

        let result = settle_bet(&store, bet_id).unwrap();
        assert_eq!(result, None);
        assert_eq!(store.get_bet(bet_id).unwrap().unwrap().result, BetResult::Pending);
    }

    #[test]
    fn unrecognised_market_leaves_bet_pending() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        seeded_fixture(&store, "f4", "Arsenal", "Chelsea", now);
        store
            .upsert_score("f4", &Score { home_score: 1, away_score: 0, status: FixtureStatus::Finished, updated_at: now })
            .unwrap();
        let bet_id = store.insert_bet(&pending_bet("f4", "Correct Score", "1-0", 5.0, 10.0)).unwrap();

        assert_eq!(settle_bet(&store, bet_id).unwrap(), None);
    }

    #[test]
    fn resettling_is_idempotent() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        seeded_fixture(&store, "f5", "Arsenal", "Chelsea", now);
        store
            .upsert_score("f5", &Score { home_score: 0, away_score: 0, status: FixtureStatus::Finished, updated_at: now })
            .unwrap();
        let bet_id = store.insert_bet(&pending_bet("f5", "Match Result", "Draw", 3.0, 10.0)).unwrap();

        assert_eq!(settle_bet(&store, bet_id).unwrap(), Some(BetResult::Win));
        assert_eq!(settle_bet(&store, bet_id).unwrap(), None);
    }

    #[test]
    fn settle_pending_bets_aggregates_across_a_mixed_batch() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        seeded_fixture(&store, "win_f", "Arsenal", "Chelsea", now);
        store
            .upsert_score("win_f", &Score { home_score: 2, away_score: 0, status: FixtureStatus::Finished, updated_at: now })
            .unwrap();
        seeded_fixture(&store, "loss_f", "Arsenal", "Chelsea", now);
        store
            .upsert_score("loss_f", &Score { home_score: 0, away_score: 2, status: FixtureStatus::Finished, updated_at: now })
            .unwrap();
        seeded_fixture(&store, "unresolved_f", "Arsenal", "Chelsea", now);

        store.insert_bet(&pending_bet("win_f", "Match Result", "Home", 2.0, 10.0)).unwrap();
        store.insert_bet(&pending_bet("loss_f", "Match Result", "Home", 2.0, 10.0)).unwrap();
        store.insert_bet(&pending_bet("unresolved_f", "Match Result", "Home", 2.0, 10.0)).unwrap();

        let report = settle_pending_bets(&store).unwrap();
        assert_eq!(report.total_pending, 3);
        assert_eq!(report.settled, 2);
        assert_eq!(report.wins, 1);
        assert_eq!(report.losses, 1);
        assert_eq!(report.total_payout, 20.0);
    }
}
