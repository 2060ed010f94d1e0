use crate::error::Result;
use crate::Store;
use arbihawk_instrument::{Fixture, OddsRow, Score};
use arbihawk_markets::FixtureStatus;
use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, OptionalExtension};
use std::str::FromStr;

impl Store {
    /// Inserts a fixture, or overwrites it in place if `fixture_id` already
    /// exists (§3: last-writer-wins within a fixture).
    pub fn upsert_fixture(&self, fixture: &Fixture) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO fixtures
                    (fixture_id, source, tournament_name, home_team_name, away_team_name,
                     start_time, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                 ON CONFLICT(fixture_id) DO UPDATE SET
                    source = excluded.source,
                    tournament_name = excluded.tournament_name,
                    home_team_name = excluded.home_team_name,
                    away_team_name = excluded.away_team_name,
                    start_time = excluded.start_time,
                    status = excluded.status",
                params![
                    fixture.fixture_id.as_str(),
                    fixture.source.as_str(),
                    fixture.tournament_name,
                    fixture.home_team_name,
                    fixture.away_team_name,
                    fixture.start_time,
                    fixture.status.as_str(),
                    fixture.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_fixture(&self, fixture_id: &str) -> Result<Option<Fixture>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT fixture_id, source, tournament_name, home_team_name, away_team_name,
                        start_time, status, created_at
                 FROM fixtures WHERE fixture_id = ?1",
                params![fixture_id],
                row_to_fixture,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    /// Fixtures whose `start_time` falls within `[at - tolerance, at + tolerance]`,
    /// the candidate window the Matcher scans (§4.4).
    pub fn fixtures_in_window(
        &self,
        at: DateTime<Utc>,
        tolerance: Duration,
    ) -> Result<Vec<Fixture>> {
        let lower = at - tolerance;
        let upper = at + tolerance;
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT fixture_id, source, tournament_name, home_team_name, away_team_name,
                        start_time, status, created_at
                 FROM fixtures WHERE start_time BETWEEN ?1 AND ?2",
            )?;
            let rows = stmt
                .query_map(params![lower, upper], row_to_fixture)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Atomic per call (§4.1 contract): all rows land or none do. A row
    /// sharing `(fixture_id, bookmaker, market, outcome)` with an existing
    /// one overwrites its `odds_value`/`created_at` in place rather than
    /// accumulating a duplicate (§3, §8).
    pub fn insert_odds_batch(&self, rows: &[OddsRow]) -> Result<()> {
        self.with_conn(|conn| {
            let tx = conn.unchecked_transaction()?;
            {
                let mut stmt = tx.prepare(
                    "INSERT INTO odds
                        (fixture_id, bookmaker_name, market_name, outcome_name, odds_value, created_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                     ON CONFLICT(fixture_id, bookmaker_name, market_name, outcome_name) DO UPDATE SET
                        odds_value = excluded.odds_value,
                        created_at = excluded.created_at",
                )?;
                for row in rows {
                    stmt.execute(params![
                        row.fixture_id.as_str(),
                        row.bookmaker_name,
                        row.market_name,
                        row.outcome_name,
                        row.odds_value,
                        row.created_at,
                    ])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    /// The most recent odds row per outcome created at or before `cutoff`
    /// (§4.6: backtesting reads as-of the prediction time; live reads as of
    /// now — callers pass `Utc::now()` for the live case).
    pub fn latest_odds_for_fixture(
        &self,
        fixture_id: &str,
        cutoff: DateTime<Utc>,
    ) -> Result<Vec<OddsRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT o.fixture_id, o.bookmaker_name, o.market_name, o.outcome_name,
                        o.odds_value, o.created_at
                 FROM odds o
                 INNER JOIN (
                    SELECT market_name, outcome_name, MAX(created_at) AS latest
                    FROM odds
                    WHERE fixture_id = ?1 AND created_at <= ?2
                    GROUP BY market_name, outcome_name
                 ) latest_per_outcome
                 ON o.market_name = latest_per_outcome.market_name
                    AND o.outcome_name = latest_per_outcome.outcome_name
                    AND o.created_at = latest_per_outcome.latest
                 WHERE o.fixture_id = ?1",
            )?;
            let rows = stmt
                .query_map(params![fixture_id, cutoff], row_to_odds)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn upsert_score(&self, fixture_id: &str, score: &Score) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO scores (fixture_id, home_score, away_score, status, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT(fixture_id) DO UPDATE SET
                    home_score = excluded.home_score,
                    away_score = excluded.away_score,
                    status = excluded.status,
                    updated_at = excluded.updated_at",
                params![
                    fixture_id,
                    score.home_score,
                    score.away_score,
                    score.status.as_str(),
                    score.updated_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn get_score(&self, fixture_id: &str) -> Result<Option<Score>> {
        self.with_conn(|conn| {
            conn.query_row(
                "SELECT home_score, away_score, status, updated_at FROM scores WHERE fixture_id = ?1",
                params![fixture_id],
                row_to_score,
            )
            .optional()
            .map_err(Into::into)
        })
    }

    /// Every score row whose id starts with one of `prefixes` (e.g.
    /// `"flashscore_"`, `"livescore_"`) — the candidate set Settlement's
    /// fallback scan (§4.5) parses with `arbihawk_identity::parse_synthetic_id`
    /// and matches against a bet's fixture by team name and date, since a
    /// synthetic id never equals the bet's real `fixture_id` and so cannot
    /// be resolved by a SQL join.
    pub fn scores_with_id_prefix(&self, prefixes: &[&str]) -> Result<Vec<(String, Score)>> {
        if prefixes.is_empty() {
            return Ok(Vec::new());
        }
        self.with_conn(|conn| {
            let clause = prefixes.iter().map(|_| "fixture_id LIKE ?").collect::<Vec<_>>().join(" OR ");
            let sql = format!(
                "SELECT fixture_id, home_score, away_score, status, updated_at
                 FROM scores WHERE {clause}"
            );
            let mut stmt = conn.prepare(&sql)?;
            let patterns: Vec<String> = prefixes.iter().map(|p| format!("{p}%")).collect();
            let rows = stmt
                .query_map(rusqlite::params_from_iter(patterns.iter()), |row| {
                    let id: String = row.get(0)?;
                    let status: String = row.get(3)?;
                    Ok((
                        id,
                        Score {
                            home_score: row.get(1)?,
                            away_score: row.get(2)?,
                            status: FixtureStatus::from_str(&status)
                                .unwrap_or(FixtureStatus::Scheduled),
                            updated_at: row.get(4)?,
                        },
                    ))
                })?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Deletes every score row whose id starts with one of `prefixes` —
    /// the Collection task's cleanup of stale unmatchable synthetic rows
    /// (e.g. a legacy `fbref_*` id from a retired source) that will never
    /// resolve to a real fixture (§4.8). Returns the number of rows removed.
    pub fn delete_scores_with_id_prefix(&self, prefixes: &[&str]) -> Result<u64> {
        if prefixes.is_empty() {
            return Ok(0);
        }
        self.with_conn(|conn| {
            let clause = prefixes.iter().map(|_| "fixture_id LIKE ?").collect::<Vec<_>>().join(" OR ");
            let sql = format!("DELETE FROM scores WHERE {clause}");
            let patterns: Vec<String> = prefixes.iter().map(|p| format!("{p}%")).collect();
            let deleted = conn.execute(&sql, rusqlite::params_from_iter(patterns.iter()))?;
            Ok(deleted as u64)
        })
    }
}

fn row_to_fixture(row: &rusqlite::Row<'_>) -> rusqlite::Result<Fixture> {
    let status: String = row.get(6)?;
    Ok(Fixture {
        fixture_id: row.get::<_, String>(0)?.into(),
        source: row.get::<_, String>(1)?.into(),
        tournament_name: row.get(2)?,
        home_team_name: row.get(3)?,
        away_team_name: row.get(4)?,
        start_time: row.get(5)?,
        status: FixtureStatus::from_str(&status).unwrap_or(FixtureStatus::Scheduled),
        created_at: row.get(7)?,
    })
}

fn row_to_odds(row: &rusqlite::Row<'_>) -> rusqlite::Result<OddsRow> {
    Ok(OddsRow {
        fixture_id: row.get::<_, String>(0)?.into(),
        bookmaker_name: row.get(1)?,
        market_name: row.get(2)?,
        outcome_name: row.get(3)?,
        odds_value: row.get(4)?,
        created_at: row.get(5)?,
    })
}

fn row_to_score(row: &rusqlite::Row<'_>) -> rusqlite::Result<Score> {
    let status: String = row.get(2)?;
    Ok(Score {
        home_score: row.get(0)?,
        away_score: row.get(1)?,
        status: FixtureStatus::from_str(&status).unwrap_or(FixtureStatus::Scheduled),
        updated_at: row.get(3)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(id: &str, home: &str, away: &str, start: DateTime<Utc>) -> Fixture {
        Fixture {
            fixture_id: id.into(),
            source: "betano".into(),
            tournament_name: Some("Premier League".into()),
            home_team_name: home.into(),
            away_team_name: away.into(),
            start_time: start,
            status: FixtureStatus::Scheduled,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        store.upsert_fixture(&fixture("f1", "Arsenal", "Chelsea", now)).unwrap();

        let got = store.get_fixture("f1").unwrap().unwrap();
        assert_eq!(got.home_team_name, "Arsenal");
        assert_eq!(got.status, FixtureStatus::Scheduled);
    }

    #[test]
    fn upsert_overwrites_existing_row() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        store.upsert_fixture(&fixture("f1", "Arsenal", "Chelsea", now)).unwrap();

        let mut updated = fixture("f1", "Arsenal", "Chelsea", now);
        updated.status = FixtureStatus::Live;
        store.upsert_fixture(&updated).unwrap();

        assert_eq!(store.get_fixture("f1").unwrap().unwrap().status, FixtureStatus::Live);
    }

    #[test]
    fn fixtures_in_window_respects_tolerance() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        store.upsert_fixture(&fixture("near", "A", "B", now)).unwrap();
        store.upsert_fixture(&fixture("far", "C", "D", now + Duration::hours(48))).unwrap();

        let found = store.fixtures_in_window(now, Duration::hours(24)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].fixture_id, "near");
    }

    #[test]
    fn latest_odds_picks_most_recent_per_outcome() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        store.upsert_fixture(&fixture("f1", "A", "B", now)).unwrap();

        let stale = OddsRow {
            fixture_id: "f1".into(),
            bookmaker_name: "betano".into(),
            market_name: "1x2".into(),
            outcome_name: "home".into(),
            odds_value: 1.5,
            created_at: now - Duration::hours(2),
        };
        let fresh = OddsRow { odds_value: 1.8, created_at: now - Duration::minutes(5), ..stale.clone() };
        store.insert_odds_batch(&[stale, fresh]).unwrap();

        let latest = store.latest_odds_for_fixture("f1", now).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].odds_value, 1.8);
    }

    #[test]
    fn insert_odds_batch_overwrites_in_place_on_rescrape() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        store.upsert_fixture(&fixture("f1", "A", "B", now)).unwrap();

        let first = OddsRow {
            fixture_id: "f1".into(),
            bookmaker_name: "betano".into(),
            market_name: "1x2".into(),
            outcome_name: "home".into(),
            odds_value: 2.0,
            created_at: now,
        };
        store.insert_odds_batch(&[first.clone()]).unwrap();

        // A later scrape re-quotes the same outcome; it should update the
        // existing row, not accumulate a duplicate.
        let rescraped = OddsRow { odds_value: 2.4, created_at: now + Duration::minutes(10), ..first };
        store.insert_odds_batch(&[rescraped]).unwrap();

        let latest = store.latest_odds_for_fixture("f1", now + Duration::hours(1)).unwrap();
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[0].odds_value, 2.4);
    }

    #[test]
    fn scores_with_id_prefix_finds_synthetic_rows_only() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        store.upsert_fixture(&fixture("real_id", "Arsenal", "Chelsea", now)).unwrap();
        store
            .upsert_score(
                "real_id",
                &Score { home_score: 1, away_score: 1, status: FixtureStatus::Finished, updated_at: now },
            )
            .unwrap();

        let synthetic_id = "flashscore_arsenal_chelsea_2026-01-01";
        store
            .upsert_score(
                synthetic_id,
                &Score { home_score: 2, away_score: 1, status: FixtureStatus::Finished, updated_at: now },
            )
            .unwrap();

        let found = store.scores_with_id_prefix(&["flashscore_", "livescore_"]).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].0, synthetic_id);
    }

    #[test]
    fn delete_scores_with_id_prefix_removes_only_matching_rows() {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        store.upsert_fixture(&fixture("real_id", "Arsenal", "Chelsea", now)).unwrap();
        let score = Score { home_score: 1, away_score: 0, status: FixtureStatus::Finished, updated_at: now };
        store.upsert_score("real_id", &score).unwrap();
        store.upsert_score("fbref_arsenal_chelsea_2020-01-01", &score).unwrap();
        store.upsert_score("fbref_other_match_2020-01-02", &score).unwrap();

        let deleted = store.delete_scores_with_id_prefix(&["fbref_"]).unwrap();
        assert_eq!(deleted, 2);
        assert!(store.get_score("real_id").unwrap().is_some());
        assert!(store.scores_with_id_prefix(&["fbref_"]).unwrap().is_empty());
    }
}
