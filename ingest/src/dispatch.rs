//! Per-source payload dispatch (§4.3, §6): turns a validated JSON payload
//! into Store writes. Runs after [`crate::subprocess`] has captured a
//! payload and [`arbihawk_validate::validate`] has accepted its shape.

use crate::error::Result;
use arbihawk_identity::format_synthetic_id;
use arbihawk_instrument::{AssetMeta, AssetType, Fixture, OddsRow, PriceBar, Score};
use arbihawk_markets::{FixtureStatus, SourceKind};
use arbihawk_matcher::Matcher;
use arbihawk_store::Store;
use chrono::{DateTime, Utc};
use serde_json::Value;
use smol_str::SmolStr;

/// Betano odds + fixtures (§6: a list of leagues, or a single
/// `{league_id, fixtures}` object). Returns the number of odds rows written.
pub fn ingest_betano(store: &Store, payload: &Value) -> Result<u64> {
    let leagues: Vec<&Value> = match payload {
        Value::Array(items) => items.iter().collect(),
        Value::Object(_) => vec![payload],
        _ => return Ok(0),
    };

    let mut written = 0u64;
    for league in leagues {
        let Some(fixtures) = league.get("fixtures").and_then(Value::as_array) else { continue };
        for fixture_json in fixtures {
            let Some(fixture) = parse_betano_fixture(fixture_json, league) else { continue };
            store.upsert_fixture(&fixture)?;

            let odds_rows = parse_betano_odds(fixture_json, &fixture.fixture_id);
            if !odds_rows.is_empty() {
                store.insert_odds_batch(&odds_rows)?;
                written += odds_rows.len() as u64;
            }
        }
    }
    Ok(written)
}

fn parse_betano_fixture(fixture_json: &Value, league: &Value) -> Option<Fixture> {
    let fixture_id = fixture_json.get("fixture_id").and_then(Value::as_str)?;
    let home_team_name = text_field(fixture_json, "home_team_name", "home_team")?;
    let away_team_name = text_field(fixture_json, "away_team_name", "away_team")?;
    let start_time = parse_timestamp(fixture_json.get("start_time").and_then(Value::as_str)?)?;
    let status = fixture_json
        .get("status")
        .and_then(Value::as_str)
        .and_then(|s| s.parse().ok())
        .unwrap_or(FixtureStatus::Scheduled);
    let tournament_name = league
        .get("league_name")
        .or_else(|| league.get("tournament_name"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(Fixture {
        fixture_id: SmolStr::new(fixture_id),
        source: SmolStr::new("betano"),
        tournament_name,
        home_team_name,
        away_team_name,
        start_time,
        status,
        created_at: Utc::now(),
    })
}

fn parse_betano_odds(fixture_json: &Value, fixture_id: &SmolStr) -> Vec<OddsRow> {
    let Some(odds) = fixture_json.get("odds").and_then(Value::as_array) else { return Vec::new() };
    let now = Utc::now();
    odds.iter()
        .filter_map(|row| {
            let market_name = row.get("market_name").and_then(Value::as_str)?;
            let outcome_name = row.get("outcome_name").and_then(Value::as_str)?;
            let odds_value = row.get("odds_value").and_then(Value::as_f64)?;
            Some(OddsRow {
                fixture_id: fixture_id.clone(),
                bookmaker_name: "betano".to_string(),
                market_name: market_name.to_string(),
                outcome_name: outcome_name.to_string(),
                odds_value,
                created_at: now,
            })
        })
        .collect()
}

/// Flashscore/Livescore completed-match scores (§4.4, §6): for each match
/// carrying both scores, resolve (or synthesize) a fixture id via `matcher`
/// and upsert the scoreline under it. Returns the number of scores written.
pub fn ingest_match_scores(
    store: &Store,
    matcher: &Matcher<'_>,
    payload: &Value,
    source: SourceKind,
) -> Result<u64> {
    let Some(matches) = payload.get("matches").and_then(Value::as_array) else { return Ok(0) };

    let mut written = 0u64;
    for m in matches {
        let (Some(home_score), Some(away_score)) =
            (m.get("home_score").and_then(Value::as_i64), m.get("away_score").and_then(Value::as_i64))
        else {
            continue;
        };
        let Some(home) = text_field(m, "home_team_name", "home_team") else { continue };
        let Some(away) = text_field(m, "away_team_name", "away_team") else { continue };
        let Some(match_time) = m
            .get("start_time")
            .or_else(|| m.get("match_date"))
            .and_then(Value::as_str)
        else {
            continue;
        };

        let status = m
            .get("status")
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or(FixtureStatus::Finished);
        let score = Score {
            home_score: home_score as i32,
            away_score: away_score as i32,
            status,
            updated_at: Utc::now(),
        };

        let fixture_id = match matcher.match_score(&home, &away, match_time)? {
            Some(id) => id,
            None => {
                let date = match_time.get(0..10).unwrap_or(match_time);
                SmolStr::new(format_synthetic_id(source.as_str(), &home, &away, date))
            }
        };

        store.upsert_score(&fixture_id, &score)?;
        written += 1;
    }
    Ok(written)
}

/// Stocks/Crypto OHLCV bars (§6: a list of bars, or an object carrying
/// `symbol`/`bars`). Returns the number of bars written.
pub fn ingest_price_bars(store: &Store, payload: &Value, asset_type: AssetType) -> Result<u64> {
    let (symbol_hint, bars): (Option<&str>, Vec<&Value>) = match payload {
        Value::Array(items) => (None, items.iter().collect()),
        Value::Object(map) => (
            map.get("symbol").and_then(Value::as_str),
            map.get("bars").and_then(Value::as_array).map(|b| b.iter().collect()).unwrap_or_default(),
        ),
        _ => return Ok(0),
    };

    let mut parsed_bars = Vec::with_capacity(bars.len());
    for bar_json in &bars {
        let Some(bar) = parse_price_bar(bar_json, asset_type, symbol_hint) else { continue };
        parsed_bars.push(bar);
    }

    for symbol in parsed_bars.iter().map(|b| b.symbol.clone()).collect::<std::collections::BTreeSet<_>>() {
        store.upsert_asset(&AssetMeta { symbol, asset_type, name: String::new(), sector: None })?;
    }

    if !parsed_bars.is_empty() {
        store.insert_price_bars_batch(&parsed_bars)?;
    }
    Ok(parsed_bars.len() as u64)
}

fn parse_price_bar(bar_json: &Value, asset_type: AssetType, symbol_hint: Option<&str>) -> Option<PriceBar> {
    let symbol = bar_json.get("symbol").and_then(Value::as_str).or(symbol_hint)?;
    let timestamp = parse_timestamp(bar_json.get("timestamp").and_then(Value::as_str)?)?;
    Some(PriceBar {
        symbol: SmolStr::new(symbol),
        asset_type,
        timestamp,
        open: bar_json.get("open").and_then(Value::as_f64)?,
        high: bar_json.get("high").and_then(Value::as_f64)?,
        low: bar_json.get("low").and_then(Value::as_f64)?,
        close: bar_json.get("close").and_then(Value::as_f64)?,
        volume: bar_json.get("volume").and_then(Value::as_f64).unwrap_or(0.0),
    })
}

/// Reads `long_field`, falling back to `short_field` (§6 dual-naming tolerance).
fn text_field(value: &Value, long_field: &str, short_field: &str) -> Option<String> {
    value
        .get(long_field)
        .or_else(|| value.get(short_field))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn betano_ingestion_writes_a_fixture_and_its_odds() {
        let store = Store::open_in_memory().unwrap();
        let payload = json!([{
            "league_id": "epl",
            "league_name": "Premier League",
            "fixtures": [{
                "fixture_id": "betano_123",
                "home_team_name": "Team A",
                "away_team_name": "Team B",
                "start_time": "2025-01-20T15:00:00Z",
                "odds": [{"market_name": "1x2", "outcome_name": "1", "odds_value": 2.5}]
            }]
        }]);

        let written = ingest_betano(&store, &payload).unwrap();
        assert_eq!(written, 1);

        let fixture = store.get_fixture("betano_123").unwrap().unwrap();
        assert_eq!(fixture.home_team_name, "Team A");
        assert_eq!(fixture.tournament_name.as_deref(), Some("Premier League"));

        let odds = store.latest_odds_for_fixture("betano_123", Utc::now()).unwrap();
        assert_eq!(odds.len(), 1);
        assert_eq!(odds[0].odds_value, 2.5);
    }

    #[test]
    fn flashscore_ingestion_resolves_a_known_fixture() {
        let store = Store::open_in_memory().unwrap();
        store
            .upsert_fixture(&Fixture {
                fixture_id: "betano_123".into(),
                source: "betano".into(),
                tournament_name: None,
                home_team_name: "Team A".into(),
                away_team_name: "Team B".into(),
                start_time: parse_timestamp("2025-01-20T15:00:00Z").unwrap(),
                status: FixtureStatus::Scheduled,
                created_at: Utc::now(),
            })
            .unwrap();

        let matcher = Matcher::new(&store);
        let payload = json!({"matches": [{
            "home_team_name": "Team A", "away_team_name": "Team B",
            "start_time": "2025-01-20T15:00:00Z", "home_score": 2, "away_score": 1
        }]});

        let written = ingest_match_scores(&store, &matcher, &payload, SourceKind::Flashscore).unwrap();
        assert_eq!(written, 1);
        let score = store.get_score("betano_123").unwrap().unwrap();
        assert_eq!((score.home_score, score.away_score), (2, 1));
    }

    #[test]
    fn flashscore_ingestion_falls_back_to_a_synthetic_id_when_unmatched() {
        let store = Store::open_in_memory().unwrap();
        let matcher = Matcher::new(&store);
        let payload = json!({"matches": [{
            "home_team_name": "Nobody", "away_team_name": "Nothing",
            "start_time": "2025-01-20T15:00:00Z", "home_score": 0, "away_score": 0
        }]});

        let written = ingest_match_scores(&store, &matcher, &payload, SourceKind::Flashscore).unwrap();
        assert_eq!(written, 1);
        let score = store.get_score("flashscore_Nobody_Nothing_2025-01-20").unwrap();
        assert!(score.is_some());
    }

    #[test]
    fn incomplete_matches_are_skipped() {
        let store = Store::open_in_memory().unwrap();
        let matcher = Matcher::new(&store);
        let payload = json!({"matches": [{
            "home_team_name": "A", "away_team_name": "B", "start_time": "2025-01-20T15:00:00Z"
        }]});

        let written = ingest_match_scores(&store, &matcher, &payload, SourceKind::Flashscore).unwrap();
        assert_eq!(written, 0);
    }

    #[test]
    fn stocks_ingestion_writes_bars_and_asset_metadata() {
        let store = Store::open_in_memory().unwrap();
        let payload = json!([{
            "symbol": "AAPL", "timestamp": "2026-01-01T00:00:00Z",
            "open": 1.0, "high": 2.0, "low": 0.5, "close": 1.8, "volume": 1000.0
        }]);

        let written = ingest_price_bars(&store, &payload, AssetType::Stock).unwrap();
        assert_eq!(written, 1);
        let bars = store.price_bars("AAPL", AssetType::Stock, 10).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 1.8);
    }
}
