#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! # Validate
//!
//! The Validator (§4.3): checks a parsed scraper payload's shape against
//! what its [`SourceKind`] is expected to carry, before the ingestion
//! pipeline writes anything through the Store. Pure — no I/O, no database.

use arbihawk_markets::SourceKind;
use serde_json::Value;

/// Outcome of validating one payload. `parsed = nil`/`valid = false`
/// (§4.3) is represented here as `valid: false`; the ingestion pipeline is
/// responsible for treating that as "no data-plane writes".
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ValidationReport {
    pub valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ValidationReport {
    fn fail(errors: Vec<String>) -> Self {
        Self { valid: false, errors, warnings: Vec::new() }
    }
}

/// Validates `payload` against the root shape its `source` is expected to
/// carry (§4.3): odds sources expect a list or `{league_id, fixtures}`;
/// score sources expect `{matches: [...]}`; price sources expect a list of
/// bars or `{symbol, bars: [...]}`.
pub fn validate(source: SourceKind, payload: &Value) -> ValidationReport {
    if source.expects_odds_root() {
        validate_odds_root(payload)
    } else if source.expects_score_root() {
        validate_score_root(payload)
    } else if source.expects_price_root() {
        validate_price_root(payload)
    } else {
        ValidationReport::fail(vec![format!("unrecognised source kind: {source}")])
    }
}

fn validate_odds_root(payload: &Value) -> ValidationReport {
    let leagues: Vec<&Value> = match payload {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) if map.contains_key("fixtures") => vec![payload],
        _ => {
            return ValidationReport::fail(vec![
                "odds payload must be a list of leagues or an object carrying `fixtures`".into(),
            ])
        }
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for (i, league) in leagues.iter().enumerate() {
        let Some(fixtures) = league.get("fixtures").and_then(Value::as_array) else {
            errors.push(format!("league[{i}] missing `fixtures` array"));
            continue;
        };
        if fixtures.is_empty() {
            warnings.push(format!("league[{i}] has no fixtures"));
        }
        for (j, fixture) in fixtures.iter().enumerate() {
            for (long_field, short_field) in [("home_team_name", "home_team"), ("away_team_name", "away_team")] {
                let present = fixture.get(long_field).and_then(Value::as_str).is_some()
                    || fixture.get(short_field).and_then(Value::as_str).is_some();
                if !present {
                    errors.push(format!("league[{i}].fixtures[{j}] missing `{long_field}`/`{short_field}`"));
                }
            }
            if fixture.get("start_time").and_then(Value::as_str).is_none() {
                errors.push(format!("league[{i}].fixtures[{j}] missing `start_time`"));
            }
            match fixture.get("odds") {
                Some(Value::Array(odds)) if odds.is_empty() => {
                    warnings.push(format!("league[{i}].fixtures[{j}] has no odds"));
                }
                Some(Value::Array(_)) => {}
                _ => errors.push(format!("league[{i}].fixtures[{j}] missing `odds` array")),
            }
        }
    }

    if errors.is_empty() {
        ValidationReport { valid: true, errors, warnings }
    } else {
        ValidationReport { valid: false, errors, warnings }
    }
}

fn validate_score_root(payload: &Value) -> ValidationReport {
    let Some(matches) = payload.get("matches").and_then(Value::as_array) else {
        return ValidationReport::fail(vec!["score payload missing `matches` array".into()]);
    };

    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    for (i, m) in matches.iter().enumerate() {
        // §6: scrapers may emit either `home_team_name`/`away_team_name` or
        // the shorter `home_team`/`away_team`; the pipeline accepts both.
        for (long_field, short_field) in [("home_team_name", "home_team"), ("away_team_name", "away_team")] {
            let present = m.get(long_field).and_then(Value::as_str).is_some()
                || m.get(short_field).and_then(Value::as_str).is_some();
            if !present {
                errors.push(format!("matches[{i}] missing `{long_field}`/`{short_field}`"));
            }
        }
        let has_both_scores =
            m.get("home_score").and_then(Value::as_i64).is_some()
                && m.get("away_score").and_then(Value::as_i64).is_some();
        if !has_both_scores {
            warnings.push(format!("matches[{i}] is not yet complete (missing a score)"));
        }
        // §6: either `start_time` or `match_date` identifies when it was played.
        let has_time = m.get("start_time").and_then(Value::as_str).is_some()
            || m.get("match_date").and_then(Value::as_str).is_some();
        if !has_time {
            errors.push(format!("matches[{i}] missing `start_time`/`match_date`"));
        }
    }

    ValidationReport { valid: errors.is_empty(), errors, warnings }
}

fn validate_price_root(payload: &Value) -> ValidationReport {
    let bars: Vec<&Value> = match payload {
        Value::Array(items) => items.iter().collect(),
        Value::Object(map) => match map.get("bars").and_then(Value::as_array) {
            Some(bars) => bars.iter().collect(),
            None => return ValidationReport::fail(vec!["price payload missing `bars` array".into()]),
        },
        _ => return ValidationReport::fail(vec!["price payload must be a list or object".into()]),
    };

    let mut errors = Vec::new();
    for (i, bar) in bars.iter().enumerate() {
        for field in ["symbol", "timestamp", "open", "high", "low", "close", "volume"] {
            if bar.get(field).is_none() {
                errors.push(format!("bars[{i}] missing `{field}`"));
            }
        }
    }

    ValidationReport { valid: errors.is_empty(), errors, warnings: Vec::new() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_betano_payload_passes() {
        let payload = json!([{
            "league_id": "epl",
            "fixtures": [{
                "home_team": "Arsenal", "away_team": "Chelsea", "start_time": "2026-01-01T15:00:00Z",
                "odds": [{"market": "1x2", "outcome": "home", "price": 1.9}]
            }]
        }]);
        let report = validate(SourceKind::Betano, &payload);
        assert!(report.valid, "{:?}", report.errors);
    }

    #[test]
    fn betano_payload_missing_fixtures_field_fails() {
        let payload = json!([{"league_id": "epl"}]);
        let report = validate(SourceKind::Betano, &payload);
        assert!(!report.valid);
    }

    #[test]
    fn flashscore_payload_warns_on_incomplete_match() {
        let payload = json!({"matches": [
            {"home_team": "A", "away_team": "B", "start_time": "2026-01-01T15:00:00Z"}
        ]});
        let report = validate(SourceKind::Flashscore, &payload);
        assert!(report.valid, "{:?}", report.errors);
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn flashscore_payload_missing_matches_fails() {
        let report = validate(SourceKind::Flashscore, &json!({}));
        assert!(!report.valid);
    }

    #[test]
    fn stocks_payload_rejects_bar_missing_close() {
        let payload = json!([{"symbol": "AAPL", "timestamp": "2026-01-01T00:00:00Z",
            "open": 1.0, "high": 2.0, "low": 0.5, "volume": 100.0}]);
        let report = validate(SourceKind::Stocks, &payload);
        assert!(!report.valid);
        assert!(report.errors[0].contains("close"));
    }
}
