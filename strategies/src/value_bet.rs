//! Value-bet engine (§4.6): for each outcome with a model-probability quote,
//! compares it to the market's (margin-adjusted) implied probability and
//! emits a bet candidate when the expected value clears a threshold.
//!
//! Model probabilities are supplied by the caller — training and inference
//! are an out-of-scope collaborator (§1); this engine only consumes their
//! output.

use crate::error::Result;
use arbihawk_risk::value_bet_ev;
use arbihawk_store::Store;
use chrono::{DateTime, Utc};
use smol_str::SmolStr;
use std::collections::HashMap;

/// Tunables for [`find_value_bets`] (§4.6 and §9's configuration surface).
#[derive(Debug, Clone)]
pub struct ValueBetConfig {
    pub ev_threshold: f64,
    pub fixed_stake: f64,
    /// Per-market bookmaker margin, keyed by the same `market_name` passed
    /// to [`find_value_bets`]. Falls back to `default_margin` when absent.
    pub market_margins: HashMap<String, f64>,
    pub default_margin: f64,
}

impl Default for ValueBetConfig {
    fn default() -> Self {
        Self {
            ev_threshold: 0.05,
            fixed_stake: 10.0,
            market_margins: HashMap::new(),
            default_margin: 0.05,
        }
    }
}

/// A bet candidate that cleared the expected-value gate.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueBetSignal {
    pub fixture_id: SmolStr,
    pub market_name: String,
    pub outcome_name: String,
    pub model_prob: f64,
    pub odds: f64,
    pub ev: f64,
    pub stake: f64,
}

/// Scans one fixture's latest odds for `market_name` against `probabilities`
/// (keyed by lowercased outcome name) and returns every outcome whose EV
/// clears `config.ev_threshold` — ties are not broken, all pass (§4.6).
pub fn find_value_bets(
    store: &Store,
    fixture_id: &str,
    market_name: &str,
    probabilities: &HashMap<String, f64>,
    config: &ValueBetConfig,
    as_of: DateTime<Utc>,
) -> Result<Vec<ValueBetSignal>> {
    let margin = config.market_margins.get(market_name).copied().unwrap_or(config.default_margin);
    let odds_rows = store.latest_odds_for_fixture(fixture_id, as_of)?;

    let mut signals = Vec::new();
    for row in odds_rows {
        if row.market_name != market_name {
            continue;
        }
        let Some(&model_prob) = probabilities.get(&row.outcome_name.to_lowercase()) else {
            continue;
        };
        let Ok(ev) = value_bet_ev(model_prob, row.odds_value, margin) else {
            continue;
        };
        if ev >= config.ev_threshold {
            signals.push(ValueBetSignal {
                fixture_id: row.fixture_id,
                market_name: row.market_name,
                outcome_name: row.outcome_name,
                model_prob,
                odds: row.odds_value,
                ev,
                stake: config.fixed_stake,
            });
        }
    }
    Ok(signals)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arbihawk_instrument::{Fixture, OddsRow};
    use arbihawk_markets::FixtureStatus;

    fn seeded_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        let now = Utc::now();
        store
            .upsert_fixture(&Fixture {
                fixture_id: "f1".into(),
                source: "betano".into(),
                tournament_name: None,
                home_team_name: "Arsenal".into(),
                away_team_name: "Chelsea".into(),
                start_time: now,
                status: FixtureStatus::Scheduled,
                created_at: now,
            })
            .unwrap();
        store
            .insert_odds_batch(&[
                OddsRow {
                    fixture_id: "f1".into(),
                    bookmaker_name: "betano".into(),
                    market_name: "1x2".into(),
                    outcome_name: "home".into(),
                    odds_value: 2.2,
                    created_at: now,
                },
                OddsRow {
                    fixture_id: "f1".into(),
                    bookmaker_name: "betano".into(),
                    market_name: "1x2".into(),
                    outcome_name: "away".into(),
                    odds_value: 3.5,
                    created_at: now,
                },
            ])
            .unwrap();
        store
    }

    #[test]
    fn emits_a_signal_for_an_underpriced_outcome() {
        let store = seeded_store();
        let mut probabilities = HashMap::new();
        probabilities.insert("home".to_string(), 0.6);
        probabilities.insert("away".to_string(), 0.2);

        let signals =
            find_value_bets(&store, "f1", "1x2", &probabilities, &ValueBetConfig::default(), Utc::now()).unwrap();

        assert_eq!(signals.len(), 1);
        assert_eq!(signals[0].outcome_name, "home");
        assert!(signals[0].ev >= 0.05);
    }

    #[test]
    fn emits_every_passing_outcome_on_a_tie() {
        let store = seeded_store();
        let mut probabilities = HashMap::new();
        probabilities.insert("home".to_string(), 0.6);
        probabilities.insert("away".to_string(), 0.4);

        let signals =
            find_value_bets(&store, "f1", "1x2", &probabilities, &ValueBetConfig::default(), Utc::now()).unwrap();

        assert_eq!(signals.len(), 2);
    }

    #[test]
    fn unmapped_outcomes_are_skipped() {
        let store = seeded_store();
        let probabilities = HashMap::new();
        let signals =
            find_value_bets(&store, "f1", "1x2", &probabilities, &ValueBetConfig::default(), Utc::now()).unwrap();
        assert!(signals.is_empty());
    }
}
