//! Market-kind dispatch (§4.5): case-insensitive over the bet's stored
//! `market_name`/`outcome_name`, never over a structured market/outcome id —
//! the reference scrapers emit free text and nothing downstream normalises it.

use arbihawk_markets::BettingMarket;
use regex::Regex;
use std::sync::OnceLock;

fn threshold_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(\d+(?:\.\d+)?)").unwrap())
}

/// `true` if the bet won given the final `(home, away)` score, or `None`
/// if the market/outcome combination is not recognised (bet stays pending).
pub fn evaluate(market: BettingMarket, outcome_name: &str, home: i32, away: i32) -> Option<bool> {
    let outcome = outcome_name.to_lowercase();
    match market {
        BettingMarket::MatchResult => evaluate_match_result(&outcome, home, away),
        BettingMarket::OverUnder => evaluate_over_under(&outcome, home, away),
        BettingMarket::BothTeamsToScore => evaluate_btts(&outcome, home, away),
        BettingMarket::DoubleChance => evaluate_double_chance(&outcome, home, away),
    }
}

fn evaluate_match_result(outcome: &str, home: i32, away: i32) -> Option<bool> {
    let home_win = home > away;
    let draw = home == away;
    let away_win = home < away;

    if outcome.contains("draw") || outcome.trim() == "x" {
        Some(draw)
    } else if outcome.contains("home") || outcome.trim() == "1" {
        Some(home_win)
    } else if outcome.contains("away") || outcome.trim() == "2" {
        Some(away_win)
    } else {
        None
    }
}

fn evaluate_over_under(outcome: &str, home: i32, away: i32) -> Option<bool> {
    let total = (home + away) as f64;
    let threshold = threshold_regex()
        .captures(outcome)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .unwrap_or(2.5);

    if outcome.contains("over") {
        Some(total > threshold)
    } else if outcome.contains("under") {
        Some(total < threshold)
    } else {
        None
    }
}

fn evaluate_btts(outcome: &str, home: i32, away: i32) -> Option<bool> {
    let yes = home > 0 && away > 0;
    if outcome.contains("yes") {
        Some(yes)
    } else if outcome.contains("no") {
        Some(!yes)
    } else {
        None
    }
}

fn evaluate_double_chance(outcome: &str, home: i32, away: i32) -> Option<bool> {
    let compact: String = outcome.chars().filter(|c| !c.is_whitespace()).collect();
    match compact.as_str() {
        "1x" => Some(home >= away),
        "x2" => Some(home <= away),
        "12" => Some(home != away),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn match_result_dispatch() {
        assert_eq!(evaluate(BettingMarket::MatchResult, "Home", 2, 1), Some(true));
        assert_eq!(evaluate(BettingMarket::MatchResult, "Draw", 1, 1), Some(true));
        assert_eq!(evaluate(BettingMarket::MatchResult, "Away", 1, 2), Some(true));
        assert_eq!(evaluate(BettingMarket::MatchResult, "Home", 1, 2), Some(false));
    }

    #[test]
    fn over_under_push_is_a_loss_for_both_sides() {
        assert_eq!(evaluate(BettingMarket::OverUnder, "Over 2", 1, 1), Some(false));
        assert_eq!(evaluate(BettingMarket::OverUnder, "Under 2", 1, 1), Some(false));
    }

    #[test]
    fn over_under_defaults_to_2_5_without_a_number() {
        assert_eq!(evaluate(BettingMarket::OverUnder, "Over", 1, 2), Some(true));
        assert_eq!(evaluate(BettingMarket::OverUnder, "Under", 1, 2), Some(false));
    }

    #[test]
    fn btts_dispatch() {
        assert_eq!(evaluate(BettingMarket::BothTeamsToScore, "Yes", 1, 1), Some(true));
        assert_eq!(evaluate(BettingMarket::BothTeamsToScore, "No", 1, 0), Some(true));
    }

    #[test]
    fn double_chance_dispatch() {
        assert_eq!(evaluate(BettingMarket::DoubleChance, "1X", 1, 1), Some(true));
        assert_eq!(evaluate(BettingMarket::DoubleChance, "X2", 0, 1), Some(true));
        assert_eq!(evaluate(BettingMarket::DoubleChance, "12", 1, 1), Some(false));
    }

    #[test]
    fn unrecognised_outcome_text_returns_none() {
        assert_eq!(evaluate(BettingMarket::MatchResult, "something else", 1, 1), None);
    }
}
