//! The synthetic fixture/score-id scheme: `<source>_<home>_<away>_<date>`.
//!
//! Used when a score arrives before its fixture is known. See the module
//! doc-level design note: the parsed tuple is never authoritative identity —
//! callers must reconcile it back via [`crate::similarity`] plus a time
//! window (that's [`crate`]'s `Matcher` consumer, not this crate).

use serde::{Deserialize, Serialize};

/// Synthetic-id prefixes recognised by [`parse_synthetic_id`].
///
/// Configurable in principle; the reference set covers the two
/// score-only providers.
pub const DEFAULT_SYNTHETIC_SOURCES: &[&str] = &["flashscore", "livescore"];

/// A parsed synthetic id: `{source, home, away, date}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyntheticId {
    pub source: String,
    pub home: String,
    pub away: String,
    /// `YYYY-MM-DD`.
    pub date: String,
}

/// Build a synthetic id `<source>_<home_with_underscores>_<away_with_underscores>_<date>`.
pub fn format_synthetic_id(source: &str, home: &str, away: &str, date: &str) -> String {
    format!(
        "{}_{}_{}_{}",
        source,
        home.replace(' ', "_"),
        away.replace(' ', "_"),
        date
    )
}

/// Parse a synthetic id produced by [`format_synthetic_id`].
///
/// Returns `None` if `id` doesn't start with one of `sources` followed by
/// `_`, or doesn't have the `home..away_date` shape (at least three
/// underscore-separated segments after the source, and a final segment that
/// looks like `YYYY-MM-DD`).
///
/// Lossy by construction: the away team is always taken to be the single
/// trailing token, and everything before it becomes the home team. This
/// matches the reference scraper's emission shape, but a home or away name
/// that itself contains an underscore-worthy multi-word away team will not
/// round-trip losslessly — see the crate-level design note.
pub fn parse_synthetic_id(id: &str) -> Option<SyntheticId> {
    parse_synthetic_id_with_sources(id, DEFAULT_SYNTHETIC_SOURCES)
}

/// Like [`parse_synthetic_id`] but with an explicit prefix allow-list.
pub fn parse_synthetic_id_with_sources(id: &str, sources: &[&str]) -> Option<SyntheticId> {
    let (source, rest) = sources.iter().find_map(|source| {
        id.strip_prefix(source)
            .and_then(|rest| rest.strip_prefix('_'))
            .map(|rest| (*source, rest))
    })?;

    let segments: Vec<&str> = rest.split('_').collect();
    if segments.len() < 3 {
        return None;
    }

    let (date, team_segments) = segments.split_last().expect("checked len >= 3");
    if !looks_like_date(date) {
        return None;
    }

    let (away, home_segments) = team_segments.split_last()?;
    if home_segments.is_empty() {
        return None;
    }

    Some(SyntheticId {
        source: source.to_string(),
        home: home_segments.join(" "),
        away: away.to_string(),
        date: date.to_string(),
    })
}

fn looks_like_date(s: &str) -> bool {
    let bytes = s.as_bytes();
    bytes.len() == 10
        && bytes[4] == b'-'
        && bytes[7] == b'-'
        && s.chars().enumerate().all(|(i, c)| match i {
            4 | 7 => c == '-',
            _ => c.is_ascii_digit(),
        })
}
