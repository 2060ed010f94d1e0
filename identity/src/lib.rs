#![forbid(unsafe_code)]
#![warn(missing_debug_implementations, rust_2018_idioms)]

//! # Match-identity
//!
//! Pure library for reconciling sports data across providers that share no
//! common identifier. Three operations, no I/O, no database, no network:
//!
//! - [`normalize`] — canonicalise a team name for comparison.
//! - [`similarity`] — fuzzy-match two team names, `0..=100`.
//! - [`parse_synthetic_id`] / [`format_synthetic_id`] — the
//!   `<source>_<home>_<away>_<date>` scheme used to key scores that arrive
//!   before their fixture is known.

use std::collections::HashMap;

mod synthetic;

pub use synthetic::{format_synthetic_id, parse_synthetic_id, SyntheticId, DEFAULT_SYNTHETIC_SOURCES};

/// Trailing club-type suffixes stripped during normalisation.
const CLUB_SUFFIXES: &[&str] = &[" fc", " cf", " sc", " ac", " afc", " bc"];

/// Team-name aliases folding common short forms to a canonical name.
fn default_aliases() -> HashMap<&'static str, &'static str> {
    [
        ("man utd", "manchester united"),
        ("man united", "manchester united"),
        ("man city", "manchester city"),
        ("spurs", "tottenham"),
        ("tottenham hotspur", "tottenham"),
        ("wolverhampton", "wolves"),
        ("wolverhampton wanderers", "wolves"),
        ("nottm forest", "nottingham forest"),
        ("west ham", "west ham united"),
        ("sheffield utd", "sheffield united"),
        ("newcastle utd", "newcastle united"),
        ("brighton", "brighton and hove albion"),
        ("real", "real madrid"),
        ("atleti", "atletico madrid"),
        ("atletico", "atletico madrid"),
        ("barca", "barcelona"),
        ("fc barcelona", "barcelona"),
        ("bayern", "bayern munich"),
        ("fc bayern", "bayern munich"),
        ("dortmund", "borussia dortmund"),
        ("bvb", "borussia dortmund"),
        ("gladbach", "borussia monchengladbach"),
        ("psg", "paris saint-germain"),
        ("paris sg", "paris saint-germain"),
        ("inter", "inter milan"),
        ("internazionale", "inter milan"),
        ("ac milan", "milan"),
        ("juve", "juventus"),
    ]
    .into_iter()
    .collect()
}

/// A configurable team-name normaliser and fuzzy matcher.
///
/// [`normalize`] and [`similarity`] are convenience wrappers around
/// [`Normalizer::default`]; construct a [`Normalizer`] directly to supply a
/// project-specific alias map.
#[derive(Debug, Clone)]
pub struct Normalizer {
    aliases: HashMap<String, String>,
}

impl Default for Normalizer {
    fn default() -> Self {
        Self {
            aliases: default_aliases()
                .into_iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }
}

impl Normalizer {
    /// Build a normaliser with a custom alias map (merged over the defaults).
    pub fn with_aliases(extra: HashMap<String, String>) -> Self {
        let mut normalizer = Self::default();
        normalizer.aliases.extend(extra);
        normalizer
    }

    /// Lowercase, trim, strip a trailing club-type suffix, then apply aliases.
    pub fn normalize(&self, name: &str) -> String {
        if name.is_empty() {
            return String::new();
        }
        let mut normalized = name.to_lowercase();
        normalized.truncate(normalized.trim_end().len());
        let normalized = normalized.trim().to_string();

        let mut normalized = normalized;
        for suffix in CLUB_SUFFIXES {
            if let Some(stripped) = normalized.strip_suffix(suffix) {
                normalized = stripped.trim().to_string();
                break;
            }
        }

        self.aliases
            .get(normalized.as_str())
            .cloned()
            .unwrap_or(normalized)
    }

    /// Similarity between two (unnormalised) team names, `0..=100`.
    ///
    /// Exact equality after normalisation short-circuits to 100; otherwise
    /// the maximum of simple ratio, partial ratio and token-sort ratio, all
    /// backed by [`strsim`]. With the `fuzzy-backend` feature disabled this
    /// degrades to substring containment (85) or token-Jaccard.
    pub fn similarity(&self, a: &str, b: &str) -> u8 {
        let n1 = self.normalize(a);
        let n2 = self.normalize(b);

        if n1 == n2 {
            return 100;
        }
        if n1.is_empty() || n2.is_empty() {
            return 0;
        }

        fuzzy::best_score(&n1, &n2)
    }
}

#[cfg(feature = "fuzzy-backend")]
mod fuzzy {
    /// Best of simple ratio, partial ratio and token-sort ratio.
    pub(crate) fn best_score(n1: &str, n2: &str) -> u8 {
        let ratio = simple_ratio(n1, n2);
        let partial = partial_ratio(n1, n2);
        let token_sort = token_sort_ratio(n1, n2);
        ratio.max(partial).max(token_sort)
    }

    fn simple_ratio(a: &str, b: &str) -> u8 {
        to_pct(strsim::normalized_levenshtein(a, b))
    }

    /// Approximates rapidfuzz's `partial_ratio`: align the shorter string
    /// against every equal-length window of the longer one and keep the best
    /// normalised-Levenshtein score.
    fn partial_ratio(a: &str, b: &str) -> u8 {
        let (short, long) = if a.chars().count() <= b.chars().count() {
            (a, b)
        } else {
            (b, a)
        };
        let short_len = short.chars().count();
        let long_chars: Vec<char> = long.chars().collect();

        if short_len == 0 || long_chars.len() <= short_len {
            return to_pct(strsim::normalized_levenshtein(short, long));
        }

        let mut best = 0.0_f64;
        for start in 0..=(long_chars.len() - short_len) {
            let window: String = long_chars[start..start + short_len].iter().collect();
            let score = strsim::normalized_levenshtein(short, &window);
            if score > best {
                best = score;
            }
        }
        to_pct(best)
    }

    fn token_sort_ratio(a: &str, b: &str) -> u8 {
        to_pct(strsim::normalized_levenshtein(&sorted_tokens(a), &sorted_tokens(b)))
    }

    fn sorted_tokens(s: &str) -> String {
        let mut tokens: Vec<&str> = s.split_whitespace().collect();
        tokens.sort_unstable();
        tokens.join(" ")
    }

    fn to_pct(ratio: f64) -> u8 {
        (ratio * 100.0).round().clamp(0.0, 100.0) as u8
    }
}

#[cfg(not(feature = "fuzzy-backend"))]
mod fuzzy {
    use std::collections::HashSet;

    pub(crate) fn best_score(n1: &str, n2: &str) -> u8 {
        if n1.contains(n2) || n2.contains(n1) {
            return 85;
        }

        let p1: HashSet<&str> = n1.split_whitespace().collect();
        let p2: HashSet<&str> = n2.split_whitespace().collect();
        let common = p1.intersection(&p2).count();
        if common == 0 {
            return 0;
        }
        let union = p1.union(&p2).count();
        ((common as f64 / union as f64) * 100.0).round() as u8
    }
}

/// Normalise a team name using the default alias map.
///
/// `normalize(normalize(s)) == normalize(s)` for all `s`: stripping a suffix
/// and applying an alias both yield strings that are already normal form.
pub fn normalize(name: &str) -> String {
    Normalizer::default().normalize(name)
}

/// Fuzzy-similarity between two team names using the default alias map.
pub fn similarity(a: &str, b: &str) -> u8 {
    Normalizer::default().similarity(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_suffix_and_aliases() {
        assert_eq!(normalize("Manchester United FC"), "manchester united");
        assert_eq!(normalize("Man Utd"), "manchester united");
        assert_eq!(normalize("  Wolves AFC "), "wolves");
    }

    #[test]
    fn normalize_is_idempotent() {
        for name in ["Manchester United FC", "Spurs", "Lokomotiv Plovdiv", ""] {
            let once = normalize(name);
            let twice = normalize(&once);
            assert_eq!(once, twice);
        }
    }

    #[test]
    fn similarity_exact_after_normalization_is_100() {
        assert_eq!(similarity("Manchester United FC", "Man Utd"), 100);
    }

    #[test]
    fn similarity_of_unrelated_names_is_low() {
        assert!(similarity("Arsenal", "Napoli") < 50);
    }

    #[test]
    fn similarity_rewards_close_misspellings() {
        assert!(similarity("Liverpool", "Liverpol") >= 85);
    }
}
