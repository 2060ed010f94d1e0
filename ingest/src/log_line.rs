//! Scraper stdout line grammar (§4.3, §6): a leading `[` or `{` makes a line
//! a JSON *candidate*; every line — candidate or not — can also be parsed as
//! a log line, since a `[ERROR] ...`-prefixed line is syntactically
//! indistinguishable from a JSON candidate until parsing is attempted.

use crate::ansi::strip_ansi_codes;

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum LogLevel {
    Info,
    Warning,
    Error,
    Success,
}

impl LogLevel {
    pub const fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Info => "info",
            LogLevel::Warning => "warning",
            LogLevel::Error => "error",
            LogLevel::Success => "success",
        }
    }
}

/// ANSI-strips and trims `raw_line`, returning the cleaned text.
pub fn clean_line(raw_line: &str) -> String {
    strip_ansi_codes(raw_line.trim())
}

/// A leading `[` or `{` marks a JSON candidate (§4.3). `clean` must already
/// be ANSI-stripped and trimmed.
pub fn is_json_candidate(clean: &str) -> bool {
    clean.starts_with('[') || clean.starts_with('{')
}

/// Parses the level and human message out of one cleaned log line, checking
/// Unicode symbols (✗/⚠/✓/ℹ) before bracketed prefixes (`[ERROR]` etc.),
/// matching the reference scraper bridge's precedence (§4.3, §6).
pub fn parse_log_line(clean: &str) -> (LogLevel, String) {
    (parse_level(clean), clean_message(clean))
}

fn parse_level(clean: &str) -> LogLevel {
    if clean.contains('\u{2717}') {
        LogLevel::Error
    } else if clean.contains('\u{26A0}') {
        LogLevel::Warning
    } else if clean.contains('\u{2713}') {
        LogLevel::Success
    } else if clean.contains('\u{2139}') {
        LogLevel::Info
    } else {
        let upper = clean.to_uppercase();
        if upper.contains("[ERROR]") {
            LogLevel::Error
        } else if upper.contains("[WARNING]") || upper.contains("[WARN]") {
            LogLevel::Warning
        } else if upper.contains("[OK]") || upper.contains("[SUCCESS]") {
            LogLevel::Success
        } else {
            LogLevel::Info
        }
    }
}

fn clean_message(clean: &str) -> String {
    let mut message: String = clean
        .chars()
        .filter(|c| !matches!(c, '\u{2139}' | '\u{2713}' | '\u{2717}' | '\u{26A0}'))
        .collect();
    for tag in ["[INFO]", "[WARNING]", "[WARN]", "[ERROR]", "[OK]", "[SUCCESS]"] {
        message = replace_case_insensitive(&message, tag);
    }
    message.trim().to_string()
}

fn replace_case_insensitive(haystack: &str, needle: &str) -> String {
    let lower_haystack = haystack.to_uppercase();
    let lower_needle = needle.to_uppercase();
    match lower_haystack.find(&lower_needle) {
        Some(start) => {
            let end = start + needle.len();
            format!("{}{}", &haystack[..start], &haystack[end..])
        }
        None => haystack.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn a_json_array_line_is_a_candidate() {
        assert!(is_json_candidate(r#"[{"league_id": "epl"}]"#));
    }

    #[test]
    fn a_plain_log_line_is_not_a_candidate() {
        assert!(!is_json_candidate("scraping league 3 of 10"));
    }

    #[test]
    fn a_bracketed_error_tag_also_looks_like_a_candidate_until_parsed() {
        // Matches the reference bridge: classification is shape-only, the
        // caller decides based on whether JSON parsing actually succeeds.
        assert!(is_json_candidate("[ERROR] timed out fetching league"));
    }

    #[test]
    fn a_checkmark_line_is_a_success_log() {
        let (level, message) = parse_log_line("\u{2713} scraped 10 fixtures");
        assert_eq!(level, LogLevel::Success);
        assert_eq!(message, "scraped 10 fixtures");
    }

    #[test]
    fn a_cross_line_is_an_error_log() {
        let (level, _) = parse_log_line("\u{2717} connection refused");
        assert_eq!(level, LogLevel::Error);
    }

    #[test]
    fn a_bracketed_error_tag_parses_as_an_error_log_with_prefix_stripped() {
        let (level, message) = parse_log_line("[ERROR] timed out fetching league");
        assert_eq!(level, LogLevel::Error);
        assert_eq!(message, "timed out fetching league");
    }

    #[test]
    fn a_bracketed_warn_tag_is_a_warning_log() {
        let (level, _) = parse_log_line("[WARN] retrying request");
        assert_eq!(level, LogLevel::Warning);
    }

    #[test]
    fn unsymboled_unbracketed_lines_default_to_info() {
        let (level, message) = parse_log_line("scraping league 3 of 10");
        assert_eq!(level, LogLevel::Info);
        assert_eq!(message, "scraping league 3 of 10");
    }
}
