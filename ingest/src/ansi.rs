//! ANSI colour-code stripping for scraper log lines (§4.3, §6).

use regex::Regex;
use std::sync::OnceLock;

fn ansi_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\x1B(?:[@-Z\\-_]|\[[0-?]*[ -/]*[@-~])").unwrap())
}

pub fn strip_ansi_codes(line: &str) -> String {
    ansi_pattern().replace_all(line, "").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_sgr_colour_sequences() {
        let line = "\x1b[32m\u{2713}\x1b[0m scraped 10 fixtures";
        assert_eq!(strip_ansi_codes(line), "\u{2713} scraped 10 fixtures");
    }

    #[test]
    fn leaves_plain_text_untouched() {
        assert_eq!(strip_ansi_codes("no colour here"), "no colour here");
    }
}
