//! JSON payload extraction from accumulated scraper output (§4.3).
//!
//! Three escalating attempts, matching the reference scraper bridge:
//! (1) a single cleaned line parses on its own; (2) failing that, recent
//! lines are reassembled into one candidate and reparsed; (3) as a last
//! resort, the full accumulated output is scanned for balanced `{`/`[`
//! delimiters, string-escape aware, preferring the latest-starting
//! candidate whose top-level shape looks like an expected root.

use serde_json::Value;

/// How many trailing lines the multi-line reassembly attempt considers.
const REASSEMBLY_WINDOW: usize = 20;

/// Tries to parse `clean_line` as a complete JSON document on its own.
pub fn try_single_line(clean_line: &str) -> Option<Value> {
    serde_json::from_str(clean_line).ok()
}

/// Multi-line reassembly (§4.3): scans `recent_lines` backward from the end,
/// accumulating a contiguous run of lines that look like a JSON document's
/// continuation (leading whitespace, `,`, or `"`) or its start (`[`/`{`),
/// then reparses the joined text. `recent_lines` should already be
/// ANSI-stripped and trimmed.
pub fn try_multiline_reassembly(recent_lines: &[String]) -> Option<Value> {
    let window = &recent_lines[recent_lines.len().saturating_sub(REASSEMBLY_WINDOW)..];

    let mut candidate_lines: Vec<&str> = Vec::new();
    for line in window.iter().rev() {
        let starts_document = line.starts_with('[') || line.starts_with('{');
        let continues_document = !candidate_lines.is_empty()
            && (line.starts_with(' ') || line.starts_with('\t') || line.starts_with(',') || line.starts_with('"'));

        if starts_document || continues_document {
            candidate_lines.insert(0, line.as_str());
        } else if !candidate_lines.is_empty() {
            break;
        }
    }

    if candidate_lines.is_empty() {
        return None;
    }
    serde_json::from_str(&candidate_lines.join("\n")).ok()
}

/// Does `value`'s top-level shape look like an expected payload root
/// (§4.3)? Odds sources carry a list or an object with `league_id`/
/// `fixtures`; score sources carry an object with `matches`; price sources
/// carry a list or an object with `bars`.
fn looks_like_root(value: &Value) -> bool {
    match value {
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => {
            map.contains_key("matches")
                || map.contains_key("league_id")
                || map.contains_key("fixtures")
                || map.contains_key("bars")
        }
        _ => false,
    }
}

/// Last-resort extraction (§4.3): scans `output` for every `{`/`[` start,
/// walking forward with string-escape-aware depth tracking to find a
/// balanced close, attempting to parse at each balance-to-zero point.
/// Candidates are tried latest-start first, to bias toward a payload the
/// scraper printed after its progress log; the first parse whose shape
/// passes [`looks_like_root`] wins, falling back to the first valid parse
/// found at all if none match a known root shape.
pub fn extract_balanced_json(output: &str) -> Option<Value> {
    let chars: Vec<char> = output.chars().collect();
    let mut starts: Vec<usize> = Vec::new();
    for (i, &c) in chars.iter().enumerate() {
        if c == '{' || c == '[' {
            starts.push(i);
        }
    }

    let mut first_valid: Option<Value> = None;
    for &start in starts.iter().rev() {
        let Some(end) = find_balanced_end(&chars, start) else { continue };
        let candidate: String = chars[start..=end].iter().collect();
        let Ok(value) = serde_json::from_str::<Value>(&candidate) else { continue };

        if looks_like_root(&value) {
            return Some(value);
        }
        if first_valid.is_none() {
            first_valid = Some(value);
        }
    }

    first_valid
}

/// Walks forward from `start` tracking `{}`/`[]` depth with string-escape
/// awareness, returning the index of the matching close once depth returns
/// to zero.
fn find_balanced_end(chars: &[char], start: usize) -> Option<usize> {
    let opener = chars[start];
    let closer = match opener {
        '{' => '}',
        '[' => ']',
        _ => return None,
    };

    let mut depth = 0i32;
    let mut in_string = false;
    let mut escape_next = false;

    for i in start..chars.len() {
        let c = chars[i];
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            _ if in_string => {}
            c if c == opener => depth += 1,
            c if c == closer => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}
