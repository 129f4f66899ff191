//! The run-log progress line
//!
//! Resumption reads these lines back out of the log file, so the writer and
//! the reader live together here. Changing the format breaks log-based
//! resumption of runs logged with the old format.

use regex::Regex;
use std::sync::OnceLock;

/// Formats `n` with comma thousands separators (`462787` -> `462,787`)
pub fn format_count(n: usize) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

/// Builds the progress message, e.g.
/// `Progress: 1,234/56,789 (2.17%) - Found 42 decisions`
pub fn progress_line(completed: usize, total: usize, decisions: u64) -> String {
    let pct = if total > 0 {
        completed as f64 / total as f64 * 100.0
    } else {
        0.0
    };
    format!(
        "Progress: {}/{} ({:.2}%) - Found {} decisions",
        format_count(completed),
        format_count(total),
        pct,
        format_count(decisions as usize)
    )
}

fn progress_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"Progress: ([\d,]+)/([\d,]+) \(").expect("progress pattern is valid")
    })
}

/// Extracts `(completed, total)` from a log line containing a progress message
pub fn parse_progress_line(line: &str) -> Option<(usize, usize)> {
    let captures = progress_regex().captures(line)?;
    let completed = captures[1].replace(',', "").parse().ok()?;
    let total = captures[2].replace(',', "").parse().ok()?;
    Some((completed, total))
}
