//! Recipe text extraction
//!
//! Raw job bytes → trimmed printable lines. Pure, no I/O.

use crate::encoding::{decode_text, truncate_chars};
use crate::escpos::strip_control_sequences;

/// Minimum share of "texty" characters for a line to be kept
const MIN_TEXT_RATIO: f32 = 0.6;

/// Convert a raw print stream into ordered, trimmed text lines
///
/// Returns an empty vector when nothing decodes to printable text.
pub fn extract_lines(raw: &[u8]) -> Vec<String> {
    let text = decode_text(&strip_control_sequences(raw));
    text.split('\n')
        .map(clean_line)
        .filter(|line| is_text_line(line))
        .collect()
}

/// Short excerpt of a job for history lists and error reports
///
/// Extracted lines joined by `" | "`. When nothing survives extraction, the
/// lossy raw bytes are shown instead so the operator can see what arrived.
pub fn job_preview(raw: &[u8], max_chars: usize) -> String {
    let lines = extract_lines(raw);
    let text = if lines.is_empty() {
        String::from_utf8_lossy(raw)
            .chars()
            .filter(|c| !c.is_control())
            .collect()
    } else {
        lines.join(" | ")
    };
    truncate_chars(&text, max_chars)
}

/// Trim and drop characters that cannot be part of a printed line
fn clean_line(line: &str) -> String {
    line.chars()
        .filter(|c| !c.is_control() && *c != char::REPLACEMENT_CHARACTER)
        .collect::<String>()
        .trim()
        .to_string()
}

fn is_text_line(line: &str) -> bool {
    if line.is_empty() || !line.chars().any(char::is_alphanumeric) {
        return false;
    }
    // Printer job language headers, not content
    if line.get(..4).is_some_and(|p| p.eq_ignore_ascii_case("@PJL")) {
        return false;
    }

    let total = line.chars().count();
    let texty = line
        .chars()
        .filter(|c| {
            c.is_ascii_graphic() || c.is_whitespace() || c.is_alphabetic() || "ºª°€".contains(*c)
        })
        .count();
    texty as f32 / total as f32 >= MIN_TEXT_RATIO
}
