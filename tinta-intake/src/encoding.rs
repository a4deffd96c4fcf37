//! Text decoding utilities for captured print streams
//!
//! Dispensing controllers on Spanish/Latin Windows installs usually print in
//! Windows-1252, newer ones in UTF-8. This module provides utilities for:
//! - Decoding stripped job bytes into text
//! - Truncating text to a character budget for job previews

use tracing::instrument;

const UTF8_BOM: &[u8] = &[0xEF, 0xBB, 0xBF];

/// Decode job bytes into text
///
/// Valid UTF-8 is taken as is (BOM removed). Anything else is decoded as
/// Windows-1252, which maps every byte to a character and never fails.
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn decode_text(bytes: &[u8]) -> String {
    let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => {
            let (cow, _) = encoding_rs::WINDOWS_1252.decode_without_bom_handling(bytes);
            cow.into_owned()
        }
    }
}

/// Truncate a string to at most `max_chars` characters
///
/// An ellipsis is appended when something was cut.
pub fn truncate_chars(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_utf8() {
        assert_eq!(decode_text("Fórmula: 12".as_bytes()), "Fórmula: 12");
    }

    #[test]
    fn test_decode_utf8_bom() {
        let mut bytes = UTF8_BOM.to_vec();
        bytes.extend_from_slice(b"Receta: 1");
        assert_eq!(decode_text(&bytes), "Receta: 1");
    }

    #[test]
    fn test_decode_windows_1252() {
        // "Código" with ó = 0xF3 in Windows-1252
        let bytes = b"C\xF3digo color: 8A2";
        assert_eq!(decode_text(bytes), "Código color: 8A2");
    }

    #[test]
    fn test_truncate_chars() {
        assert_eq!(truncate_chars("hello world", 5), "hello…");
        assert_eq!(truncate_chars("hola", 10), "hola");
        assert_eq!(truncate_chars("añejo", 2), "añ…");
    }
}
