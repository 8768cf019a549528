//! DVB string decoding (ETSI EN 300 468 annex A).
//!
//! SI text fields may start with a one-byte code page selector; the bulk of
//! real broadcasts carries either the default Latin table or one of the
//! ISO 8859 family. Control characters are replaced by blanks (the 0x8A
//! "line break" code becomes a newline) so decoded strings are printable
//! as-is.

use encoding_rs::{Encoding, ISO_8859_15};

/// Resolves a selector byte to an 8-bit character table.
///
/// Table variants `encoding_rs` does not carry map to their closest
/// superset (Windows-1254 for 8859-9, Windows-874 for 8859-11).
fn encoding_for(selector: u8) -> Option<&'static Encoding> {
    match selector {
        0x01 => Some(encoding_rs::ISO_8859_5),
        0x02 => Some(encoding_rs::ISO_8859_6),
        0x03 => Some(encoding_rs::ISO_8859_7),
        0x04 => Some(encoding_rs::ISO_8859_8),
        0x05 => Some(encoding_rs::WINDOWS_1254),
        0x06 => Some(encoding_rs::ISO_8859_10),
        0x07 => Some(encoding_rs::WINDOWS_874),
        0x09 => Some(encoding_rs::ISO_8859_13),
        0x0A => Some(encoding_rs::ISO_8859_14),
        0x0B => Some(ISO_8859_15),
        _ => None,
    }
}

/// Decodes an SI string field honoring a leading code page selector.
pub fn decode_string(raw: &[u8]) -> String {
    decode_string_special(raw, false)
}

/// Decodes an SI string field; `remove_special` drops control characters
/// instead of blanking them.
pub fn decode_string_special(raw: &[u8], remove_special: bool) -> String {
    if raw.is_empty() {
        return String::new();
    }

    // Selector bytes live below 0x20; anything else is text already.
    let selector = raw[0];
    let (encoding, text) = if selector < 0x20 {
        if raw.len() < 2 {
            return String::new();
        }
        (
            encoding_for(selector).unwrap_or(ISO_8859_15),
            &raw[1..],
        )
    } else {
        (ISO_8859_15, raw)
    };

    let mut scratch = Vec::with_capacity(text.len() + 2);
    for &ch in text {
        if ch == 0x8A {
            scratch.push(b'\n');
        } else if ch <= 0x1F || (0x80..=0x9F).contains(&ch) {
            if !remove_special {
                scratch.push(b' ');
            }
        } else {
            scratch.push(ch);
        }
    }

    let (decoded, _, _) = encoding.decode(&scratch);
    decoded.into_owned()
}
