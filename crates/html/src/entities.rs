// crates/html/src/entities.rs

//! Attribute entity decoding and re-escaping.
//!
//! Decoding expands numeric references and the named entities that map to a
//! single Latin-1 byte. Anything else that *looks* like an entity (unknown
//! name with a terminating `;`, multi-byte named entity, truncated or
//! oversized numeric) is a decode failure: the caller keeps the raw bytes
//! and must leave the attribute alone. A bare `&` followed by text that is
//! not an entity is literal, matching browser behavior.

/// Named entities that map to a single Latin-1 byte.
const ENTITIES: &[(&str, u8)] = &[
    ("AElig", 0xC6), ("Aacute", 0xC1), ("Acirc", 0xC2), ("Agrave", 0xC0),
    ("Aring", 0xC5), ("Atilde", 0xC3), ("Auml", 0xC4), ("Ccedil", 0xC7),
    ("ETH", 0xD0), ("Eacute", 0xC9), ("Ecirc", 0xCA), ("Egrave", 0xC8),
    ("Euml", 0xCB), ("Iacute", 0xCD), ("Icirc", 0xCE), ("Igrave", 0xCC),
    ("Iuml", 0xCF), ("Ntilde", 0xD1), ("Oacute", 0xD3), ("Ocirc", 0xD4),
    ("Ograve", 0xD2), ("Oslash", 0xD8), ("Otilde", 0xD5), ("Ouml", 0xD6),
    ("THORN", 0xDE), ("Uacute", 0xDA), ("Ucirc", 0xDB), ("Ugrave", 0xD9),
    ("Uuml", 0xDC), ("Yacute", 0xDD), ("aacute", 0xE1), ("acirc", 0xE2),
    ("acute", 0xB4), ("aelig", 0xE6), ("agrave", 0xE0), ("amp", 0x26),
    ("aring", 0xE5), ("atilde", 0xE3), ("auml", 0xE4), ("brvbar", 0xA6),
    ("ccedil", 0xE7), ("cedil", 0xB8), ("cent", 0xA2), ("copy", 0xA9),
    ("curren", 0xA4), ("deg", 0xB0), ("divide", 0xF7), ("eacute", 0xE9),
    ("ecirc", 0xEA), ("egrave", 0xE8), ("eth", 0xF0), ("euml", 0xEB),
    ("frac12", 0xBD), ("frac14", 0xBC), ("frac34", 0xBE), ("gt", 0x3E),
    ("iacute", 0xED), ("icirc", 0xEE), ("iexcl", 0xA1), ("igrave", 0xEC),
    ("iquest", 0xBF), ("iuml", 0xEF), ("laquo", 0xAB), ("lt", 0x3C),
    ("macr", 0xAF), ("micro", 0xB5), ("middot", 0xB7), ("nbsp", 0xA0),
    ("not", 0xAC), ("ntilde", 0xF1), ("oacute", 0xF3), ("ocirc", 0xF4),
    ("ograve", 0xF2), ("ordf", 0xAA), ("ordm", 0xBA), ("oslash", 0xF8),
    ("otilde", 0xF5), ("ouml", 0xF6), ("para", 0xB6), ("plusmn", 0xB1),
    ("pound", 0xA3), ("quot", 0x22), ("raquo", 0xBB), ("reg", 0xAE),
    ("sect", 0xA7), ("shy", 0xAD), ("sup1", 0xB9), ("sup2", 0xB2),
    ("sup3", 0xB3), ("szlig", 0xDF), ("thorn", 0xFE), ("times", 0xD7),
    ("uacute", 0xFA), ("ucirc", 0xFB), ("ugrave", 0xF9), ("uml", 0xA8),
    ("uuml", 0xFC), ("yacute", 0xFD), ("yen", 0xA5), ("yuml", 0xFF),
];

fn lookup_entity(name: &str) -> Option<u8> {
    ENTITIES.iter().find(|(n, _)| *n == name).map(|(_, b)| *b)
}

fn entity_for_byte(b: u8) -> Option<&'static str> {
    ENTITIES
        .iter()
        .find(|(n, v)| *v == b && n.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit()))
        .map(|(n, _)| *n)
}

/// Decode raw escaped attribute bytes to UTF-8 text.
///
/// Returns `None` on decode failure; the caller must then treat the
/// attribute as must-leave-alone and serialize the raw form.
pub fn decode_attribute(raw: &[u8]) -> Option<String> {
    let mut out = String::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        let b = raw[i];
        if b != b'&' {
            push_latin1_or_utf8(&mut out, raw, &mut i)?;
            continue;
        }
        i += 1;
        if i >= raw.len() {
            // Trailing bare '&': literal.
            out.push('&');
            break;
        }
        if raw[i] == b'#' {
            i += 1;
            let value = decode_numeric(raw, &mut i)?;
            if value > 0xFF {
                return None;
            }
            out.push(char::from_u32(value)?);
        } else {
            let start = i;
            while i < raw.len() && raw[i].is_ascii_alphanumeric() && i - start < 8 {
                i += 1;
            }
            let name = std::str::from_utf8(&raw[start..i]).ok()?;
            let terminated = i < raw.len() && raw[i] == b';';
            match lookup_entity(name) {
                Some(byte) if terminated => {
                    i += 1;
                    out.push(char::from(byte));
                }
                // Unterminated known entity at end of value: accept, so the
                // canonicalization pass can re-escape it properly.
                Some(byte) if i == raw.len() => {
                    out.push(char::from(byte));
                }
                Some(_) | None if terminated => {
                    // `&foo;` with an unknown or multi-byte name: we have no
                    // single-byte representation, leave the raw form alone.
                    return None;
                }
                _ => {
                    // Not an entity after all; '&' and the word are literal.
                    out.push('&');
                    out.push_str(name);
                }
            }
        }
    }
    Some(out)
}

fn decode_numeric(raw: &[u8], i: &mut usize) -> Option<u32> {
    let hex = *i < raw.len() && (raw[*i] == b'x' || raw[*i] == b'X');
    if hex {
        *i += 1;
    }
    let start = *i;
    let mut value: u32 = 0;
    while *i < raw.len() {
        let d = raw[*i];
        let digit = if hex {
            (d as char).to_digit(16)
        } else {
            (d as char).to_digit(10)
        };
        match digit {
            Some(d) => {
                value = value.checked_mul(if hex { 16 } else { 10 })?.checked_add(d)?;
                *i += 1;
            }
            None => break,
        }
    }
    if *i == start {
        return None; // `&#` with no digits
    }
    // Numeric references require the terminating semicolon.
    if *i >= raw.len() || raw[*i] != b';' {
        return None;
    }
    *i += 1;
    Some(value)
}

// Raw attribute bytes may be UTF-8 or Latin-1; try UTF-8 first and fall
// back to a Latin-1 single byte.
fn push_latin1_or_utf8(out: &mut String, raw: &[u8], i: &mut usize) -> Option<()> {
    let b = raw[*i];
    if b < 0x80 {
        out.push(char::from(b));
        *i += 1;
        return Some(());
    }
    let rest = &raw[*i..];
    let len = utf8_len(b);
    if len > 1 && rest.len() >= len {
        if let Ok(s) = std::str::from_utf8(&rest[..len]) {
            out.push_str(s);
            *i += len;
            return Some(());
        }
    }
    out.push(char::from_u32(b as u32)?);
    *i += 1;
    Some(())
}

fn utf8_len(b: u8) -> usize {
    match b {
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 1,
    }
}

/// Escape a decoded value for a double-quoted attribute.
///
/// Canonical: `&` always becomes `&amp;`, so a decode/escape round trip
/// fixes sloppy source escaping.
pub fn escape_attribute(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c if (c as u32) >= 0x80 && (c as u32) <= 0xFF => {
                match entity_for_byte(c as u32 as u8) {
                    Some(name) => {
                        out.push('&');
                        out.push_str(name);
                        out.push(';');
                    }
                    None => out.push_str(&format!("&#{};", c as u32)),
                }
            }
            c if (c as u32) > 0xFF => out.push_str(&format!("&#{};", c as u32)),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_passes_through() {
        assert_eq!(decode_attribute(b"hello world").as_deref(), Some("hello world"));
    }

    #[test]
    fn named_and_numeric_entities_decode() {
        assert_eq!(decode_attribute(b"a&amp;b").as_deref(), Some("a&b"));
        assert_eq!(decode_attribute(b"&lt;x&gt;").as_deref(), Some("<x>"));
        assert_eq!(decode_attribute(b"&#65;&#x42;").as_deref(), Some("AB"));
        assert_eq!(decode_attribute(b"&nbsp;").as_deref(), Some("\u{a0}"));
    }

    #[test]
    fn bare_ampersand_mid_value_is_literal() {
        // The S5 shape: query separators are not entities.
        assert_eq!(
            decode_attribute(b"a.png?a=b&c=d").as_deref(),
            Some("a.png?a=b&c=d")
        );
    }

    #[test]
    fn unterminated_amp_at_end_is_accepted() {
        assert_eq!(decode_attribute(b"x&amp").as_deref(), Some("x&"));
    }

    #[test]
    fn unknown_entity_with_semicolon_fails() {
        assert!(decode_attribute(b"&bogus;").is_none());
        // Multi-byte named entities have no single-byte form.
        assert!(decode_attribute(b"&euro;").is_none());
    }

    #[test]
    fn numeric_failures() {
        assert!(decode_attribute(b"&#999;").is_none()); // > 0xFF
        assert!(decode_attribute(b"&#12").is_none()); // truncated
        assert!(decode_attribute(b"&#;").is_none()); // no digits
    }

    #[test]
    fn escape_canonicalizes_ampersands() {
        let decoded = decode_attribute(b"a.png?a=b&c=d").unwrap();
        assert_eq!(escape_attribute(&decoded), "a.png?a=b&amp;c=d");
    }

    #[test]
    fn escape_round_trips_latin1() {
        let decoded = decode_attribute(b"&nbsp;&copy;").unwrap();
        assert_eq!(escape_attribute(&decoded), "&nbsp;&copy;");
    }

    #[test]
    fn utf8_multibyte_survives() {
        let raw = "héllo".as_bytes();
        assert_eq!(decode_attribute(raw).as_deref(), Some("héllo"));
    }
}
