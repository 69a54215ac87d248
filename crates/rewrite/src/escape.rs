// crates/rewrite/src/escape.rs

//! URL segment escaper.
//!
//! Maps an arbitrary URL into a single path segment containing no `.`,
//! using short comma-escapes for common substrings. The decoder accepts
//! exactly the encoder's outputs; an unknown escape, a trailing comma, or
//! a byte outside the literal alphabet is a decode error.

use domain::CoreError;

/// Multi-byte substrings, longest first so encoding is greedy
/// longest-match.
const SEQUENCES: &[(&str, &str)] = &[
    ("http://", ",h"),
    (".jpeg", ",k"),
    (".html", ",t"),
    (".com", ",c"),
    (".css", ",s"),
    (".jpg", ",j"),
    (".net", ",n"),
    (".png", ",p"),
    (".gif", ",g"),
    (".js", ",l"),
];

fn escape_single(b: u8) -> Option<&'static str> {
    match b {
        b'.' => Some(",o"),
        b'/' => Some(",_"),
        b'\\' => Some(",-"),
        b'%' => Some(",P"),
        b',' => Some(",,"),
        b'^' => Some(",u"),
        _ => None,
    }
}

fn is_literal(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'=' | b'+' | b'-' | b'&' | b'?')
}

/// Escape a URL into a dot-free segment.
pub fn encode_segment(url: &str) -> String {
    let bytes = url.as_bytes();
    let mut out = String::with_capacity(url.len());
    let mut i = 0;
    'outer: while i < bytes.len() {
        for (seq, escape) in SEQUENCES {
            if bytes[i..].starts_with(seq.as_bytes()) {
                out.push_str(escape);
                i += seq.len();
                continue 'outer;
            }
        }
        let b = bytes[i];
        if is_literal(b) {
            out.push(char::from(b));
        } else if let Some(escape) = escape_single(b) {
            out.push_str(escape);
        } else {
            out.push_str(&format!(",{:02X}", b));
        }
        i += 1;
    }
    out
}

/// Invert [`encode_segment`].
pub fn decode_segment(segment: &str) -> Result<String, CoreError> {
    let bytes = segment.as_bytes();
    let mut out = Vec::with_capacity(segment.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b != b',' {
            if !is_literal(b) {
                return Err(CoreError::decode(format!(
                    "byte {b:#04x} is not a legal segment literal"
                )));
            }
            out.push(b);
            i += 1;
            continue;
        }
        i += 1;
        let Some(&code) = bytes.get(i) else {
            return Err(CoreError::decode("trailing comma in segment"));
        };
        i += 1;
        let expansion: &[u8] = match code {
            b'h' => b"http://",
            b'c' => b".com",
            b's' => b".css",
            b'l' => b".js",
            b'n' => b".net",
            b'j' => b".jpg",
            b'k' => b".jpeg",
            b'p' => b".png",
            b'g' => b".gif",
            b't' => b".html",
            b'o' => b".",
            b'_' => b"/",
            b'-' => b"\\",
            b'P' => b"%",
            b'u' => b"^",
            b',' => b",",
            hi if hi.is_ascii_hexdigit() && hi.is_ascii_uppercase() || hi.is_ascii_digit() => {
                let Some(&lo) = bytes.get(i) else {
                    return Err(CoreError::decode("truncated hex escape"));
                };
                if !(lo.is_ascii_digit() || (lo.is_ascii_hexdigit() && lo.is_ascii_uppercase())) {
                    return Err(CoreError::decode("malformed hex escape"));
                }
                i += 1;
                let hex = [hi, lo];
                let s = std::str::from_utf8(&hex)
                    .map_err(|_| CoreError::decode("malformed hex escape"))?;
                let v = u8::from_str_radix(s, 16)
                    .map_err(|_| CoreError::decode("malformed hex escape"))?;
                out.push(v);
                continue;
            }
            other => {
                return Err(CoreError::decode(format!(
                    "unknown comma escape ,{}",
                    char::from(other)
                )));
            }
        };
        out.extend_from_slice(expansion);
    }
    String::from_utf8(out).map_err(|_| CoreError::decode("segment decodes to invalid utf-8"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_url_uses_short_escapes() {
        assert_eq!(
            encode_segment("http://example.com/foo.jpg"),
            ",hexample,c,_foo,j"
        );
        assert_eq!(
            encode_segment("http://www.example.com/a.css"),
            ",hwww,cexample,c,_a,s"
        );
    }

    #[test]
    fn longest_match_wins() {
        // ".jpeg" must not decompose into ".jpg" plus junk or ".", "jpeg".
        assert_eq!(encode_segment("x.jpeg"), "x,k");
        assert_eq!(encode_segment("x.html"), "x,t");
    }

    #[test]
    fn round_trips() {
        for url in [
            "http://example.com/foo.jpg",
            "https://example.net/a/b/c.css?x=1&y=2",
            "a,b.c",
            "odd^chars\\here%20",
            "päth/ü.png",
            "plain",
            "",
        ] {
            let enc = encode_segment(url);
            assert!(!enc.contains('.'), "dot leaked in {enc}");
            assert_eq!(decode_segment(&enc).unwrap(), url, "via {enc}");
        }
    }

    #[test]
    fn query_characters_stay_literal() {
        assert_eq!(encode_segment("a?b=c&d=e+f"), "a?b=c&d=e+f");
    }

    #[test]
    fn decode_rejects_bad_input() {
        assert!(decode_segment("abc,").is_err()); // trailing comma
        assert!(decode_segment(",z").is_err()); // unknown escape
        assert!(decode_segment("a.b").is_err()); // raw dot
        assert!(decode_segment(",4").is_err()); // truncated hex
        assert!(decode_segment(",4g").is_err()); // lowercase hex
    }

    #[test]
    fn non_ascii_bytes_hex_escape() {
        let enc = encode_segment(" ");
        assert_eq!(enc, ",20");
        assert_eq!(decode_segment(",20").unwrap(), " ");
    }
}
