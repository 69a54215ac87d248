// crates/domain/src/hash.rs

//! Content hashing helpers.
//!
//! Hashes appear inside rewritten URLs, so the encoded form uses a web64
//! alphabet (URL- and filename-safe base64, no padding).

use sha2::{Digest, Sha256};

const WEB64: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789-_";

/// Encode bytes in web64 without padding.
pub fn web64_encode(input: &[u8]) -> String {
    let mut out = String::with_capacity((input.len() * 4).div_ceil(3));
    for chunk in input.chunks(3) {
        let b0 = chunk[0] as u32;
        let b1 = chunk.get(1).copied().unwrap_or(0) as u32;
        let b2 = chunk.get(2).copied().unwrap_or(0) as u32;
        let triple = (b0 << 16) | (b1 << 8) | b2;
        out.push(WEB64[(triple >> 18) as usize & 0x3f] as char);
        out.push(WEB64[(triple >> 12) as usize & 0x3f] as char);
        if chunk.len() > 1 {
            out.push(WEB64[(triple >> 6) as usize & 0x3f] as char);
        }
        if chunk.len() > 2 {
            out.push(WEB64[triple as usize & 0x3f] as char);
        }
    }
    out
}

/// SHA-256 of `input`, truncated and web64-encoded to `chars` characters.
///
/// Stable across processes and versions; used for content hashes, option
/// signatures, and metadata keys.
pub fn short_hash(input: &[u8], chars: usize) -> String {
    let digest = Sha256::digest(input);
    let mut encoded = web64_encode(&digest);
    encoded.truncate(chars);
    encoded
}

/// The hash length used in resource names.
pub const NAME_HASH_CHARS: usize = 10;

/// Content hash as it appears in a resource name.
pub fn content_hash(bytes: &[u8]) -> String {
    short_hash(bytes, NAME_HASH_CHARS)
}
