// crates/rewrite/src/encoder.rs

//! Filter-specific `NAME` payload encodings.
//!
//! The image encoder prefixes optional target dimensions; the CSS encoder
//! understands the legacy capability prefix; the multipart encoder packs
//! several originals into one payload for combining filters. All of them
//! bottom out in the segment escaper, so payloads never contain `.`.

use domain::context::WebpLevel;
use domain::CoreError;

use crate::escape::{decode_segment, encode_segment};

// ── image ────────────────────────────────────────────────────────────

/// Target dimensions; a side may be absent, but not both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImageDimensions {
    pub width: Option<u32>,
    pub height: Option<u32>,
}

impl ImageDimensions {
    pub fn new(width: Option<u32>, height: Option<u32>) -> Option<Self> {
        if width.is_none() && height.is_none() {
            // Aliases the no-dimensions form.
            None
        } else {
            Some(ImageDimensions { width, height })
        }
    }
}

/// Everything a legacy or modern image payload can carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImageUrl {
    pub url: String,
    pub dimensions: Option<ImageDimensions>,
    /// Legacy in-URL context bits; modern URLs always decode to
    /// `WebpLevel::None` + `mobile = false` because context lives in the
    /// metadata key instead.
    pub webp: WebpLevel,
    pub mobile: bool,
}

pub struct ImageUrlEncoder;

impl ImageUrlEncoder {
    /// Modern encoding: `W x H x` then the escaped URL; context bits are
    /// never written.
    pub fn encode(url: &str, dimensions: Option<ImageDimensions>) -> String {
        let mut out = String::new();
        if let Some(dims) = dimensions {
            push_dim(&mut out, dims.width);
            out.push('x');
            push_dim(&mut out, dims.height);
            out.push('x');
        }
        out.push_str(&encode_segment(url));
        out
    }

    pub fn decode(name: &str) -> Result<DecodedImageUrl, CoreError> {
        let bytes = name.as_bytes();
        let mut i = 0;
        let mut dimensions = None;
        let mut webp = WebpLevel::None;
        let mut mobile = false;

        if bytes.first().is_some_and(|b| b.is_ascii_digit() || *b == b'N') {
            let width = decode_dim(bytes, &mut i)?;
            if bytes.get(i) != Some(&b'x') {
                return Err(CoreError::decode("image dimensions missing separator"));
            }
            i += 1;
            let height = decode_dim(bytes, &mut i)?;
            if width.is_none() && height.is_none() {
                return Err(CoreError::decode(
                    "NxN dimensions alias the no-dimension form",
                ));
            }
            dimensions = Some(ImageDimensions { width, height });

            // Terminator, possibly prefixed with legacy mobile `m`.
            let mut term = bytes.get(i).copied();
            if term == Some(b'm') {
                mobile = true;
                i += 1;
                term = bytes.get(i).copied();
                if term.is_none() {
                    // A bare trailing `m` never terminated a legal URL.
                    return Err(CoreError::decode("legacy mobile bit without terminator"));
                }
            }
            match term {
                Some(b'x') => {}
                Some(b'w') => webp = WebpLevel::LossyOnly,
                Some(b'v') => webp = WebpLevel::LossyLosslessAlpha,
                _ => return Err(CoreError::decode("bad image dimension terminator")),
            }
            i += 1;
        }

        let rest = &name[i..];
        if rest.is_empty() {
            return Err(CoreError::decode("image payload has no url"));
        }
        Ok(DecodedImageUrl {
            url: decode_segment(rest)?,
            dimensions,
            webp,
            mobile,
        })
    }
}

fn push_dim(out: &mut String, dim: Option<u32>) {
    match dim {
        Some(v) => out.push_str(&v.to_string()),
        None => out.push('N'),
    }
}

fn decode_dim(bytes: &[u8], i: &mut usize) -> Result<Option<u32>, CoreError> {
    // A dimension plus its terminator is at least two bytes.
    if bytes.len() < *i + 2 {
        return Err(CoreError::decode("truncated image dimension"));
    }
    if bytes[*i] == b'N' {
        *i += 1;
        return Ok(None);
    }
    let start = *i;
    let mut value: u64 = 0;
    while *i < bytes.len() && bytes[*i].is_ascii_digit() {
        value = value * 10 + u64::from(bytes[*i] - b'0');
        if value > i32::MAX as u64 {
            return Err(CoreError::decode("image dimension overflow"));
        }
        *i += 1;
    }
    if *i == start {
        return Err(CoreError::decode("image dimension has no digits"));
    }
    if value == 0 {
        return Err(CoreError::decode("zero image dimension"));
    }
    Ok(Some(value as u32))
}

// ── css ──────────────────────────────────────────────────────────────

/// Legacy CSS capability prefix values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CssCapability {
    Archaic,
    MayInlineImages,
    MayInlineImagesAndWebp,
}

pub struct CssUrlEncoder;

impl CssUrlEncoder {
    /// Modern encoding: just the escaped URL. Capability is derived from
    /// client context at serve time and hashed into the metadata key, not
    /// written into the payload.
    pub fn encode(url: &str) -> String {
        encode_segment(url)
    }

    /// Decode, stripping the legacy `W.`/`I.`/`A.` prefix when present.
    pub fn decode(name: &str) -> Result<(String, Option<CssCapability>), CoreError> {
        let (capability, rest) = match name.split_once('.') {
            Some(("W", rest)) => (Some(CssCapability::MayInlineImagesAndWebp), rest),
            Some(("I", rest)) => (Some(CssCapability::MayInlineImages), rest),
            Some(("A", rest)) => (Some(CssCapability::Archaic), rest),
            _ => (None, name),
        };
        Ok((decode_segment(rest)?, capability))
    }
}

// ── multipart (combining filters) ────────────────────────────────────

pub struct MultipartEncoder;

impl MultipartEncoder {
    /// Join several originals into one payload: each URL is segment
    /// escaped, then `=` and the `+` separator are escaped within the
    /// part so the join is unambiguous.
    pub fn encode(urls: &[String]) -> String {
        urls.iter()
            .map(|u| {
                encode_segment(u)
                    .replace('=', "==")
                    .replace('+', "=p")
            })
            .collect::<Vec<_>>()
            .join("+")
    }

    pub fn decode(name: &str) -> Result<Vec<String>, CoreError> {
        let mut urls = Vec::new();
        let mut part = String::new();
        let mut chars = name.chars();
        while let Some(c) = chars.next() {
            match c {
                '+' => {
                    urls.push(decode_segment(&part)?);
                    part.clear();
                }
                '=' => match chars.next() {
                    Some('=') => part.push('='),
                    Some('p') => part.push('+'),
                    _ => return Err(CoreError::decode("bad multipart escape")),
                },
                c => part.push(c),
            }
        }
        urls.push(decode_segment(&part)?);
        Ok(urls)
    }
}
