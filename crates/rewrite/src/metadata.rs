// crates/rewrite/src/metadata.rs

//! Metadata cache: prior rewrite decisions keyed by fingerprint.
//!
//! The fingerprint covers the filter id, the sorted input URL set, the
//! options signature, and the client-context vector. Context lives here
//! rather than in the output URL, so clients with different capabilities
//! share URLs while cache hits stay client-aware.

use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use domain::hash::short_hash;
use domain::{ClientContext, FilterId, RewriteOptions};

use crate::cache::Cache;

const LAYOUT_VERSION: u8 = b'1';

/// Fingerprint chars; long enough that collisions are not a practical
/// concern for a cache key.
const KEY_HASH_CHARS: usize = 24;

/// Compute the metadata key for one prospective rewrite.
pub fn metadata_key(
    filter: FilterId,
    inputs: &[String],
    options: &RewriteOptions,
    context: &ClientContext,
) -> String {
    let mut sorted: Vec<&str> = inputs.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    let mut buf = String::new();
    buf.push_str(filter.as_str());
    buf.push('\x1f');
    for url in sorted {
        buf.push_str(url);
        buf.push('\x1f');
    }
    buf.push_str(&options.signature());
    buf.push('\x1f');
    buf.push_str(&context.cache_key(options));
    format!("md/{}", short_hash(buf.as_bytes(), KEY_HASH_CHARS))
}

/// What a prior attempt concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    /// `output_leaf` is valid and served.
    Rewritten,
    /// The input is fine as-is (or the backend declined); leave original.
    PassthroughOk,
    /// A transient condition stopped the attempt; retry after expiry.
    NotYetRewritable,
    /// Blacklisted (policy or crash); do not retry until expiry.
    Forbidden,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub decision: Decision,
    /// Encoded output leaf (`ID.HASH.NAME.EXT`) when rewritten.
    pub output_leaf: Option<String>,
    /// Content hash of each input at rewrite time, in request order.
    pub input_hashes: Vec<String>,
    pub expires_unix: i64,
}

impl MetadataEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now.timestamp() < self.expires_unix
    }

    /// Entry is only usable if the inputs it was computed from still have
    /// the same content.
    pub fn inputs_match(&self, current_hashes: &[&str]) -> bool {
        self.input_hashes.len() == current_hashes.len()
            && self
                .input_hashes
                .iter()
                .zip(current_hashes)
                .all(|(a, b)| a == b)
    }
}

pub struct MetadataCache {
    cache: Arc<dyn Cache>,
}

impl MetadataCache {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        MetadataCache { cache }
    }

    /// Fetch an entry; expired or undecodable values are misses. Hash
    /// re-validation is the caller's job since it needs the inputs.
    pub async fn get(&self, key: &str) -> Option<MetadataEntry> {
        let value = self.cache.get(key).await.value?;
        let entry = match decode_entry(&value) {
            Some(entry) => entry,
            None => {
                warn!(key, "undecodable metadata entry treated as miss");
                return None;
            }
        };
        entry.is_fresh(Utc::now()).then_some(entry)
    }

    pub async fn put(&self, key: &str, entry: &MetadataEntry) {
        self.cache.put(key, encode_entry(entry)).await;
    }

    pub fn is_healthy(&self) -> bool {
        self.cache.is_healthy()
    }
}

fn encode_entry(entry: &MetadataEntry) -> Bytes {
    let json = serde_json::to_vec(entry).unwrap_or_default();
    let mut buf = BytesMut::with_capacity(1 + json.len());
    buf.put_u8(LAYOUT_VERSION);
    buf.put_slice(&json);
    buf.freeze()
}

fn decode_entry(value: &Bytes) -> Option<MetadataEntry> {
    let mut buf = value.clone();
    if buf.remaining() < 1 || buf.get_u8() != LAYOUT_VERSION {
        return None;
    }
    serde_json::from_slice(&buf).ok()
}
