// crates/rewrite/src/http_cache.rs

//! HTTP response cache over the generic [`Cache`] interface.
//!
//! Values are versioned: a leading layout byte, a length-prefixed JSON
//! metadata record, then the raw body bytes. Unknown layout versions
//! decode as a miss, so the format can evolve without flag days.
//!
//! Failed and uncacheable fetches are remembered with sentinel status
//! codes from the private range; they live here so a fetch storm against
//! a dead URL costs one origin round trip per negative TTL window.

use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

use domain::status;

use crate::cache::Cache;

const LAYOUT_VERSION: u8 = b'1';

#[derive(Debug, Clone, Serialize, Deserialize)]
struct EntryMeta {
    status: u16,
    headers: Vec<(String, String)>,
    expires_unix: i64,
    no_cache: bool,
    fetched_under_load_shed: bool,
}

#[derive(Debug, Clone)]
pub struct HttpCacheEntry {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    pub expires_at: DateTime<Utc>,
    pub no_cache: bool,
    pub fetched_under_load_shed: bool,
}

impl HttpCacheEntry {
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// Negative entry: a remembered fetch or cacheability failure.
    pub fn is_remembered_failure(&self) -> bool {
        status::is_private_status(self.status)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

pub struct HttpCache {
    cache: Arc<dyn Cache>,
}

impl HttpCache {
    pub fn new(cache: Arc<dyn Cache>) -> Self {
        HttpCache { cache }
    }

    /// Look up a URL; expired and undecodable entries are misses. The
    /// caller must check [`HttpCacheEntry::is_remembered_failure`].
    pub async fn get(&self, url: &str) -> Option<HttpCacheEntry> {
        let result = self.cache.get(url).await;
        let value = result.value?;
        let entry = match decode_entry(&value) {
            Some(entry) => entry,
            None => {
                warn!(url, "undecodable http cache entry treated as miss");
                return None;
            }
        };
        if !entry.is_fresh(Utc::now()) {
            return None;
        }
        Some(entry)
    }

    pub async fn put(&self, url: &str, entry: &HttpCacheEntry) {
        self.cache.put(url, encode_entry(entry)).await;
    }

    /// Record a negative entry under a sentinel status code.
    pub async fn remember_failure(&self, url: &str, sentinel: u16, ttl_secs: i64) {
        debug_assert!(status::is_private_status(sentinel));
        let entry = HttpCacheEntry {
            status: sentinel,
            headers: Vec::new(),
            body: Bytes::new(),
            expires_at: Utc::now() + Duration::seconds(ttl_secs),
            no_cache: false,
            fetched_under_load_shed: false,
        };
        self.put(url, &entry).await;
    }

    pub async fn delete(&self, url: &str) {
        self.cache.delete(url).await;
    }
}

fn encode_entry(entry: &HttpCacheEntry) -> Bytes {
    let meta = EntryMeta {
        status: entry.status,
        headers: entry.headers.clone(),
        expires_unix: entry.expires_at.timestamp(),
        no_cache: entry.no_cache,
        fetched_under_load_shed: entry.fetched_under_load_shed,
    };
    // Metadata is small and structural; JSON keeps it debuggable.
    let meta_json = serde_json::to_vec(&meta).unwrap_or_default();
    let mut buf = BytesMut::with_capacity(1 + 4 + meta_json.len() + entry.body.len());
    buf.put_u8(LAYOUT_VERSION);
    buf.put_u32(meta_json.len() as u32);
    buf.put_slice(&meta_json);
    buf.put_slice(&entry.body);
    buf.freeze()
}

fn decode_entry(value: &Bytes) -> Option<HttpCacheEntry> {
    let mut buf = value.clone();
    if buf.remaining() < 5 || buf.get_u8() != LAYOUT_VERSION {
        return None;
    }
    let meta_len = buf.get_u32() as usize;
    if buf.remaining() < meta_len {
        return None;
    }
    let meta_bytes = buf.split_to(meta_len);
    let meta: EntryMeta = serde_json::from_slice(&meta_bytes).ok()?;
    Some(HttpCacheEntry {
        status: meta.status,
        headers: meta.headers,
        body: buf,
        expires_at: DateTime::from_timestamp(meta.expires_unix, 0)?,
        no_cache: meta.no_cache,
        fetched_under_load_shed: meta.fetched_under_load_shed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{LockedCache, LruStore};

    fn cache() -> HttpCache {
        HttpCache::new(Arc::new(LockedCache::new(LruStore::new(64))))
    }

    fn entry(body: &'static [u8], ttl_secs: i64) -> HttpCacheEntry {
        HttpCacheEntry {
            status: 200,
            headers: vec![("content-type".into(), "image/png".into())],
            body: Bytes::from_static(body),
            expires_at: Utc::now() + Duration::seconds(ttl_secs),
            no_cache: false,
            fetched_under_load_shed: false,
        }
    }

    #[tokio::test]
    async fn round_trips_through_backend() {
        let cache = cache();
        cache.put("http://e.com/a.png", &entry(b"bytes", 300)).await;
        let got = cache.get("http://e.com/a.png").await.unwrap();
        assert_eq!(got.status, 200);
        assert_eq!(&got.body[..], b"bytes");
        assert_eq!(got.header("Content-Type"), Some("image/png"));
    }

    #[tokio::test]
    async fn expired_entry_is_a_miss() {
        let cache = cache();
        cache.put("http://e.com/a.png", &entry(b"x", -5)).await;
        assert!(cache.get("http://e.com/a.png").await.is_none());
    }

    #[tokio::test]
    async fn unknown_layout_version_is_a_miss() {
        let backend: Arc<dyn Cache> = Arc::new(LockedCache::new(LruStore::new(16)));
        let cache = HttpCache::new(Arc::clone(&backend));
        backend
            .put("http://e.com/a.png", Bytes::from_static(b"9junk"))
            .await;
        assert!(cache.get("http://e.com/a.png").await.is_none());
    }

    #[tokio::test]
    async fn remembered_failure_is_flagged() {
        let cache = cache();
        cache
            .remember_failure("http://e.com/gone.png", status::REMEMBER_FETCH_FAILED, 300)
            .await;
        let got = cache.get("http://e.com/gone.png").await.unwrap();
        assert!(got.is_remembered_failure());
    }
}
