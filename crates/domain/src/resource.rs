// crates/domain/src/resource.rs

//! Resource value types: a fetched input and a produced output.

use bytes::Bytes;
use chrono::{DateTime, Duration, Utc};
use http::HeaderMap;

use crate::content_type::ContentType;
use crate::hash::content_hash;

/// A fetched input resource.
#[derive(Debug, Clone)]
pub struct Resource {
    pub url: String,
    pub bytes: Bytes,
    pub headers: HeaderMap,
    pub content_type: Option<ContentType>,
    /// Hash of the body, web64-encoded.
    pub hash: String,
    /// Freshness horizon derived from origin cache headers.
    pub expires_at: DateTime<Utc>,
    /// Origin explicitly forbids caching. Such a resource may still be used
    /// once when policy permits.
    pub no_cache: bool,
    /// Whether the origin is authorized to serve this URL (policy-gated).
    pub authoritative: bool,
    /// Fetched while the fetcher was shedding load.
    pub fetched_under_load_shed: bool,
}

impl Resource {
    pub fn new(url: impl Into<String>, bytes: Bytes, ttl: Duration) -> Self {
        let hash = content_hash(&bytes);
        Resource {
            url: url.into(),
            bytes,
            headers: HeaderMap::new(),
            content_type: None,
            hash,
            expires_at: Utc::now() + ttl,
            no_cache: false,
            authoritative: true,
            fetched_under_load_shed: false,
        }
    }

    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        !self.no_cache && self.expires_at > now
    }

    /// Remaining TTL at `now`; zero when stale.
    pub fn ttl(&self, now: DateTime<Utc>) -> Duration {
        (self.expires_at - now).max(Duration::zero())
    }

    /// The scheme+authority prefix used for origin authorization checks.
    pub fn origin(&self) -> Option<&str> {
        origin_of(&self.url)
    }
}

/// `scheme://host[:port]` of a URL, without any trailing slash.
pub fn origin_of(url: &str) -> Option<&str> {
    let scheme_end = url.find("://")?;
    let rest = &url[scheme_end + 3..];
    let path_start = rest.find('/').map(|i| scheme_end + 3 + i).unwrap_or(url.len());
    Some(&url[..path_start])
}

/// An immutable rewritten output.
#[derive(Debug, Clone)]
pub struct OutputResource {
    /// The full encoded leaf, `ID.HASH.NAME.EXT`.
    pub name: String,
    pub bytes: Bytes,
    pub content_type: ContentType,
    pub hash: String,
    /// TTL for the rewritten URL: min of input TTLs, capped by policy.
    pub cache_ttl: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_extraction() {
        assert_eq!(
            origin_of("http://example.com/a/b.css"),
            Some("http://example.com")
        );
        assert_eq!(
            origin_of("https://example.com:8080"),
            Some("https://example.com:8080")
        );
        assert_eq!(origin_of("not-a-url"), None);
    }

    #[test]
    fn freshness_and_ttl() {
        let res = Resource::new("http://e.com/x.js", Bytes::from_static(b"x"), Duration::seconds(60));
        let now = Utc::now();
        assert!(res.is_fresh(now));
        assert!(res.ttl(now) <= Duration::seconds(60));

        let mut stale = res.clone();
        stale.expires_at = now - Duration::seconds(1);
        assert!(!stale.is_fresh(now));
        assert_eq!(stale.ttl(now), Duration::zero());
    }

    #[test]
    fn no_cache_is_never_fresh() {
        let mut res =
            Resource::new("http://e.com/x.js", Bytes::from_static(b"x"), Duration::seconds(60));
        res.no_cache = true;
        assert!(!res.is_fresh(Utc::now()));
    }
}
