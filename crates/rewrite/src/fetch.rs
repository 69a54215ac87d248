// crates/rewrite/src/fetch.rs

//! Input fetching through the input cache.
//!
//! `CachingFetcher` is the only path the engine uses to obtain input
//! resources: cache hit, negative-entry short circuit, or an origin fetch
//! with bounded retries. Fetch outcomes worth remembering (dead URLs,
//! uncacheable responses) are written back as negative entries so
//! repeated misses do not hammer the origin.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{Duration, Utc};
use http::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{debug, warn};

use domain::hash::content_hash;
use domain::status;
use domain::{ContentType, CoreError, FetchErrorKind, Resource, RewriteOptions};

use crate::http_cache::{HttpCache, HttpCacheEntry};

/// One upstream response as the transport layer hands it over.
#[derive(Debug, Clone)]
pub struct FetchedResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
    /// Origin freshness lifetime; zero when the response is uncacheable.
    pub ttl: Duration,
    pub no_cache: bool,
    /// The fetcher answered while shedding load; treat as best-effort.
    pub under_load_shed: bool,
}

/// The transport seam. Implementations do real network I/O; tests inject
/// fakes.
#[async_trait]
pub trait UrlFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<FetchedResponse, CoreError>;
}

pub struct CachingFetcher {
    cache: Arc<HttpCache>,
    fetcher: Arc<dyn UrlFetcher>,
    options: Arc<RewriteOptions>,
}

impl CachingFetcher {
    pub fn new(
        cache: Arc<HttpCache>,
        fetcher: Arc<dyn UrlFetcher>,
        options: Arc<RewriteOptions>,
    ) -> Self {
        CachingFetcher {
            cache,
            fetcher,
            options,
        }
    }

    /// Obtain an input resource, consulting the input cache first.
    pub async fn fetch_resource(&self, url: &str) -> Result<Resource, CoreError> {
        if let Some(entry) = self.cache.get(url).await {
            if entry.is_remembered_failure() {
                debug!(url, status = entry.status, "remembered failure short-circuit");
                let kind = match entry.status {
                    status::REMEMBER_FETCH_FAILED => FetchErrorKind::Permanent,
                    _ => FetchErrorKind::Transient,
                };
                return Err(CoreError::fetch(kind, url));
            }
            if entry.no_cache {
                if self.options.reuse_no_cache_once {
                    // Use it this once, then forget it.
                    self.cache.delete(url).await;
                    return Ok(self.to_resource(url, &entry));
                }
            } else {
                return Ok(self.to_resource(url, &entry));
            }
        }
        self.fetch_from_origin(url).await
    }

    async fn fetch_from_origin(&self, url: &str) -> Result<Resource, CoreError> {
        let mut attempt = 0u32;
        let response = loop {
            match self.fetcher.fetch(url).await {
                Ok(response) => break response,
                Err(CoreError::Fetch {
                    kind: FetchErrorKind::Transient,
                    ..
                }) if attempt < self.options.fetch_retry_attempts => {
                    attempt += 1;
                    let backoff = StdDuration::from_millis(50 << attempt.min(6));
                    debug!(url, attempt, ?backoff, "transient fetch failure, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(err) => {
                    self.remember(url, &err).await;
                    return Err(err);
                }
            }
        };

        if !(200..300).contains(&response.status) {
            let kind = match response.status {
                404 | 410 => FetchErrorKind::Permanent,
                _ => FetchErrorKind::Transient,
            };
            let err = CoreError::fetch(kind, url);
            self.remember(url, &err).await;
            return Err(err);
        }

        let entry = HttpCacheEntry {
            status: response.status,
            headers: response.headers.clone(),
            body: response.body.clone(),
            expires_at: Utc::now() + response.ttl,
            no_cache: response.no_cache,
            fetched_under_load_shed: response.under_load_shed,
        };

        let too_large = response.body.len() > self.options.max_cacheable_response_content_length;
        if too_large {
            // Remember the size verdict, not the bytes.
            self.cache
                .remember_failure(
                    url,
                    status::REMEMBER_NOT_CACHEABLE_200,
                    self.options.negative_ttl_transient_secs as i64,
                )
                .await;
        } else if response.no_cache && !self.options.reuse_no_cache_once {
            self.cache
                .remember_failure(
                    url,
                    status::REMEMBER_NOT_CACHEABLE_200,
                    self.options.negative_ttl_transient_secs as i64,
                )
                .await;
        } else if !response.under_load_shed {
            self.cache.put(url, &entry).await;
        }

        if too_large {
            return Err(CoreError::Policy(format!(
                "{url} exceeds the cacheable size bound"
            )));
        }
        Ok(self.to_resource(url, &entry))
    }

    async fn remember(&self, url: &str, err: &CoreError) {
        let ttl = if err.is_permanent_fetch_failure() {
            self.options.negative_ttl_permanent_secs as i64
        } else {
            self.options.negative_ttl_transient_secs as i64
        };
        match err {
            CoreError::Fetch { kind, .. } if *kind != FetchErrorKind::Shed => {
                self.cache
                    .remember_failure(url, status::REMEMBER_FETCH_FAILED, ttl)
                    .await;
            }
            _ => {
                // Shed fetches and non-fetch errors are not worth
                // remembering; the next request may succeed.
            }
        }
    }

    fn to_resource(&self, url: &str, entry: &HttpCacheEntry) -> Resource {
        let mut headers = HeaderMap::new();
        for (name, value) in &entry.headers {
            if let (Ok(name), Ok(value)) =
                (HeaderName::from_str(name), HeaderValue::from_str(value))
            {
                headers.append(name, value);
            } else {
                warn!(url, header = %name, "dropping unparsable cached header");
            }
        }
        let content_type = entry
            .header("content-type")
            .and_then(ContentType::from_mime);
        let hash = content_hash(&entry.body);
        let authoritative = domain::resource::origin_of(url)
            .is_some_and(|origin| self.options.is_origin_authorized(origin));
        Resource {
            url: url.to_string(),
            bytes: entry.body.clone(),
            headers,
            content_type,
            hash,
            expires_at: entry.expires_at,
            no_cache: entry.no_cache,
            authoritative,
            fetched_under_load_shed: entry.fetched_under_load_shed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{LockedCache, LruStore};
    use std::sync::atomic::{AtomicU32, Ordering};

    struct ScriptedFetcher {
        calls: AtomicU32,
        failures_before_success: u32,
        status: u16,
    }

    impl ScriptedFetcher {
        fn ok() -> Self {
            ScriptedFetcher {
                calls: AtomicU32::new(0),
                failures_before_success: 0,
                status: 200,
            }
        }
    }

    #[async_trait]
    impl UrlFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<FetchedResponse, CoreError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.failures_before_success {
                return Err(CoreError::fetch(FetchErrorKind::Transient, url));
            }
            Ok(FetchedResponse {
                status: self.status,
                headers: vec![("content-type".into(), "text/css".into())],
                body: Bytes::from_static(b"body{}"),
                ttl: Duration::seconds(300),
                no_cache: false,
                under_load_shed: false,
            })
        }
    }

    fn harness(fetcher: ScriptedFetcher, options: RewriteOptions) -> (CachingFetcher, Arc<HttpCache>) {
        let cache = Arc::new(HttpCache::new(Arc::new(LockedCache::new(LruStore::new(64)))));
        let caching = CachingFetcher::new(
            Arc::clone(&cache),
            Arc::new(fetcher),
            Arc::new(options),
        );
        (caching, cache)
    }

    fn options() -> RewriteOptions {
        let mut options = RewriteOptions::default();
        options.origin_authorization.push("http://e.com".into());
        options
    }

    #[tokio::test]
    async fn second_fetch_is_served_from_cache() {
        let (caching, _) = harness(ScriptedFetcher::ok(), options());
        let first = caching.fetch_resource("http://e.com/a.css").await.unwrap();
        let second = caching.fetch_resource("http://e.com/a.css").await.unwrap();
        assert_eq!(first.hash, second.hash);
        assert!(second.authoritative);
        assert_eq!(second.content_type, Some(ContentType::Css));
    }

    #[tokio::test]
    async fn transient_errors_retry_then_succeed() {
        tokio::time::pause();
        let fetcher = ScriptedFetcher {
            calls: AtomicU32::new(0),
            failures_before_success: 2,
            status: 200,
        };
        let (caching, _) = harness(fetcher, options());
        let handle =
            tokio::spawn(
                async move { caching.fetch_resource("http://e.com/a.css").await },
            );
        // Paused clock: sleeps auto-advance.
        let res = handle.await.unwrap().unwrap();
        assert_eq!(&res.bytes[..], b"body{}");
    }

    #[tokio::test]
    async fn permanent_failure_is_remembered() {
        let fetcher = ScriptedFetcher {
            calls: AtomicU32::new(0),
            failures_before_success: 0,
            status: 404,
        };
        let (caching, cache) = harness(fetcher, options());
        let err = caching
            .fetch_resource("http://e.com/gone.css")
            .await
            .unwrap_err();
        assert!(err.is_permanent_fetch_failure());
        let entry = cache.get("http://e.com/gone.css").await.unwrap();
        assert_eq!(entry.status, status::REMEMBER_FETCH_FAILED);

        // The negative entry now short-circuits without another fetch.
        let err = caching
            .fetch_resource("http://e.com/gone.css")
            .await
            .unwrap_err();
        assert!(err.is_permanent_fetch_failure());
    }

    #[tokio::test]
    async fn unauthorized_origin_is_not_authoritative() {
        let (caching, _) = harness(ScriptedFetcher::ok(), RewriteOptions::default());
        let res = caching.fetch_resource("http://other.com/a.css").await.unwrap();
        assert!(!res.authoritative);
    }
}
