// crates/rewrite/src/cache/prefix.rs

//! Key namespacing layer.
//!
//! Prepends a configured prefix to every key and verifies that keys
//! echoed back by the backend still carry it. A violation indicates a
//! broken backend; it is logged and the entry is treated as a miss.

use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;
use tracing::error;

use super::{Cache, CacheResult, KeyedResult};

pub struct PrefixCache {
    prefix: String,
    inner: Arc<dyn Cache>,
}

impl PrefixCache {
    pub fn new(prefix: impl Into<String>, inner: Arc<dyn Cache>) -> Self {
        PrefixCache {
            prefix: prefix.into(),
            inner,
        }
    }

    fn wrap(&self, key: &str) -> String {
        format!("{}{}", self.prefix, key)
    }

    fn unwrap_key(&self, echoed: &str) -> Option<String> {
        echoed.strip_prefix(&self.prefix).map(str::to_string)
    }
}

#[async_trait]
impl Cache for PrefixCache {
    async fn get(&self, key: &str) -> CacheResult {
        self.inner.get(&self.wrap(key)).await
    }

    async fn multi_get(&self, keys: Vec<String>) -> Vec<KeyedResult> {
        let wrapped: Vec<String> = keys.iter().map(|k| self.wrap(k)).collect();
        let results = self.inner.multi_get(wrapped).await;
        results
            .into_iter()
            .map(|entry| match self.unwrap_key(&entry.key) {
                Some(key) => KeyedResult {
                    key,
                    result: entry.result,
                },
                None => {
                    error!(
                        key = %entry.key,
                        prefix = %self.prefix,
                        "cache returned a key outside this namespace"
                    );
                    KeyedResult {
                        key: entry.key,
                        result: CacheResult::miss(),
                    }
                }
            })
            .collect()
    }

    async fn put(&self, key: &str, value: Bytes) {
        self.inner.put(&self.wrap(key), value).await;
    }

    async fn delete(&self, key: &str) {
        self.inner.delete(&self.wrap(key)).await;
    }

    fn is_healthy(&self) -> bool {
        self.inner.is_healthy()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheState, LockedCache, LruStore};

    #[tokio::test]
    async fn keys_are_namespaced() {
        let backend = Arc::new(LockedCache::new(LruStore::new(16)));
        let prefixed = PrefixCache::new("v1/", Arc::clone(&backend) as Arc<dyn Cache>);
        prefixed.put("k", Bytes::from_static(b"x")).await;
        assert!(backend.get("v1/k").await.is_hit());
        assert!(prefixed.get("k").await.is_hit());
        assert!(!backend.get("k").await.is_hit());
    }

    #[tokio::test]
    async fn foreign_key_in_batch_becomes_miss() {
        struct EchoWrong;

        #[async_trait]
        impl Cache for EchoWrong {
            async fn get(&self, _key: &str) -> CacheResult {
                CacheResult::found(Bytes::from_static(b"x"))
            }

            async fn multi_get(&self, _keys: Vec<String>) -> Vec<KeyedResult> {
                vec![KeyedResult {
                    key: "other-namespace/k".into(),
                    result: CacheResult::found(Bytes::from_static(b"x")),
                }]
            }

            async fn put(&self, _key: &str, _value: Bytes) {}
            async fn delete(&self, _key: &str) {}
        }

        let prefixed = PrefixCache::new("v1/", Arc::new(EchoWrong));
        let results = prefixed.multi_get(vec!["k".into()]).await;
        assert_eq!(results[0].result.state, CacheState::NotFound);
    }
}
