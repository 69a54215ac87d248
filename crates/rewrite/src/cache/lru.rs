// crates/rewrite/src/cache/lru.rs

//! In-memory LRU store, used as the default backend in tests and
//! single-process deployments.

use std::collections::HashMap;

use bytes::Bytes;

use super::{CacheResult, CacheStore};

pub struct LruStore {
    max_entries: usize,
    tick: u64,
    entries: HashMap<String, (u64, Bytes)>,
}

impl LruStore {
    pub fn new(max_entries: usize) -> Self {
        LruStore {
            max_entries: max_entries.max(1),
            tick: 0,
            entries: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn touch(&mut self) -> u64 {
        self.tick += 1;
        self.tick
    }

    fn evict_oldest(&mut self) {
        if let Some(key) = self
            .entries
            .iter()
            .min_by_key(|(_, (tick, _))| *tick)
            .map(|(k, _)| k.clone())
        {
            self.entries.remove(&key);
        }
    }
}

impl CacheStore for LruStore {
    fn get(&mut self, key: &str) -> CacheResult {
        let tick = self.touch();
        match self.entries.get_mut(key) {
            Some((last, value)) => {
                *last = tick;
                CacheResult::found(value.clone())
            }
            None => CacheResult::miss(),
        }
    }

    fn put(&mut self, key: &str, value: Bytes) {
        let tick = self.touch();
        self.entries.insert(key.to_string(), (tick, value));
        while self.entries.len() > self.max_entries {
            self.evict_oldest();
        }
    }

    fn delete(&mut self, key: &str) {
        self.entries.remove(key);
    }
}
