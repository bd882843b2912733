//! String-keyed cache with a fixed time-to-live and lazy expiry.
//!
//! Entries expire on read; there is no background sweep. Used for derived
//! read views whose recomputation is cheap enough that bounded staleness
//! (and unbounded miss latency) is acceptable.

use std::collections::HashMap;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct TtlCache<V> {
    ttl: Duration,
    entries: HashMap<String, (Instant, V)>,
}

impl<V> TtlCache<V> {
    pub fn new(ttl: Duration) -> Self {
        TtlCache {
            ttl,
            entries: HashMap::new(),
        }
    }

    pub fn get(&mut self, key: &str) -> Option<&V> {
        match self.entries.get(key) {
            Some((stamp, _)) if stamp.elapsed() >= self.ttl => {
                self.entries.remove(key);
                None
            }
            Some(_) => self.entries.get(key).map(|(_, v)| v),
            None => None,
        }
    }

    pub fn put(&mut self, key: impl Into<String>, value: V) {
        self.entries.insert(key.into(), (Instant::now(), value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
