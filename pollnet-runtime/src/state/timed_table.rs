use crate::error::{Result, StackError};
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

/// A live entry as seen by `TimedTable::iter`.
#[derive(Debug)]
pub struct TimedEntry<'a, K, V> {
    pub key: &'a K,
    pub value: &'a V,
    pub age: Duration,
}

///
/// Keyed storage whose entries expire a fixed time after they were last
/// inserted. Expired entries are evicted lazily, when a lookup trips over
/// them or when `purge_expired` runs.
///
/// A table built with no TTL keeps entries until they are removed. A table
/// with a capacity refuses new keys once it is full of live entries;
/// replacing an existing key always succeeds.
///
/// Time is passed in by the caller so the table never reads a clock itself.
///
#[derive(Debug)]
pub struct TimedTable<K, V> {
    entries: HashMap<K, (V, Instant)>,
    ttl: Option<Duration>,
    capacity: Option<usize>,
}

impl<K: Eq + Hash, V> TimedTable<K, V> {
    /// Creates a new empty table. `None` means entries never expire.
    pub fn new(ttl: Option<Duration>) -> Self {
        TimedTable {
            entries: HashMap::new(),
            ttl,
            capacity: None,
        }
    }

    /// Bounds the number of keys the table will hold.
    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Insert `value` under `key`, stamped with `now`. Replacing an existing
    /// key refreshes its timestamp and returns the old value.
    pub fn insert(&mut self, key: K, value: V, now: Instant) -> Result<Option<V>> {
        if !self.entries.contains_key(&key) {
            if let Some(capacity) = self.capacity {
                if self.entries.len() >= capacity && self.purge_expired(now) == 0 {
                    return Err(StackError::TableFull { capacity });
                }
            }
        }
        Ok(self
            .entries
            .insert(key, (value, now))
            .map(|(old, _)| old))
    }

    /// Returns the value for `key` if it has not expired. An expired entry is
    /// removed on the way.
    pub fn get(&mut self, key: &K, now: Instant) -> Option<&V> {
        self.evict_if_expired(key, now);
        self.entries.get(key).map(|(value, _)| value)
    }

    pub fn get_mut(&mut self, key: &K, now: Instant) -> Option<&mut V> {
        self.evict_if_expired(key, now);
        self.entries.get_mut(key).map(|(value, _)| value)
    }

    /// Removes `key` whether or not it has expired.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key).map(|(value, _)| value)
    }

    pub fn contains(&mut self, key: &K, now: Instant) -> bool {
        self.get(key, now).is_some()
    }

    /// Live entries, in no particular order.
    pub fn iter(&self, now: Instant) -> impl Iterator<Item = TimedEntry<'_, K, V>> {
        let ttl = self.ttl;
        self.entries
            .iter()
            .filter(move |(_, (_, stamp))| !is_expired(ttl, *stamp, now))
            .map(move |(key, (value, stamp))| TimedEntry {
                key,
                value,
                age: now.saturating_duration_since(*stamp),
            })
    }

    /// Drops every expired entry and returns how many went.
    pub fn purge_expired(&mut self, now: Instant) -> usize {
        let ttl = self.ttl;
        let before = self.entries.len();
        self.entries
            .retain(|_, (_, stamp)| !is_expired(ttl, *stamp, now));
        before - self.entries.len()
    }

    /// Like `purge_expired`, but hands the expired entries back.
    pub fn drain_expired(&mut self, now: Instant) -> Vec<(K, V)>
    where
        K: Clone,
    {
        let ttl = self.ttl;
        let expired: Vec<K> = self
            .entries
            .iter()
            .filter(|(_, (_, stamp))| is_expired(ttl, *stamp, now))
            .map(|(key, _)| key.clone())
            .collect();
        expired
            .into_iter()
            .filter_map(|key| self.entries.remove(&key).map(|(value, _)| (key, value)))
            .collect()
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn evict_if_expired(&mut self, key: &K, now: Instant) {
        let ttl = self.ttl;
        let expired = match self.entries.get(key) {
            Some((_, stamp)) => is_expired(ttl, *stamp, now),
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
    }
}

/// An entry lives for exactly `ttl`; it is gone once its age exceeds it.
fn is_expired(ttl: Option<Duration>, stamp: Instant, now: Instant) -> bool {
    match ttl {
        Some(ttl) => now.saturating_duration_since(stamp) > ttl,
        None => false,
    }
}
