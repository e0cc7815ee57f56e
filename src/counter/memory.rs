use std::sync::Arc;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

use super::store::{ConflictSnafu, CounterStore, StoreError};
use super::{Counter, CounterKind};

/// An in-process [CounterStore]. Each operation holds the shard lock of its entry, which gives the same per-record
/// atomicity as the database. Clones share the same counters.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    counters: Arc<DashMap<(CounterKind, String), i64>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn key(kind: CounterKind, subject: &str) -> (CounterKind, String) {
        (kind, subject.to_string())
    }
}

impl CounterStore for MemoryStore {
    async fn find(&self, kind: CounterKind, subject: &str) -> Result<Option<Counter>, StoreError> {
        let counter = self
            .counters
            .get(&Self::key(kind, subject))
            .map(|count| Counter {
                subject_id: subject.to_string(),
                count: (*count).max(0) as u64,
            });

        Ok(counter)
    }

    async fn insert(&self, kind: CounterKind, subject: &str, count: u64) -> Result<(), StoreError> {
        match self.counters.entry(Self::key(kind, subject)) {
            Entry::Occupied(_) => ConflictSnafu { kind, subject }.fail(),
            Entry::Vacant(entry) => {
                entry.insert(count as i64);
                Ok(())
            }
        }
    }

    async fn increment(
        &self,
        kind: CounterKind,
        subject: &str,
        delta: i64,
    ) -> Result<Option<i64>, StoreError> {
        let updated = self
            .counters
            .get_mut(&Self::key(kind, subject))
            .map(|mut count| {
                *count += delta;
                *count
            });

        Ok(updated)
    }

    async fn delete_drained(&self, kind: CounterKind, subject: &str) -> Result<bool, StoreError> {
        let removed = self
            .counters
            .remove_if(&Self::key(kind, subject), |_, count| *count <= 0);

        Ok(removed.is_some())
    }

    async fn overwrite(&self, kind: CounterKind, subject: &str, count: u64) -> Result<(), StoreError> {
        let key = Self::key(kind, subject);

        if count == 0 {
            self.counters.remove(&key);
        } else {
            self.counters.insert(key, count as i64);
        }

        Ok(())
    }

    async fn replace(
        &self,
        kind: CounterKind,
        subject: &str,
        expected: Option<u64>,
        count: u64,
    ) -> Result<bool, StoreError> {
        let replaced = match (self.counters.entry(Self::key(kind, subject)), expected) {
            (Entry::Vacant(entry), None) => {
                if count > 0 {
                    entry.insert(count as i64);
                }
                true
            }
            (Entry::Occupied(mut entry), Some(expected)) if (*entry.get()).max(0) as u64 == expected => {
                if count == 0 {
                    entry.remove();
                } else {
                    entry.insert(count as i64);
                }
                true
            }
            _ => false,
        };

        Ok(replaced)
    }

    async fn subjects(&self, kind: CounterKind) -> Result<Vec<String>, StoreError> {
        let subjects = self
            .counters
            .iter()
            .filter(|entry| entry.key().0 == kind)
            .map(|entry| entry.key().1.clone())
            .collect();

        Ok(subjects)
    }
}
