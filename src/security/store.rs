//! Storage for fixed-window rate-limit records.
//!
//! The limiter only talks to [`RateLimitStore`], so the in-process map can be
//! swapped for a shared cache without touching the handlers.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;

/// Requests seen from one client in the current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRecord {
    pub count: u32,
    /// End of the window, epoch milliseconds.
    pub reset_time: u64,
}

impl RateLimitRecord {
    pub fn is_expired(&self, now_ms: u64) -> bool {
        now_ms > self.reset_time
    }
}

/// Keyed storage for rate-limit records.
pub trait RateLimitStore: Send + Sync {
    fn get(&self, key: &str) -> Option<RateLimitRecord>;

    fn set(&self, key: &str, record: RateLimitRecord);

    fn delete(&self, key: &str);

    /// Replace the record for `key` with `f(current)` as one atomic step.
    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<RateLimitRecord>) -> RateLimitRecord,
    ) -> RateLimitRecord;

    /// Remove every record whose window ended before `now_ms`.
    /// Returns how many were removed.
    fn sweep(&self, now_ms: u64) -> usize;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local store. Each key is guarded by its shard lock, so concurrent
/// updates to the same client never lose increments.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, RateLimitRecord>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl RateLimitStore for MemoryStore {
    fn get(&self, key: &str) -> Option<RateLimitRecord> {
        self.records.get(key).map(|r| *r.value())
    }

    fn set(&self, key: &str, record: RateLimitRecord) {
        self.records.insert(key.to_string(), record);
    }

    fn delete(&self, key: &str) {
        self.records.remove(key);
    }

    fn update(
        &self,
        key: &str,
        f: &mut dyn FnMut(Option<RateLimitRecord>) -> RateLimitRecord,
    ) -> RateLimitRecord {
        match self.records.entry(key.to_string()) {
            Entry::Occupied(mut entry) => {
                let next = f(Some(*entry.get()));
                *entry.get_mut() = next;
                next
            }
            Entry::Vacant(entry) => {
                let next = f(None);
                entry.insert(next);
                next
            }
        }
    }

    fn sweep(&self, now_ms: u64) -> usize {
        let before = self.records.len();
        self.records.retain(|_, record| !record.is_expired(now_ms));
        before.saturating_sub(self.records.len())
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}
