use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use serde::Serialize;

/// Keys of operations currently executing, with the instant each one started.
///
/// Entries are only removed when their guard drops. A call that never returns
/// keeps its key blocked until the process restarts; nothing here evicts by age.
#[derive(Default)]
pub struct InFlightOps {
    entries: Mutex<HashMap<String, Instant>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InFlightEntry {
    pub key: String,
    pub age_ms: u128,
}

impl InFlightOps {
    pub fn new() -> Self {
        Self::default()
    }

    /// `<prefix>:<id>`, or `<prefix>:global` when the operation has no target.
    pub fn key(prefix: &str, id: Option<&str>) -> String {
        format!("{}:{}", prefix, id.unwrap_or("global"))
    }

    /// Marks `key` as running. Returns `None` if it already is; check and insert
    /// happen under one lock.
    pub fn try_begin(&self, key: &str) -> Option<InFlightGuard<'_>> {
        let mut entries = self.lock();
        if entries.contains_key(key) {
            return None;
        }
        entries.insert(key.to_string(), Instant::now());
        Some(InFlightGuard {
            ops: self,
            key: key.to_string(),
        })
    }

    pub fn contains(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn snapshot(&self) -> Vec<InFlightEntry> {
        let now = Instant::now();
        let mut out: Vec<InFlightEntry> = self
            .lock()
            .iter()
            .map(|(key, started)| InFlightEntry {
                key: key.clone(),
                age_ms: now.saturating_duration_since(*started).as_millis(),
            })
            .collect();
        out.sort_by(|a, b| b.age_ms.cmp(&a.age_ms).then_with(|| a.key.cmp(&b.key)));
        out
    }

    /// Keys running for longer than `threshold`. Reported only, never removed.
    pub fn older_than(&self, threshold: Duration) -> Vec<String> {
        let now = Instant::now();
        let mut keys: Vec<String> = self
            .lock()
            .iter()
            .filter(|(_, started)| now.saturating_duration_since(**started) > threshold)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Instant>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn finish(&self, key: &str) {
        self.lock().remove(key);
    }
}

/// Releases its key on drop, whether the operation succeeded, failed or was cancelled.
pub struct InFlightGuard<'a> {
    ops: &'a InFlightOps,
    key: String,
}

impl InFlightGuard<'_> {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.ops.finish(&self.key);
    }
}
