//! Fire-and-forget counters shared by producers and consumers.

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Sink for pipeline counters and timers. Must be safe to call from any thread.
pub trait MetricsSink: Send + Sync {
    /// Add `value` to the counter at `key`.
    fn incr_counter(&self, key: &[&str], value: u64);

    /// Record the time elapsed since `start` under `key`.
    fn measure_since(&self, key: &[&str], start: Instant);
}

/// Sink that drops everything.
pub struct NoMetrics;

impl MetricsSink for NoMetrics {
    fn incr_counter(&self, _key: &[&str], _value: u64) {}
    fn measure_since(&self, _key: &[&str], _start: Instant) {}
}

/// In-memory sink keyed by dotted metric name.
#[derive(Debug, Default)]
pub struct Counters {
    counters: Mutex<BTreeMap<String, u64>>,
    timers: Mutex<BTreeMap<String, Duration>>,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value of a counter, zero if never incremented.
    pub fn get(&self, key: &[&str]) -> u64 {
        let key = key.join(".");
        match self.counters.lock() {
            Ok(locked) => locked.get(&key).copied().unwrap_or(0),
            Err(poisoned) => poisoned.into_inner().get(&key).copied().unwrap_or(0),
        }
    }

    /// Copy of every counter, sorted by name.
    pub fn snapshot(&self) -> BTreeMap<String, u64> {
        match self.counters.lock() {
            Ok(locked) => locked.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Copy of every timer total, sorted by name.
    pub fn timings(&self) -> BTreeMap<String, Duration> {
        match self.timers.lock() {
            Ok(locked) => locked.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl MetricsSink for Counters {
    fn incr_counter(&self, key: &[&str], value: u64) {
        let key = key.join(".");
        match self.counters.lock() {
            Ok(mut locked) => *locked.entry(key).or_default() += value,
            Err(poisoned) => *poisoned.into_inner().entry(key).or_default() += value,
        }
    }

    fn measure_since(&self, key: &[&str], start: Instant) {
        let key = key.join(".");
        let elapsed = start.elapsed();
        match self.timers.lock() {
            Ok(mut locked) => *locked.entry(key).or_default() += elapsed,
            Err(poisoned) => *poisoned.into_inner().entry(key).or_default() += elapsed,
        }
    }
}
