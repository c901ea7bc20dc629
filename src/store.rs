//! ==============================================================================
//! store.rs - guarded shared records
//! ==============================================================================
//!
//! purpose:
//!     SampleStore holds the current reading, ConfigStore holds the tunables.
//!     each has its own mutex and every critical section is a field copy.
//!
//! rules:
//!     - only the engine publishes samples
//!     - nothing locks both stores at once
//!     - no formatting, randomness or clock reads under a guard
//!
//! both records are plain Copy data, so a poisoned lock is recovered
//! instead of propagated.
//!
//! ==============================================================================

use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::domain::{Config, Sample};

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Default)]
pub struct SampleStore {
    current: Mutex<Sample>,
}

impl SampleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// overwrite all three fields as one unit
    pub fn publish(&self, sample: Sample) {
        *lock(&self.current) = sample;
    }

    /// consistent copy of the latest published sample
    pub fn snapshot(&self) -> Sample {
        *lock(&self.current)
    }
}

#[derive(Default)]
pub struct ConfigStore {
    config: Mutex<Config>,
}

impl ConfigStore {
    pub fn new(initial: Config) -> Self {
        Self { config: Mutex::new(initial) }
    }

    pub fn period_ms(&self) -> i32 {
        lock(&self.config).sampling_ms
    }

    pub fn threshold_mc(&self) -> i32 {
        lock(&self.config).threshold_mc
    }

    pub fn set_period_ms(&self, v: i32) {
        lock(&self.config).sampling_ms = v;
    }

    pub fn set_threshold_mc(&self, v: i32) {
        lock(&self.config).threshold_mc = v;
    }

    pub fn snapshot(&self) -> Config {
        *lock(&self.config)
    }
}
