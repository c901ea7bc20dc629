//! ==============================================================================
//! hal.rs - leaf sources for the sampling engine
//! ==============================================================================
//!
//! purpose:
//!     the engine never talks to a random generator or a clock directly.
//!     it goes through the two traits here so tests can script both.
//!
//! relationships:
//!     - used by: engine.rs (one draw and one timestamp per tick)
//!     - uses: rand (SystemRandom), tokio::time (MonotonicClock)
//!
//! both sources are infallible by type. there is no degraded mode for a
//! tick without a value or a timestamp.
//!
//! ==============================================================================

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// supplies a raw pseudo-random value on demand
pub trait RandomSource: Send + 'static {
    fn next_u32(&mut self) -> u32;
}

/// supplies a monotonically increasing nanosecond timestamp
pub trait Clock: Send + Sync + 'static {
    fn now_ns(&self) -> u64;
}

// ==============================================================================
// REAL IMPLEMENTATIONS
// ==============================================================================

pub struct SystemRandom {
    rng: StdRng,
}

impl SystemRandom {
    pub fn new() -> Self {
        Self { rng: StdRng::from_os_rng() }
    }

    /// fixed seed, reproducible sequence
    pub fn seeded(seed: u64) -> Self {
        Self { rng: StdRng::seed_from_u64(seed) }
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for SystemRandom {
    fn next_u32(&mut self) -> u32 {
        self.rng.random()
    }
}

/// nanoseconds since the clock was created
///
/// built on tokio's Instant so a paused test runtime controls it too.
pub struct MonotonicClock {
    origin: tokio::time::Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self { origin: tokio::time::Instant::now() }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ns(&self) -> u64 {
        self.origin.elapsed().as_nanos() as u64
    }
}

// ==============================================================================
// SCRIPTED IMPLEMENTATIONS (test builds only)
// ==============================================================================

#[cfg(test)]
pub use scripted::{raw_for_temp, ManualClock, ScriptedRandom};

#[cfg(test)]
mod scripted {
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Arc;

    use super::{Clock, RandomSource};

    /// replays a fixed queue of raw values, then repeats the last one
    pub struct ScriptedRandom {
        queue: VecDeque<u32>,
        last: u32,
    }

    impl ScriptedRandom {
        pub fn new(values: impl IntoIterator<Item = u32>) -> Self {
            Self { queue: values.into_iter().collect(), last: 0 }
        }

        /// queue raw values that map onto the given temperatures exactly
        pub fn temps(temps_mc: impl IntoIterator<Item = i32>) -> Self {
            Self::new(temps_mc.into_iter().map(raw_for_temp))
        }
    }

    impl RandomSource for ScriptedRandom {
        fn next_u32(&mut self) -> u32 {
            if let Some(v) = self.queue.pop_front() {
                self.last = v;
            }
            self.last
        }
    }

    /// inverse of `domain::temp_from_raw` for in-range temperatures
    pub fn raw_for_temp(temp_mc: i32) -> u32 {
        (temp_mc - crate::domain::MIN_TEMP_MC) as u32
    }

    /// hand-stepped clock; clones share the same time
    #[derive(Clone, Default)]
    pub struct ManualClock {
        now: Arc<AtomicU64>,
    }

    impl ManualClock {
        pub fn new(start_ns: u64) -> Self {
            Self { now: Arc::new(AtomicU64::new(start_ns)) }
        }

        pub fn advance(&self, ns: u64) {
            self.now.fetch_add(ns, Ordering::SeqCst);
        }
    }

    impl Clock for ManualClock {
        fn now_ns(&self) -> u64 {
            self.now.load(Ordering::SeqCst)
        }
    }
}
