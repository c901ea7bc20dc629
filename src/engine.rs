//! ==============================================================================
//! engine.rs - periodic sampling engine
//! ==============================================================================
//!
//! purpose:
//!     produces one fresh Sample per period and publishes it to SampleStore.
//!
//! per tick:
//!     1. draw a raw value and map it into the simulation range
//!     2. read the monotonic clock
//!     3. read the threshold (ConfigStore guard, released right away)
//!     4. alert = temp > threshold
//!     5. publish the whole sample (SampleStore guard)
//!     6. read the period and sleep that long from now (no catch-up)
//!
//! the timer is a tokio task that re-arms itself. a period written while the
//! task sleeps only affects the gap after the next tick. `tick()` has no await
//! point, so aborting the task never interrupts a half-finished tick.
//!
//! relationships:
//!     - uses: hal.rs (RandomSource, Clock), store.rs (both stores)
//!     - used by: device.rs (SimTemp::start)
//!
//! ==============================================================================

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::domain::{is_alert, temp_from_raw, Sample};
use crate::hal::{Clock, RandomSource};
use crate::store::{ConfigStore, SampleStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// waiting for the next timer expiry
    Idle,
    /// executing one tick
    Sampling,
}

/// counters shared between the timer task and its handle
#[derive(Default)]
struct EngineStatus {
    state: AtomicU8,
    ticks: AtomicU64,
}

impl EngineStatus {
    fn set(&self, state: EngineState) {
        self.state.store(state as u8, Ordering::SeqCst);
    }

    fn get(&self) -> EngineState {
        match self.state.load(Ordering::SeqCst) {
            s if s == EngineState::Sampling as u8 => EngineState::Sampling,
            _ => EngineState::Idle,
        }
    }
}

pub struct SamplingEngine<R, C> {
    rng: R,
    clock: C,
    samples: Arc<SampleStore>,
    config: Arc<ConfigStore>,
    status: Arc<EngineStatus>,
    show_samples: bool,
}

impl<R: RandomSource, C: Clock> SamplingEngine<R, C> {
    pub fn new(samples: Arc<SampleStore>, config: Arc<ConfigStore>, rng: R, clock: C) -> Self {
        Self {
            rng,
            clock,
            samples,
            config,
            status: Arc::new(EngineStatus::default()),
            show_samples: true,
        }
    }

    /// log each tick at info (true) or debug (false)
    pub fn show_samples(mut self, show: bool) -> Self {
        self.show_samples = show;
        self
    }

    /// run steps 1-5 once and return what was published
    pub fn tick(&mut self) -> Sample {
        self.status.set(EngineState::Sampling);

        let temp_mc = temp_from_raw(self.rng.next_u32());
        let timestamp_ns = self.clock.now_ns();
        let threshold_mc = self.config.threshold_mc();

        let sample = Sample {
            timestamp_ns,
            temp_mc,
            alert: is_alert(temp_mc, threshold_mc),
        };
        self.samples.publish(sample);

        self.status.ticks.fetch_add(1, Ordering::SeqCst);
        self.status.set(EngineState::Idle);
        sample
    }

    /// step 6: gap until the next tick, read fresh from ConfigStore
    pub fn next_delay(&self) -> Duration {
        self.config.snapshot().period()
    }

    fn report(&self, sample: &Sample, delay: Duration) {
        let period_ms = self.config.period_ms();
        let threshold_mc = self.config.threshold_mc();
        let next_in_ms = delay.as_millis() as u64;
        // tracing levels are static per callsite; only the level differs
        macro_rules! sample_event {
            ($level:ident) => {
                $level!(
                    timestamp_ns = sample.timestamp_ns,
                    temp_mc = sample.temp_mc,
                    alert = sample.alert as u8,
                    period_ms,
                    threshold_mc,
                    next_in_ms,
                    "sample"
                )
            };
        }
        if self.show_samples {
            sample_event!(info);
        } else {
            sample_event!(debug);
        }
    }

    /// arm the timer; the first tick fires one period from now
    pub fn spawn(mut self) -> EngineHandle {
        let status = self.status.clone();
        let task = tokio::spawn(async move {
            let mut delay = self.next_delay();
            loop {
                tokio::time::sleep(delay).await;
                let sample = self.tick();
                delay = self.next_delay();
                self.report(&sample, delay);
            }
        });
        EngineHandle { task: Some(task), status }
    }
}

/// owner of the armed timer; dropping it cancels the pending tick
pub struct EngineHandle {
    task: Option<JoinHandle<()>>,
    status: Arc<EngineStatus>,
}

impl EngineHandle {
    pub fn ticks(&self) -> u64 {
        self.status.ticks.load(Ordering::SeqCst)
    }

    pub fn state(&self) -> EngineState {
        self.status.get()
    }

    /// cancel the timer and wait until the task is gone
    pub async fn shutdown(mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            let _ = task.await;
        }
        debug!(ticks = self.ticks(), "sampling engine stopped");
    }
}

impl Drop for EngineHandle {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Config;
    use crate::hal::{raw_for_temp, ManualClock, ScriptedRandom};

    fn stores(threshold_mc: i32, sampling_ms: i32) -> (Arc<SampleStore>, Arc<ConfigStore>) {
        (
            Arc::new(SampleStore::new()),
            Arc::new(ConfigStore::new(Config { sampling_ms, threshold_mc })),
        )
    }

    async fn at_ms(ms: u64) {
        // paused runtime: auto-advances and lets the engine task run first
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    #[test]
    fn test_tick_publishes_and_alerts() {
        let (samples, config) = stores(50_000, 100);
        let clock = ManualClock::new(1_000);
        let mut engine = SamplingEngine::new(
            samples.clone(),
            config.clone(),
            ScriptedRandom::temps([60_000, 50_000]),
            clock.clone(),
        );

        let s = engine.tick();
        assert_eq!(s, Sample { timestamp_ns: 1_000, temp_mc: 60_000, alert: true });
        assert_eq!(samples.snapshot(), s);

        clock.advance(100);
        let s = engine.tick();
        assert_eq!(s, Sample { timestamp_ns: 1_100, temp_mc: 50_000, alert: false });
        assert_eq!(samples.snapshot(), s);
    }

    #[test]
    fn test_threshold_read_each_tick() {
        let (samples, config) = stores(45_000, 100);
        let mut engine = SamplingEngine::new(
            samples,
            config.clone(),
            ScriptedRandom::temps([30_001, 30_000]),
            ManualClock::new(0),
        );
        config.set_threshold_mc(30_000);
        assert!(engine.tick().alert);
        assert!(!engine.tick().alert);
    }

    #[test]
    fn test_tick_range_with_real_random() {
        let (samples, config) = stores(45_000, 100);
        let mut engine = SamplingEngine::new(
            samples,
            config,
            crate::hal::SystemRandom::seeded(7),
            ManualClock::new(0),
        );
        for _ in 0..1_000 {
            let s = engine.tick();
            assert!((crate::domain::MIN_TEMP_MC..crate::domain::MAX_TEMP_MC).contains(&s.temp_mc));
            assert_eq!(s.alert, s.temp_mc > 45_000);
        }
    }

    #[test]
    fn test_next_delay_uses_current_period() {
        let (samples, config) = stores(0, 100);
        let engine = SamplingEngine::new(samples, config.clone(), ScriptedRandom::new([0]), ManualClock::new(0));
        assert_eq!(engine.next_delay(), Duration::from_millis(100));
        config.set_period_ms(50);
        assert_eq!(engine.next_delay(), Duration::from_millis(50));
        config.set_period_ms(0);
        assert_eq!(engine.next_delay(), Duration::from_millis(1));
    }

    /// collects formatted log output for inspection
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<std::sync::Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn captured_report(show_samples: bool) -> String {
        let (samples, config) = stores(45_000, 250);
        let engine = SamplingEngine::new(samples, config, ScriptedRandom::temps([50_000]), ManualClock::new(3))
            .show_samples(show_samples);
        let buf = LogBuffer::default();
        let writer = buf.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        tracing::subscriber::with_default(subscriber, || {
            engine.report(&Sample { timestamp_ns: 3, temp_mc: 50_000, alert: true }, Duration::from_millis(250));
        });
        let out = buf.0.lock().unwrap().clone();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_report_fields_same_at_both_levels() {
        let info_line = captured_report(true);
        let debug_line = captured_report(false);
        assert!(info_line.contains("INFO"));
        assert!(debug_line.contains("DEBUG"));
        for line in [&info_line, &debug_line] {
            for field in ["timestamp_ns=3", "temp_mc=50000", "alert=1", "period_ms=250", "threshold_mc=45000", "next_in_ms=250"] {
                assert!(line.contains(field), "{field} missing from {line:?}");
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_tick_after_one_period() {
        let (samples, config) = stores(0, 100);
        let handle = SamplingEngine::new(samples.clone(), config, ScriptedRandom::temps([5]), ManualClock::new(9))
            .spawn();

        at_ms(99).await;
        assert_eq!(handle.ticks(), 0);
        assert_eq!(samples.snapshot(), Sample::default());

        at_ms(2).await;
        assert_eq!(handle.ticks(), 1);
        assert_eq!(samples.snapshot(), Sample { timestamp_ns: 9, temp_mc: 5, alert: true });
        assert_eq!(handle.state(), EngineState::Idle);

        at_ms(300).await;
        assert_eq!(handle.ticks(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_period_change_applies_to_next_gap() {
        let (samples, config) = stores(0, 100);
        let handle = SamplingEngine::new(samples, config.clone(), ScriptedRandom::new([0]), ManualClock::new(0))
            .spawn();

        // tick 1 at t=100, next armed for t=200
        at_ms(120).await;
        assert_eq!(handle.ticks(), 1);

        config.set_period_ms(50);

        // the pending countdown is not restarted: nothing at t=170
        at_ms(60).await; // t=180
        assert_eq!(handle.ticks(), 1);

        at_ms(21).await; // t=201
        assert_eq!(handle.ticks(), 2);

        // from here on the gap is 50
        at_ms(50).await; // t=251
        assert_eq!(handle.ticks(), 3);
        at_ms(50).await; // t=301
        assert_eq!(handle.ticks(), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn test_non_positive_period_is_clamped() {
        let (samples, config) = stores(0, 0);
        let handle = SamplingEngine::new(samples, config.clone(), ScriptedRandom::new([0]), ManualClock::new(0))
            .spawn();

        at_ms(10).await;
        let ticks = handle.ticks();
        assert!((9..=10).contains(&ticks), "got {ticks} ticks in 10ms");
        assert_eq!(config.period_ms(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_cancels_pending_tick() {
        let (samples, config) = stores(0, 100);
        let handle = SamplingEngine::new(samples.clone(), config, ScriptedRandom::temps([42]), ManualClock::new(0))
            .spawn();

        at_ms(150).await;
        assert_eq!(handle.ticks(), 1);
        handle.shutdown().await;

        samples.publish(Sample::default());
        at_ms(500).await;
        assert_eq!(samples.snapshot(), Sample::default());
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_timer() {
        let (samples, config) = stores(0, 100);
        let handle = SamplingEngine::new(samples.clone(), config, ScriptedRandom::temps([42]), ManualClock::new(0))
            .spawn();
        drop(handle);

        at_ms(500).await;
        assert_eq!(samples.snapshot(), Sample::default());
    }

    #[test]
    fn test_atomic_under_concurrent_config_writes() {
        // the clock and the random source advance in lockstep, so every
        // legitimate sample has temp_mc == timestamp_ns
        struct Lockstep(Arc<AtomicU64>);
        impl RandomSource for Lockstep {
            fn next_u32(&mut self) -> u32 {
                raw_for_temp((self.0.fetch_add(1, Ordering::SeqCst) % 150_000) as i32)
            }
        }
        struct Trailing(Arc<AtomicU64>);
        impl Clock for Trailing {
            fn now_ns(&self) -> u64 {
                (self.0.load(Ordering::SeqCst) - 1) % 150_000
            }
        }

        let (samples, config) = stores(75_000, 100);
        let counter = Arc::new(AtomicU64::new(0));
        let mut engine = SamplingEngine::new(
            samples.clone(),
            config.clone(),
            Lockstep(counter.clone()),
            Trailing(counter),
        );

        let stop = Arc::new(std::sync::atomic::AtomicBool::new(false));
        let writers: Vec<_> = (0..2)
            .map(|i| {
                let config = config.clone();
                let stop = stop.clone();
                std::thread::spawn(move || {
                    let mut n = 0;
                    while !stop.load(Ordering::SeqCst) {
                        if i == 0 {
                            config.set_period_ms(n % 200);
                        } else {
                            config.set_threshold_mc(n % 150_000);
                        }
                        n = (n + 1) % 1_000_000;
                    }
                })
            })
            .collect();
        let readers: Vec<_> = (0..3)
            .map(|_| {
                let samples = samples.clone();
                let stop = stop.clone();
                std::thread::spawn(move || {
                    while !stop.load(Ordering::SeqCst) {
                        let s = samples.snapshot();
                        assert_eq!(s.temp_mc as u64, s.timestamp_ns);
                    }
                })
            })
            .collect();

        for _ in 0..20_000 {
            engine.tick();
        }
        stop.store(true, Ordering::SeqCst);
        for t in writers.into_iter().chain(readers) {
            t.join().unwrap();
        }
    }
}
