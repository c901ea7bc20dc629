//! ==============================================================================
//! device.rs - the sensor instance
//! ==============================================================================
//!
//! purpose:
//!     owns the two stores and hands out the three views on them:
//!     read sessions, the control plane and the sampling engine.
//!
//! bring-up order:
//!     1. probe: build the stores and apply boot parameters (no engine yet)
//!     2. start: arm the sampling timer
//!
//! the instance is plain owned data behind Arc. no process-wide globals,
//! so tests can build as many as they like.
//!
//! ==============================================================================

use std::sync::Arc;

use tracing::info;

use crate::chardev::ReadSession;
use crate::config::BootParams;
use crate::control::ControlPlane;
use crate::domain::{Config, Sample};
use crate::engine::{EngineHandle, SamplingEngine};
use crate::hal::{Clock, RandomSource};
use crate::store::{ConfigStore, SampleStore};

#[derive(Clone)]
pub struct SimTemp {
    samples: Arc<SampleStore>,
    config: Arc<ConfigStore>,
    control: ControlPlane,
}

impl SimTemp {
    /// build a fresh instance with default tunables and an all-zero sample
    pub fn new() -> Self {
        let config = Arc::new(ConfigStore::new(Config::default()));
        Self {
            samples: Arc::new(SampleStore::new()),
            control: ControlPlane::new(config.clone()),
            config,
        }
    }

    /// build an instance and apply boot parameters before anything runs
    pub fn probe(params: &BootParams) -> Self {
        let dev = Self::new();
        dev.control.load_boot_params(params);
        dev
    }

    /// arm the sampling engine; the first tick fires one period from now
    pub fn start<R: RandomSource, C: Clock>(&self, rng: R, clock: C, show_samples: bool) -> EngineHandle {
        let cfg = self.config.snapshot();
        info!(
            sampling_ms = cfg.sampling_ms,
            threshold_mc = cfg.threshold_mc,
            "simtemp sensor initialized"
        );
        SamplingEngine::new(self.samples.clone(), self.config.clone(), rng, clock)
            .show_samples(show_samples)
            .spawn()
    }

    /// an engine bound to this instance but not armed; tests drive its ticks
    pub fn engine<R: RandomSource, C: Clock>(&self, rng: R, clock: C) -> SamplingEngine<R, C> {
        SamplingEngine::new(self.samples.clone(), self.config.clone(), rng, clock)
    }

    /// open a read session at offset 0
    pub fn open(&self) -> ReadSession {
        ReadSession::open(self.samples.clone())
    }

    pub fn control(&self) -> &ControlPlane {
        &self.control
    }

    pub fn sample(&self) -> Sample {
        self.samples.snapshot()
    }

    pub fn config(&self) -> Config {
        self.config.snapshot()
    }
}

impl Default for SimTemp {
    fn default() -> Self {
        Self::new()
    }
}
