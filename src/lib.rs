//! ==============================================================================
//! simtemp - simulated temperature sensor
//! ==============================================================================
//!
//! a timer-driven engine generates one bounded pseudo-random reading per
//! period, compares it against an alarm threshold and publishes it to a
//! mutex-guarded record. callers read that record as a text line through
//! stream sessions and tune the period and threshold through three control
//! origins: boot parameters, attributes and numbered commands.
//!
//! ```text
//!     ┌──────────────┐  publish   ┌─────────────┐  snapshot  ┌──────────────┐
//!     │ engine.rs    │ ─────────> │ SampleStore │ ─────────> │ chardev.rs   │
//!     │ (timer task) │            └─────────────┘            │ ReadSession  │
//!     └──────┬───────┘                                        └──────────────┘
//!            │ period / threshold
//!     ┌──────┴──────┐   apply    ┌──────────────┐
//!     │ ConfigStore │ <───────── │ control.rs   │ <- boot params, attributes,
//!     └─────────────┘            └──────────────┘    commands
//! ```
//!
//! ==============================================================================

pub mod chardev;
pub mod config;
pub mod control;
pub mod device;
pub mod domain;
pub mod engine;
pub mod error;
pub mod hal;
pub mod server;
pub mod store;

pub use chardev::{format_sample, ReadSession};
pub use config::{BootParams, SimtempConfig};
pub use control::{Attribute, Command, ControlPlane, Origin, Param};
pub use device::SimTemp;
pub use domain::{Config, Sample};
pub use engine::{EngineHandle, EngineState, SamplingEngine};
pub use error::DeviceError;
pub use hal::{Clock, MonotonicClock, RandomSource, SystemRandom};
