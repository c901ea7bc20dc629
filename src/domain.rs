use serde::{Deserialize, Serialize};

/// lower bound of the simulated range, inclusive (milli-degrees celsius)
pub const MIN_TEMP_MC: i32 = -40_000;

/// upper bound of the simulated range, exclusive (milli-degrees celsius)
pub const MAX_TEMP_MC: i32 = 150_000;

/// default tick period in milliseconds
pub const DEFAULT_SAMPLING_MS: i32 = 100;

/// default alarm threshold in milli-degrees celsius
pub const DEFAULT_THRESHOLD_MC: i32 = 45_000;

/// smallest gap the scheduler will ever sleep between ticks
pub const MIN_PERIOD_MS: u64 = 1;

/// the current reading, overwritten whole on every tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// monotonic timestamp of generation
    pub timestamp_ns: u64,
    /// temperature in milli-degrees celsius
    pub temp_mc: i32,
    /// true iff temp_mc was strictly above the threshold at generation
    pub alert: bool,
}

/// the two runtime tunables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub sampling_ms: i32,
    pub threshold_mc: i32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            sampling_ms: DEFAULT_SAMPLING_MS,
            threshold_mc: DEFAULT_THRESHOLD_MC,
        }
    }
}

impl Config {
    /// scheduling gap derived from `sampling_ms`
    ///
    /// zero and negative periods are stored as written but scheduled
    /// at [`MIN_PERIOD_MS`].
    pub fn period(&self) -> std::time::Duration {
        let ms = u64::try_from(self.sampling_ms).unwrap_or(0).max(MIN_PERIOD_MS);
        std::time::Duration::from_millis(ms)
    }
}

/// map a raw random value into `[MIN_TEMP_MC, MAX_TEMP_MC)`
pub fn temp_from_raw(raw: u32) -> i32 {
    let span = (MAX_TEMP_MC - MIN_TEMP_MC) as u32;
    (raw % span) as i32 + MIN_TEMP_MC
}

/// strict greater-than; a reading equal to the threshold is not alarming
pub fn is_alert(temp_mc: i32, threshold_mc: i32) -> bool {
    temp_mc > threshold_mc
}
