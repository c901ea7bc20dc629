//! ==============================================================================
//! control.rs - the three control origins
//! ==============================================================================
//!
//! purpose:
//!     boot parameters, runtime attributes and numbered commands all tune the
//!     same two fields. each origin only decodes its own payload format; the
//!     write itself always goes through `ControlPlane::apply`.
//!
//! relationships:
//!     - used by: device.rs (boot params), server.rs (attributes, commands)
//!     - uses: store.rs (ConfigStore guard)
//!
//! concurrent writes from different origins are unordered: last writer wins.
//!
//! ==============================================================================

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::info;

use crate::config::BootParams;
use crate::error::DeviceError;
use crate::store::ConfigStore;

/// which tunable a write targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Param {
    SamplingMs,
    ThresholdMc,
}

/// where a write came from (for diagnostics only)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    BootParam,
    Attribute,
    Command,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Origin::BootParam => "boot-param",
            Origin::Attribute => "attribute",
            Origin::Command => "command",
        })
    }
}

/// a named runtime attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribute(Param);

impl Attribute {
    pub const SAMPLING_PERIOD: Attribute = Attribute(Param::SamplingMs);
    pub const ALARM_THRESHOLD: Attribute = Attribute(Param::ThresholdMc);

    pub fn param(&self) -> Param {
        self.0
    }

    pub fn name(&self) -> &'static str {
        match self.0 {
            Param::SamplingMs => "sampling_period",
            Param::ThresholdMc => "alarm_threshold",
        }
    }
}

impl FromStr for Attribute {
    type Err = ();

    /// accepts the canonical names and the legacy sysfs names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sampling_period" | "sampling_ms" => Ok(Self::SAMPLING_PERIOD),
            "alarm_threshold" | "threshold_mC" => Ok(Self::ALARM_THRESHOLD),
            _ => Err(()),
        }
    }
}

// ==============================================================================
// command opcodes
// ==============================================================================
// encoded like linux _IOW(type, nr, size) so existing clients can keep their
// numbers: direction bits 30..31, size 16..29, type 8..15, nr 0..7

const IOC_WRITE: u32 = 1;
const SIMTEMP_IOC_MAGIC: u8 = b't';

const fn iow(ty: u8, nr: u8, size: usize) -> u32 {
    (IOC_WRITE << 30) | ((size as u32) << 16) | ((ty as u32) << 8) | nr as u32
}

pub const SIMTEMP_IOC_SET_PERIOD: u32 = iow(SIMTEMP_IOC_MAGIC, 1, std::mem::size_of::<i32>());
pub const SIMTEMP_IOC_SET_THRESHOLD: u32 = iow(SIMTEMP_IOC_MAGIC, 2, std::mem::size_of::<i32>());

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetPeriod,
    SetThreshold,
}

impl Command {
    pub fn from_raw(cmd: u32) -> Result<Self, DeviceError> {
        match cmd {
            SIMTEMP_IOC_SET_PERIOD => Ok(Command::SetPeriod),
            SIMTEMP_IOC_SET_THRESHOLD => Ok(Command::SetThreshold),
            _ => Err(DeviceError::InvalidCommand { cmd }),
        }
    }

    pub fn raw(&self) -> u32 {
        match self {
            Command::SetPeriod => SIMTEMP_IOC_SET_PERIOD,
            Command::SetThreshold => SIMTEMP_IOC_SET_THRESHOLD,
        }
    }

    pub fn param(&self) -> Param {
        match self {
            Command::SetPeriod => Param::SamplingMs,
            Command::SetThreshold => Param::ThresholdMc,
        }
    }
}

/// parse a decimal integer the way kstrtoint(.., 10, ..) does:
/// optional sign, digits, at most one trailing newline, i32 range
pub fn parse_decimal(input: &str) -> Result<i32, DeviceError> {
    let trimmed = input.strip_suffix('\n').unwrap_or(input);
    trimmed.parse::<i32>().map_err(|_| DeviceError::InvalidArgument {
        input: input.to_string(),
    })
}

// ==============================================================================
// control plane
// ==============================================================================

#[derive(Clone)]
pub struct ControlPlane {
    config: Arc<ConfigStore>,
}

impl ControlPlane {
    pub fn new(config: Arc<ConfigStore>) -> Self {
        Self { config }
    }

    /// the single write path shared by every origin
    pub fn apply(&self, origin: Origin, param: Param, value: i32) {
        match param {
            Param::SamplingMs => {
                self.config.set_period_ms(value);
                info!(%origin, sampling_ms = value, "sampling period updated");
            }
            Param::ThresholdMc => {
                self.config.set_threshold_mc(value);
                info!(%origin, threshold_mc = value, "alarm threshold updated");
            }
        }
    }

    pub fn get(&self, param: Param) -> i32 {
        match param {
            Param::SamplingMs => self.config.period_ms(),
            Param::ThresholdMc => self.config.threshold_mc(),
        }
    }

    /// apply start-up parameters; runs before the engine is armed
    pub fn load_boot_params(&self, params: &BootParams) {
        self.apply(Origin::BootParam, Param::SamplingMs, params.sampling_ms);
        self.apply(Origin::BootParam, Param::ThresholdMc, params.threshold_mc);
    }

    /// attribute read: decimal value plus newline
    pub fn show(&self, attr: Attribute) -> String {
        format!("{}\n", self.get(attr.param()))
    }

    /// attribute write; returns the number of bytes consumed
    pub fn store(&self, attr: Attribute, buf: &[u8]) -> Result<usize, DeviceError> {
        let text = std::str::from_utf8(buf).map_err(|_| DeviceError::InvalidArgument {
            input: String::from_utf8_lossy(buf).into_owned(),
        })?;
        let value = parse_decimal(text)?;
        self.apply(Origin::Attribute, attr.param(), value);
        Ok(buf.len())
    }

    /// numbered command with a 4-byte little-endian i32 payload
    pub fn ioctl(&self, cmd: u32, payload: &[u8]) -> Result<(), DeviceError> {
        let command = Command::from_raw(cmd)?;
        let bytes: [u8; 4] = payload
            .get(..4)
            .and_then(|b| b.try_into().ok())
            .ok_or_else(|| DeviceError::IoFault {
                detail: format!("command payload needs 4 bytes, got {}", payload.len()),
            })?;
        self.apply(Origin::Command, command.param(), i32::from_le_bytes(bytes));
        Ok(())
    }
}
