//! Error types for the device surfaces.
//!
//! End-of-stream is not represented here: a read past the formatted line
//! returns `Ok(0)`.

/// Errors reported synchronously to a caller of the device.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DeviceError {
    /// A control write whose payload does not parse as a decimal integer.
    #[error("invalid argument: '{input}' is not a decimal integer")]
    InvalidArgument { input: String },

    /// An out-of-band command with an unrecognised opcode.
    #[error("invalid command: 0x{cmd:08x}")]
    InvalidCommand { cmd: u32 },

    /// Data could not be moved between the device and the caller.
    #[error("i/o fault: {detail}")]
    IoFault { detail: String },
}

impl From<DeviceError> for std::io::Error {
    fn from(err: DeviceError) -> Self {
        let kind = match err {
            DeviceError::InvalidArgument { .. } | DeviceError::InvalidCommand { .. } => {
                std::io::ErrorKind::InvalidInput
            }
            DeviceError::IoFault { .. } => std::io::ErrorKind::Other,
        };
        std::io::Error::new(kind, err)
    }
}
