//! ==============================================================================
//! chardev.rs - byte-stream read path
//! ==============================================================================
//!
//! purpose:
//!     turns the current Sample into one text line and hands it out with
//!     stream semantics: each session starts at offset 0, every read returns
//!     at most `len` bytes from the current offset, and once the offset
//!     reaches the end of the line reads return 0 until a new session opens.
//!
//! line format (the compatibility contract):
//!
//! ```text
//!     <timestamp_ns> temp=<temp_mc> alert=<0|1>\n
//! ```
//!
//! a session snapshots SampleStore on its first read and formats the line
//! outside the guard. every later read in that session is served from those
//! bytes, so a chunked read never mixes two ticks. a newer sample is only
//! visible to a new session, or after rewinding to offset 0.
//!
//! ==============================================================================

use std::io::{self, Write};
use std::sync::Arc;

use tracing::debug;

use crate::domain::Sample;
use crate::error::DeviceError;
use crate::store::SampleStore;

/// render a sample as one line
pub fn format_sample(sample: &Sample) -> String {
    format!(
        "{} temp={} alert={}\n",
        sample.timestamp_ns,
        sample.temp_mc,
        u8::from(sample.alert)
    )
}

/// the part of `line` that a read at `offset` of at most `len` bytes returns
pub fn window(line: &[u8], offset: u64, len: usize) -> &[u8] {
    let start = match usize::try_from(offset) {
        Ok(o) if o < line.len() => o,
        _ => return &[],
    };
    let end = start.saturating_add(len).min(line.len());
    &line[start..end]
}

/// one open handle on the device node
pub struct ReadSession {
    samples: Arc<SampleStore>,
    offset: u64,
    line: Option<Vec<u8>>,
}

impl ReadSession {
    pub(crate) fn open(samples: Arc<SampleStore>) -> Self {
        debug!("device opened");
        Self { samples, offset: 0, line: None }
    }

    pub fn position(&self) -> u64 {
        self.offset
    }

    /// move the read offset; rewinding to 0 drops the held line
    pub fn seek_to(&mut self, offset: u64) {
        if offset == 0 {
            self.line = None;
        }
        self.offset = offset;
    }

    fn line(&mut self) -> &[u8] {
        let samples = &self.samples;
        self.line
            .get_or_insert_with(|| format_sample(&samples.snapshot()).into_bytes())
    }

    /// copy up to `len` bytes of the session's line into `out`
    ///
    /// returns `Ok(0)` at end of stream. if `out` rejects the bytes the
    /// offset is left where it was and the failure comes back as `IoFault`.
    pub fn read_into<W: Write + ?Sized>(&mut self, out: &mut W, len: usize) -> Result<usize, DeviceError> {
        let offset = self.offset;
        let chunk = window(self.line(), offset, len);
        if chunk.is_empty() {
            return Ok(0);
        }

        out.write_all(chunk).map_err(|e| DeviceError::IoFault {
            detail: format!("copy to caller failed: {e}"),
        })?;
        let n = chunk.len();
        self.offset += n as u64;
        Ok(n)
    }
}

impl io::Read for ReadSession {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = buf.len();
        let mut cursor = io::Cursor::new(buf);
        Ok(self.read_into(&mut cursor, len)?)
    }
}

impl Drop for ReadSession {
    fn drop(&mut self) {
        debug!(offset = self.offset, "device closed");
    }
}
