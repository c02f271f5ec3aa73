//! Byte-stream reassembly of report frames
//!
//! Bytes are buffered until a zero delimiter arrives, then the frame is COBS
//! decoded and parsed.

use crate::config::telemetry::{FRAME_DELIMITER, MAX_FRAME_SIZE};
use crate::telemetry::parser::{ReportError, ReportParser};
use crate::telemetry::serialiser::cobs_decode;
use crate::telemetry::types::Report;
use heapless::Vec;

/// Accumulates incoming bytes and yields one result per complete frame
pub struct ReportAccumulator {
    buffer: Vec<u8, MAX_FRAME_SIZE>,
    /// Set after an overflow until the next delimiter
    discarding: bool,
    parser: ReportParser,
}

impl ReportAccumulator {
    pub fn new() -> Self {
        Self {
            buffer: Vec::new(),
            discarding: false,
            parser: ReportParser::new(),
        }
    }

    /// Push a byte into the accumulator.
    ///
    /// Returns `Some` when a delimiter closes a non-empty frame. Oversized
    /// frames come back as [`ReportError::InvalidLength`] once their delimiter
    /// is seen.
    pub fn push(&mut self, byte: u8) -> Option<Result<Report, ReportError>> {
        if self.discarding {
            if byte == FRAME_DELIMITER {
                self.discarding = false;
                return Some(Err(ReportError::InvalidLength));
            }
            return None;
        }

        if byte == FRAME_DELIMITER && self.buffer.is_empty() {
            // Leading or repeated delimiter
            return None;
        }

        if self.buffer.push(byte).is_err() {
            self.buffer.clear();
            if byte == FRAME_DELIMITER {
                return Some(Err(ReportError::InvalidLength));
            }
            self.discarding = true;
            return None;
        }

        if byte != FRAME_DELIMITER {
            return None;
        }

        let result = match cobs_decode(&self.buffer) {
            Some(raw) => self.parser.parse(&raw),
            None => Err(ReportError::Framing),
        };
        self.buffer.clear();
        Some(result)
    }

    /// Discard any partial frame
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.discarding = false;
    }

    /// True when no partial frame is buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty() && !self.discarding
    }
}

impl Default for ReportAccumulator {
    fn default() -> Self {
        Self::new()
    }
}
