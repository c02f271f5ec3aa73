//! Report parser for COBS-decoded frames

use core::fmt;

use crate::config::telemetry::PROTOCOL_VERSION;
use crate::protocol::AnchorId;
use crate::telemetry::types::{FailureReason, Report, ReportId};
use crc::{Crc, CRC_16_XMODEM};

const CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_XMODEM);

/// Header (version, id, length) plus CRC
const MIN_FRAME_LEN: usize = 6;

/// Errors found while parsing a report frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportError {
    /// Frame or payload length wrong for the report
    InvalidLength,
    /// CRC-16 checksum mismatch
    CrcError,
    /// Protocol version not supported
    InvalidVersion,
    /// Unknown report ID
    UnknownReport,
    /// Payload field out of range (anchor index, failure reason)
    InvalidPayload,
    /// COBS decoding failed
    Framing,
}

impl fmt::Display for ReportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportError::InvalidLength => f.write_str("invalid length"),
            ReportError::CrcError => f.write_str("CRC mismatch"),
            ReportError::InvalidVersion => f.write_str("unsupported protocol version"),
            ReportError::UnknownReport => f.write_str("unknown report"),
            ReportError::InvalidPayload => f.write_str("invalid payload"),
            ReportError::Framing => f.write_str("COBS framing error"),
        }
    }
}

/// Parser for report frames
pub struct ReportParser;

impl ReportParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse a COBS-decoded frame into a report
    ///
    /// Frame format: [version: u8][report_id: u8][length: u16 LE][payload][crc16: u16 LE]
    pub fn parse(&self, data: &[u8]) -> Result<Report, ReportError> {
        if data.len() < MIN_FRAME_LEN {
            return Err(ReportError::InvalidLength);
        }

        let version = data[0];
        let report_id = data[1];
        let length = u16::from_le_bytes([data[2], data[3]]) as usize;

        if version != PROTOCOL_VERSION {
            return Err(ReportError::InvalidVersion);
        }

        if data.len() < 4 + length + 2 {
            return Err(ReportError::InvalidLength);
        }

        let payload = &data[4..4 + length];
        let received_crc = u16::from_le_bytes([data[4 + length], data[5 + length]]);
        if calculate_crc(&data[..4 + length]) != received_crc {
            return Err(ReportError::CrcError);
        }

        let id = ReportId::from_byte(report_id).ok_or(ReportError::UnknownReport)?;
        if length != id.payload_len() {
            return Err(ReportError::InvalidLength);
        }

        match id {
            ReportId::Version => Ok(Report::Version {
                major: payload[0],
                minor: payload[1],
                patch: payload[2],
            }),
            ReportId::Range => Ok(Report::Range {
                anchor: parse_anchor(payload[0])?,
                sequence: payload[1],
                distance_m: read_f32(payload, 2),
            }),
            ReportId::RangeFailed => Ok(Report::RangeFailed {
                anchor: parse_anchor(payload[0])?,
                reason: FailureReason::from_byte(payload[1]).ok_or(ReportError::InvalidPayload)?,
            }),
            ReportId::Position => Ok(Report::Position {
                x: read_f32(payload, 0),
                y: read_f32(payload, 4),
                residual: read_f32(payload, 8),
            }),
            ReportId::Degenerate => Ok(Report::Degenerate),
        }
    }
}

impl Default for ReportParser {
    fn default() -> Self {
        Self::new()
    }
}

/// CRC-16-XMODEM as used by the telemetry frames
pub fn calculate_crc(data: &[u8]) -> u16 {
    CRC.checksum(data)
}

fn parse_anchor(byte: u8) -> Result<AnchorId, ReportError> {
    AnchorId::from_index(byte as usize).ok_or(ReportError::InvalidPayload)
}

fn read_f32(payload: &[u8], offset: usize) -> f32 {
    f32::from_le_bytes([
        payload[offset],
        payload[offset + 1],
        payload[offset + 2],
        payload[offset + 3],
    ])
}
