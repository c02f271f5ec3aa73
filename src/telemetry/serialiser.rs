//! Report serialiser with COBS encoding

use crate::config::telemetry::{MAX_FRAME_SIZE, PROTOCOL_VERSION};
use crate::telemetry::parser::calculate_crc;
use crate::telemetry::types::Report;
use heapless::Vec;

/// Serialiser for report frames
pub struct ReportSerialiser;

impl ReportSerialiser {
    pub fn new() -> Self {
        Self
    }

    /// Serialise a report to a COBS-encoded frame, zero delimiter included
    pub fn serialise(&self, report: &Report) -> Vec<u8, MAX_FRAME_SIZE> {
        let raw = self.build_raw_frame(report);
        cobs_encode(&raw)
    }

    /// Frame format: [version: u8][report_id: u8][length: u16 LE][payload][crc16: u16 LE]
    fn build_raw_frame(&self, report: &Report) -> Vec<u8, MAX_FRAME_SIZE> {
        let mut frame: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
        let id = report.id();

        let _ = frame.push(PROTOCOL_VERSION);
        let _ = frame.push(id as u8);
        let _ = frame.extend_from_slice(&(id.payload_len() as u16).to_le_bytes());

        match report {
            Report::Version {
                major,
                minor,
                patch,
            } => {
                let _ = frame.extend_from_slice(&[*major, *minor, *patch]);
            }
            Report::Range {
                anchor,
                sequence,
                distance_m,
            } => {
                let _ = frame.push(anchor.index() as u8);
                let _ = frame.push(*sequence);
                let _ = frame.extend_from_slice(&distance_m.to_le_bytes());
            }
            Report::RangeFailed { anchor, reason } => {
                let _ = frame.push(anchor.index() as u8);
                let _ = frame.push(*reason as u8);
            }
            Report::Position { x, y, residual } => {
                let _ = frame.extend_from_slice(&x.to_le_bytes());
                let _ = frame.extend_from_slice(&y.to_le_bytes());
                let _ = frame.extend_from_slice(&residual.to_le_bytes());
            }
            Report::Degenerate => {}
        }

        let crc = calculate_crc(&frame);
        let _ = frame.extend_from_slice(&crc.to_le_bytes());

        frame
    }
}

impl Default for ReportSerialiser {
    fn default() -> Self {
        Self::new()
    }
}

/// COBS encode a buffer; the output ends with the zero delimiter
pub fn cobs_encode(data: &[u8]) -> Vec<u8, MAX_FRAME_SIZE> {
    let mut output: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
    output.resize(corncobs::max_encoded_len(data.len()), 0).ok();
    let len = corncobs::encode_buf(data, &mut output);
    output.truncate(len);
    output
}

/// COBS decode a delimited frame
pub fn cobs_decode(encoded: &[u8]) -> Option<Vec<u8, MAX_FRAME_SIZE>> {
    let mut output: Vec<u8, MAX_FRAME_SIZE> = Vec::new();
    output.resize(encoded.len(), 0).ok()?;
    let len = corncobs::decode_buf(encoded, &mut output).ok()?;
    output.truncate(len);
    Some(output)
}
