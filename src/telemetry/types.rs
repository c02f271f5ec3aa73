//! Report types for the tag-to-host telemetry link
//!
//! # Frame Format
//!
//! All frames use COBS encoding with a zero byte delimiter:
//! ```text
//! [COBS-encoded payload][0x00]
//! ```
//!
//! The payload format (before COBS encoding):
//! ```text
//! [version: u8][report_id: u8][length: u16 LE][payload: [u8; length]][crc16: u16 LE]
//! ```
//!
//! - `version`: Protocol version (currently 1)
//! - `report_id`: Report identifier, see [`ReportId`]
//! - `length`: Payload length in bytes (little-endian)
//! - `crc16`: CRC-16-XMODEM over all preceding bytes
//!
//! Reports only flow from the device to the host; there are no commands.

use core::fmt;

use crate::protocol::AnchorId;
use crate::ranging::{Fix, Range, RangingError, RoundOutcome};
use crate::solver::SolverError;
use heapless::Vec;

/// Report IDs
///
/// | ID   | Report      | Payload                                      |
/// |------|-------------|----------------------------------------------|
/// | 0x01 | Version     | `[major][minor][patch]`                      |
/// | 0x20 | Range       | `[anchor][sequence][distance_m: f32 LE]`     |
/// | 0x21 | RangeFailed | `[anchor][reason]`                           |
/// | 0x30 | Position    | `[x: f32 LE][y: f32 LE][residual: f32 LE]`   |
/// | 0x31 | Degenerate  | none                                         |
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportId {
    Version = 0x01,
    Range = 0x20,
    RangeFailed = 0x21,
    Position = 0x30,
    Degenerate = 0x31,
}

impl ReportId {
    /// Try to convert a byte to a ReportId
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Version),
            0x20 => Some(Self::Range),
            0x21 => Some(Self::RangeFailed),
            0x30 => Some(Self::Position),
            0x31 => Some(Self::Degenerate),
            _ => None,
        }
    }

    /// Fixed payload length of this report
    pub const fn payload_len(self) -> usize {
        match self {
            Self::Version => 3,
            Self::Range => 6,
            Self::RangeFailed => 2,
            Self::Position => 12,
            Self::Degenerate => 0,
        }
    }
}

/// Why a round produced no range
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    Timeout = 0x01,
    LateSchedule = 0x02,
    FrameError = 0x03,
    UnexpectedFrame = 0x04,
    RadioError = 0x05,
}

impl FailureReason {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x01 => Some(Self::Timeout),
            0x02 => Some(Self::LateSchedule),
            0x03 => Some(Self::FrameError),
            0x04 => Some(Self::UnexpectedFrame),
            0x05 => Some(Self::RadioError),
            _ => None,
        }
    }
}

impl From<RangingError> for FailureReason {
    fn from(error: RangingError) -> Self {
        match error {
            RangingError::Timeout => Self::Timeout,
            RangingError::LateSchedule => Self::LateSchedule,
            RangingError::FrameError => Self::FrameError,
            RangingError::Codec(_) | RangingError::InvalidState => Self::UnexpectedFrame,
            RangingError::Radio(_) => Self::RadioError,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("timeout"),
            Self::LateSchedule => f.write_str("late schedule"),
            Self::FrameError => f.write_str("frame error"),
            Self::UnexpectedFrame => f.write_str("unexpected frame"),
            Self::RadioError => f.write_str("radio error"),
        }
    }
}

/// Telemetry report
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Report {
    /// Firmware version, sent once at start-up
    Version { major: u8, minor: u8, patch: u8 },
    /// Successful range to an anchor
    Range {
        anchor: AnchorId,
        sequence: u8,
        distance_m: f32,
    },
    /// Round abandoned
    RangeFailed {
        anchor: AnchorId,
        reason: FailureReason,
    },
    /// Solved position
    Position { x: f32, y: f32, residual: f32 },
    /// Cycle completed but the anchor geometry gave no solution
    Degenerate,
}

impl Report {
    pub fn id(&self) -> ReportId {
        match self {
            Report::Version { .. } => ReportId::Version,
            Report::Range { .. } => ReportId::Range,
            Report::RangeFailed { .. } => ReportId::RangeFailed,
            Report::Position { .. } => ReportId::Position,
            Report::Degenerate => ReportId::Degenerate,
        }
    }

    pub fn from_range(range: &Range) -> Self {
        Report::Range {
            anchor: range.anchor,
            sequence: range.sequence,
            distance_m: range.distance_m as f32,
        }
    }

    /// Report for a solve attempt.
    ///
    /// A non-positive range means no position was attempted, so it has no
    /// report of its own.
    pub fn from_fix(fix: Result<Fix, SolverError>) -> Option<Self> {
        match fix {
            Ok(fix) => Some(Report::Position {
                x: fix.position.x as f32,
                y: fix.position.y as f32,
                residual: fix.residual as f32,
            }),
            Err(SolverError::Degenerate) => Some(Report::Degenerate),
            Err(SolverError::NonPositiveDistance) => None,
        }
    }

    /// Reports describing one round: its range or failure, then any fix
    pub fn from_outcome(outcome: &RoundOutcome) -> Vec<Report, 2> {
        let mut reports = Vec::new();

        let _ = reports.push(match &outcome.result {
            Ok(range) => Report::from_range(range),
            Err(error) => Report::RangeFailed {
                anchor: outcome.anchor,
                reason: FailureReason::from(*error),
            },
        });

        if let Some(report) = outcome.fix.and_then(Report::from_fix) {
            let _ = reports.push(report);
        }

        reports
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::solver::Position;

    #[test]
    fn test_report_id_from_byte() {
        for id in [
            ReportId::Version,
            ReportId::Range,
            ReportId::RangeFailed,
            ReportId::Position,
            ReportId::Degenerate,
        ] {
            assert_eq!(ReportId::from_byte(id as u8), Some(id));
        }
        assert_eq!(ReportId::from_byte(0x02), None);
    }

    #[test]
    fn test_outcome_with_range_and_fix() {
        let outcome = RoundOutcome {
            anchor: AnchorId::A3,
            result: Ok(Range {
                anchor: AnchorId::A3,
                sequence: 7,
                tof_s: 1.0e-8,
                distance_m: 3.0,
            }),
            fix: Some(Ok(Fix {
                position: Position { x: 1.5, y: 2.5 },
                residual: 0.25,
            })),
        };

        let reports = Report::from_outcome(&outcome);
        assert_eq!(
            reports.as_slice(),
            &[
                Report::Range {
                    anchor: AnchorId::A3,
                    sequence: 7,
                    distance_m: 3.0
                },
                Report::Position {
                    x: 1.5,
                    y: 2.5,
                    residual: 0.25
                },
            ]
        );
    }

    #[test]
    fn test_outcome_with_failure_and_degenerate_fix() {
        let outcome = RoundOutcome {
            anchor: AnchorId::A3,
            result: Err(RangingError::Timeout),
            fix: Some(Err(SolverError::Degenerate)),
        };

        let reports = Report::from_outcome(&outcome);
        assert_eq!(
            reports.as_slice(),
            &[
                Report::RangeFailed {
                    anchor: AnchorId::A3,
                    reason: FailureReason::Timeout
                },
                Report::Degenerate,
            ]
        );
    }

    #[test]
    fn test_non_positive_distance_is_not_degenerate() {
        assert_eq!(Report::from_fix(Err(SolverError::NonPositiveDistance)), None);
        assert_eq!(
            Report::from_fix(Err(SolverError::Degenerate)),
            Some(Report::Degenerate)
        );

        let outcome = RoundOutcome {
            anchor: AnchorId::A3,
            result: Err(RangingError::Timeout),
            fix: Some(Err(SolverError::NonPositiveDistance)),
        };
        let reports = Report::from_outcome(&outcome);
        assert_eq!(
            reports.as_slice(),
            &[Report::RangeFailed {
                anchor: AnchorId::A3,
                reason: FailureReason::Timeout
            }]
        );
    }
}
