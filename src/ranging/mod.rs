//! Single-sided two-way ranging
//!
//! [`Initiator`] (the tag) and [`Responder`] (an anchor) are event-driven
//! state machines. They never touch the radio themselves; a driver feeds them
//! "frame received", "transmit complete" and "timeout" events and carries out
//! the transmissions they request. See [`crate::session`] for async drivers.

pub mod initiator;
pub mod responder;
pub mod settings;
pub mod timestamp;

use core::fmt;

use crate::protocol::{AnchorId, CodecError};
use crate::radio::RadioError;
use crate::solver::{self, AnchorLayout, Method, Position, SolverError};

pub use initiator::{Initiator, InitiatorState, PollRequest};
pub use responder::{DelayedResponse, Responder, ResponderState};
pub use settings::{ConfigError, RangingConfig};

/// Why a ranging round was abandoned or an event was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangingError {
    /// No response (or distance update) before the receive timeout
    Timeout,
    /// Delayed response could not be scheduled in time
    LateSchedule,
    /// Radio reported a corrupted frame
    FrameError,
    /// Frame did not decode as expected for this role and state
    Codec(CodecError),
    /// Event does not apply in the current state
    InvalidState,
    /// Any other radio failure
    Radio(RadioError),
}

impl From<CodecError> for RangingError {
    fn from(error: CodecError) -> Self {
        RangingError::Codec(error)
    }
}

impl From<RadioError> for RangingError {
    fn from(error: RadioError) -> Self {
        match error {
            RadioError::Timeout => RangingError::Timeout,
            RadioError::TooLate => RangingError::LateSchedule,
            RadioError::FrameError => RangingError::FrameError,
            other => RangingError::Radio(other),
        }
    }
}

impl fmt::Display for RangingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangingError::Timeout => f.write_str("timeout"),
            RangingError::LateSchedule => f.write_str("late schedule"),
            RangingError::FrameError => f.write_str("frame error"),
            RangingError::Codec(e) => write!(f, "codec: {}", e),
            RangingError::InvalidState => f.write_str("invalid state"),
            RangingError::Radio(e) => write!(f, "radio: {}", e),
        }
    }
}

/// Per-anchor session state
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangingRound {
    /// Sequence number used in the next frame for this anchor
    pub sequence: u8,
    /// Last measured distance in metres, zero until the first success
    pub distance: f64,
}

impl RangingRound {
    pub const fn new() -> Self {
        Self {
            sequence: 0,
            distance: 0.0,
        }
    }
}

impl Default for RangingRound {
    fn default() -> Self {
        Self::new()
    }
}

/// One successful measurement
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    pub anchor: AnchorId,
    /// Sequence number of the poll that produced this range
    pub sequence: u8,
    /// Time of flight in seconds
    pub tof_s: f64,
    pub distance_m: f64,
}

/// A solved position with its fit quality
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fix {
    pub position: Position,
    /// RMS range residual in metres
    pub residual: f64,
}

/// Result of one initiator round
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundOutcome {
    pub anchor: AnchorId,
    pub result: Result<Range, RangingError>,
    /// Present when this round closed a cycle with three positive distances
    pub fix: Option<Result<Fix, SolverError>>,
}

/// Solve from per-anchor distances, or `None` unless all three are positive
pub(crate) fn solve_distances(
    method: Method,
    layout: &AnchorLayout,
    distances: &[f64; 3],
) -> Option<Result<Fix, SolverError>> {
    if !distances.iter().all(|&d| d > 0.0) {
        return None;
    }

    let anchors = layout.with_distances(distances);
    let result = solver::solve(method, &anchors).map(|position| Fix {
        position,
        residual: position.residual(&anchors),
    });

    match &result {
        Ok(fix) => log::info!(
            "Fix x={:.3} y={:.3} residual={:.3}",
            fix.position.x,
            fix.position.y,
            fix.residual
        ),
        Err(e) => log::warn!("No fix: {}", e),
    }

    Some(result)
}
