//! Auxiliary distance-update frames
//!
//! After a successful exchange the tag may send the distance it measured back
//! to the anchor as plain ASCII, e.g. `"3.142"`, NUL-padded to a fixed length.
//! The anchor reads at most [`DISTANCE_UPDATE_RX_LEN`] bytes including the FCS,
//! drops the FCS and parses what is left. This is a best-effort side channel:
//! anything that does not parse is dropped.

use core::fmt::Write;

use crate::config::frame::{DISTANCE_UPDATE_RX_LEN, FCS_LEN};
use crate::protocol::frame::Frame;
use heapless::String;

/// Length of the ASCII body of a distance update (frame length minus FCS)
pub const DISTANCE_UPDATE_TEXT_LEN: usize = DISTANCE_UPDATE_RX_LEN - FCS_LEN;

/// Encode `distance_m` with millimetre resolution.
///
/// Returns `None` for non-finite values or values too long to fit the frame.
pub fn encode_distance_update(distance_m: f64) -> Option<Frame> {
    if !distance_m.is_finite() {
        return None;
    }

    let mut text: String<DISTANCE_UPDATE_TEXT_LEN> = String::new();
    write!(text, "{:.3}", distance_m).ok()?;

    let mut frame = Frame::new();
    frame.extend_from_slice(text.as_bytes()).ok()?;
    frame.resize(DISTANCE_UPDATE_TEXT_LEN, 0).ok()?;
    Some(frame)
}

/// Parse a received distance update, FCS included.
///
/// Returns `None` for oversized frames and for anything that is not a finite
/// decimal number.
pub fn parse_distance_update(frame: &[u8]) -> Option<f64> {
    if frame.len() > DISTANCE_UPDATE_RX_LEN || frame.len() <= FCS_LEN {
        return None;
    }

    let text = &frame[..frame.len() - FCS_LEN];
    let end = text.iter().position(|&b| b == 0).unwrap_or(text.len());
    let value: f64 = core::str::from_utf8(&text[..end]).ok()?.trim().parse().ok()?;

    if value.is_finite() {
        Some(value)
    } else {
        None
    }
}
