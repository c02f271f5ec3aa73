//! Poll and response frame codec
//!
//! # Frame Format
//!
//! Every ranging frame starts with the same 10-byte header:
//! ```text
//! [frame_control: u16 LE][seq: u8][pan_id: u16 LE][dst: 2B][src: 2B][func_code: u8]
//! ```
//!
//! - `frame_control`: 0x8841 (data frame, 16-bit addressing)
//! - `seq`: sequence number, ignored when matching received frames
//! - `pan_id`: 0xDECA
//! - `dst` / `src`: short addresses, see [`AnchorId::address`]
//! - `func_code`: 0xE0 for a poll, 0xE1 for a response
//!
//! A poll carries nothing else. A response carries two truncated timestamps:
//! ```text
//! [header: 10B][poll_rx_ts: u32 LE][resp_tx_ts: u32 LE]
//! ```
//!
//! The 2-byte FCS is appended by the radio on transmit and may still be present
//! at the end of a received buffer. The codec never writes it and never reads it.

use core::fmt;

use crate::config::frame::{
    FRAME_CONTROL, FUNC_CODE_POLL, FUNC_CODE_RESPONSE, MAX_FRAME_LEN, PAN_ID,
};
use crate::protocol::anchor::{AnchorId, NETWORK_ADDRESS};
use heapless::Vec;

/// Length of the header shared by all ranging frames
pub const HEADER_LEN: usize = 10;

/// Offset of the sequence number in the header
pub const SEQ_IDX: usize = 2;

/// Offset of the poll reception timestamp in a response
pub const POLL_RX_TS_IDX: usize = 10;

/// Offset of the response transmission timestamp in a response
pub const RESP_TX_TS_IDX: usize = 14;

/// Size of an embedded timestamp
pub const TS_LEN: usize = 4;

/// Encoded length of a response (without FCS)
pub const RESPONSE_LEN: usize = HEADER_LEN + 2 * TS_LEN;

/// Buffer holding one encoded frame
pub type Frame = Vec<u8, MAX_FRAME_LEN>;

/// Errors raised while decoding a received frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
    /// Header matches no known poll or response pattern for the active role
    UnrecognizedFrame,
    /// Frame is shorter than the fixed minimum for its kind
    Truncated,
}

impl fmt::Display for CodecError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecError::UnrecognizedFrame => f.write_str("unrecognized frame"),
            CodecError::Truncated => f.write_str("truncated frame"),
        }
    }
}

/// Kind of ranging frame, selected by the function code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    Poll,
    Response,
}

impl MessageKind {
    /// Function code byte of this kind
    pub const fn function_code(self) -> u8 {
        match self {
            MessageKind::Poll => FUNC_CODE_POLL,
            MessageKind::Response => FUNC_CODE_RESPONSE,
        }
    }
}

/// Side of the exchange a device is playing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// The tag: sends polls, receives responses
    Initiator,
    /// An anchor: receives polls, sends responses
    Responder,
}

impl Role {
    /// The frame kind this role accepts
    pub const fn accepts(self) -> MessageKind {
        match self {
            Role::Initiator => MessageKind::Response,
            Role::Responder => MessageKind::Poll,
        }
    }
}

/// A decoded ranging frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangingMessage {
    /// Poll from the tag to `anchor`
    Poll { anchor: AnchorId, sequence: u8 },
    /// Response from `anchor` carrying its two timestamps (low 32 bits)
    Response {
        anchor: AnchorId,
        sequence: u8,
        poll_rx_ts: u32,
        resp_tx_ts: u32,
    },
}

impl RangingMessage {
    /// Anchor this frame is addressed to or sent by
    pub fn anchor(&self) -> AnchorId {
        match self {
            RangingMessage::Poll { anchor, .. } | RangingMessage::Response { anchor, .. } => {
                *anchor
            }
        }
    }

    /// Sequence number carried in the header
    pub fn sequence(&self) -> u8 {
        match self {
            RangingMessage::Poll { sequence, .. }
            | RangingMessage::Response { sequence, .. } => *sequence,
        }
    }

    /// Kind of this frame
    pub fn kind(&self) -> MessageKind {
        match self {
            RangingMessage::Poll { .. } => MessageKind::Poll,
            RangingMessage::Response { .. } => MessageKind::Response,
        }
    }
}

/// Build the header for a frame of `kind` exchanged with `anchor`
pub fn header(kind: MessageKind, anchor: AnchorId, sequence: u8) -> [u8; HEADER_LEN] {
    let (dst, src) = match kind {
        MessageKind::Poll => (NETWORK_ADDRESS, anchor.address()),
        MessageKind::Response => (anchor.address(), NETWORK_ADDRESS),
    };
    let fc = FRAME_CONTROL.to_le_bytes();
    let pan = PAN_ID.to_le_bytes();

    [
        fc[0],
        fc[1],
        sequence,
        pan[0],
        pan[1],
        dst[0],
        dst[1],
        src[0],
        src[1],
        kind.function_code(),
    ]
}

/// Encode a poll for `anchor`
pub fn encode_poll(anchor: AnchorId, sequence: u8) -> Frame {
    let mut frame = Frame::new();
    let _ = frame.extend_from_slice(&header(MessageKind::Poll, anchor, sequence));
    frame
}

/// Encode a response from `anchor` embedding the low 32 bits of both timestamps
pub fn encode_response(anchor: AnchorId, sequence: u8, poll_rx_ts: u32, resp_tx_ts: u32) -> Frame {
    let mut frame = Frame::new();
    let _ = frame.extend_from_slice(&header(MessageKind::Response, anchor, sequence));
    let _ = frame.extend_from_slice(&poll_rx_ts.to_le_bytes());
    let _ = frame.extend_from_slice(&resp_tx_ts.to_le_bytes());
    frame
}

/// Decode any known poll or response.
///
/// Only the first [`HEADER_LEN`] bytes are compared, with the sequence number
/// masked out. Bytes beyond the fixed length of the frame (usually the FCS) are
/// ignored.
pub fn decode(frame: &[u8]) -> Result<RangingMessage, CodecError> {
    if frame.len() < HEADER_LEN {
        return Err(CodecError::Truncated);
    }

    let (kind, anchor) = match_header(&frame[..HEADER_LEN]).ok_or(CodecError::UnrecognizedFrame)?;
    let sequence = frame[SEQ_IDX];

    match kind {
        MessageKind::Poll => Ok(RangingMessage::Poll { anchor, sequence }),
        MessageKind::Response => {
            if frame.len() < RESPONSE_LEN {
                return Err(CodecError::Truncated);
            }
            Ok(RangingMessage::Response {
                anchor,
                sequence,
                poll_rx_ts: read_ts(frame, POLL_RX_TS_IDX),
                resp_tx_ts: read_ts(frame, RESP_TX_TS_IDX),
            })
        }
    }
}

/// Decode a frame, accepting only the kind `role` expects to receive
pub fn decode_for(role: Role, frame: &[u8]) -> Result<RangingMessage, CodecError> {
    let message = decode(frame)?;
    if message.kind() != role.accepts() {
        return Err(CodecError::UnrecognizedFrame);
    }
    Ok(message)
}

/// Find the pattern a received header matches, ignoring the sequence number
fn match_header(received: &[u8]) -> Option<(MessageKind, AnchorId)> {
    for kind in [MessageKind::Poll, MessageKind::Response] {
        for anchor in AnchorId::ALL {
            let expected = header(kind, anchor, 0);
            let matches = received
                .iter()
                .zip(expected.iter())
                .enumerate()
                .all(|(i, (r, e))| i == SEQ_IDX || r == e);
            if matches {
                return Some((kind, anchor));
            }
        }
    }
    None
}

fn read_ts(frame: &[u8], offset: usize) -> u32 {
    let mut bytes = [0u8; TS_LEN];
    bytes.copy_from_slice(&frame[offset..offset + TS_LEN]);
    u32::from_le_bytes(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poll_wire_layout() {
        let frame = encode_poll(AnchorId::A1, 7);
        assert_eq!(
            frame.as_slice(),
            &[0x41, 0x88, 7, 0xCA, 0xDE, b'W', b'A', b'V', b'E', 0xE0]
        );
    }

    #[test]
    fn test_response_wire_layout() {
        let frame = encode_response(AnchorId::A2, 3, 0x1122_3344, 0xAABB_CCDD);
        assert_eq!(frame.len(), RESPONSE_LEN);
        assert_eq!(
            &frame[..HEADER_LEN],
            &[0x41, 0x88, 3, 0xCA, 0xDE, b'D', b'M', b'W', b'A', 0xE1]
        );
        assert_eq!(&frame[POLL_RX_TS_IDX..RESP_TX_TS_IDX], &[0x44, 0x33, 0x22, 0x11]);
        assert_eq!(&frame[RESP_TX_TS_IDX..], &[0xDD, 0xCC, 0xBB, 0xAA]);
    }

    #[test]
    fn test_poll_round_trip() {
        for anchor in AnchorId::ALL {
            for sequence in [0u8, 1, 128, 255] {
                let decoded = decode(&encode_poll(anchor, sequence)).expect("Should decode");
                assert_eq!(decoded, RangingMessage::Poll { anchor, sequence });
            }
        }
    }

    #[test]
    fn test_response_round_trip() {
        for anchor in AnchorId::ALL {
            let frame = encode_response(anchor, 42, 0xDEAD_BEEF, 0x0000_0001);
            let decoded = decode(&frame).expect("Should decode");
            assert_eq!(
                decoded,
                RangingMessage::Response {
                    anchor,
                    sequence: 42,
                    poll_rx_ts: 0xDEAD_BEEF,
                    resp_tx_ts: 0x0000_0001,
                }
            );
        }
    }

    #[test]
    fn test_trailing_fcs_ignored() {
        let mut frame = encode_response(AnchorId::A3, 9, 100, 200);
        frame.extend_from_slice(&[0x5A, 0xA5]).unwrap();

        match decode(&frame).expect("Should decode") {
            RangingMessage::Response { poll_rx_ts, resp_tx_ts, .. } => {
                assert_eq!(poll_rx_ts, 100);
                assert_eq!(resp_tx_ts, 200);
            }
            _ => panic!("Expected Response"),
        }
    }

    #[test]
    fn test_short_header_is_truncated() {
        let frame = encode_poll(AnchorId::A1, 0);
        assert_eq!(decode(&frame[..HEADER_LEN - 1]), Err(CodecError::Truncated));
        assert_eq!(decode(&[]), Err(CodecError::Truncated));
    }

    #[test]
    fn test_response_without_timestamps_is_truncated() {
        let frame = encode_response(AnchorId::A1, 0, 1, 2);
        assert_eq!(decode(&frame[..RESPONSE_LEN - 1]), Err(CodecError::Truncated));
    }

    #[test]
    fn test_unknown_function_code() {
        let mut frame = encode_poll(AnchorId::A1, 0);
        frame[HEADER_LEN - 1] = 0xE2;
        assert_eq!(decode(&frame), Err(CodecError::UnrecognizedFrame));
    }

    #[test]
    fn test_wrong_pan_id() {
        let mut frame = encode_poll(AnchorId::A2, 0);
        frame[3] = 0x00;
        assert_eq!(decode(&frame), Err(CodecError::UnrecognizedFrame));
    }

    #[test]
    fn test_unknown_address() {
        let mut frame = encode_poll(AnchorId::A2, 0);
        frame[7] = b'Z';
        assert_eq!(decode(&frame), Err(CodecError::UnrecognizedFrame));
    }

    #[test]
    fn test_role_filtering() {
        let poll = encode_poll(AnchorId::A1, 0);
        let response = encode_response(AnchorId::A1, 0, 0, 0);

        assert!(decode_for(Role::Responder, &poll).is_ok());
        assert_eq!(decode_for(Role::Initiator, &poll), Err(CodecError::UnrecognizedFrame));
        assert!(decode_for(Role::Initiator, &response).is_ok());
        assert_eq!(decode_for(Role::Responder, &response), Err(CodecError::UnrecognizedFrame));
    }
}
