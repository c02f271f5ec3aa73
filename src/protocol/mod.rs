//! Over-the-air ranging protocol: anchor identities, poll/response frames and
//! the auxiliary distance-update frame.

pub mod anchor;
pub mod distance_update;
pub mod frame;

pub use anchor::{AnchorId, NETWORK_ADDRESS};
pub use distance_update::{encode_distance_update, parse_distance_update};
pub use frame::{
    decode, decode_for, encode_poll, encode_response, CodecError, Frame, MessageKind,
    RangingMessage, Role,
};
