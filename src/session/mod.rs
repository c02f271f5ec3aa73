//! Async ranging sessions
//!
//! A session owns one state machine and runs it against a [`crate::radio::UwbRadio`],
//! turning radio results into state machine events.

pub mod initiator;
pub mod responder;

pub use initiator::InitiatorSession;
pub use responder::{ResponderSession, Served};
