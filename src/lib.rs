#![cfg_attr(not(test), no_std)]

//! UWB real-time location: single-sided two-way ranging between a tag and
//! three anchors, and 2-D trilateration of the tag from the measured ranges.

pub mod config;
pub mod protocol;
pub mod radio;
pub mod ranging;
pub mod session;
pub mod solver;
pub mod telemetry;

// Tasks depend on embassy, only available with the embedded feature
#[cfg(feature = "embedded")]
pub mod tasks;
