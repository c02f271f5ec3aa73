//! Telemetry reports from the device to a host

pub mod accumulator;
pub mod parser;
pub mod serialiser;
pub mod types;

pub use accumulator::ReportAccumulator;
pub use parser::{ReportError, ReportParser};
pub use serialiser::ReportSerialiser;
pub use types::{FailureReason, Report, ReportId};
