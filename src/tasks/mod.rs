//! Embassy tasks module
//!
//! Plain async functions; the board binary wraps them in
//! `#[embassy_executor::task]` with its concrete radio and serial types.

pub mod ranging;
pub mod telemetry;

pub use ranging::{anchor_task, tag_task, ReportReceiver, ReportSender, REPORT_CHANNEL};
pub use telemetry::report_writer_task;
