//! Telemetry writer task
//!
//! Generic over any `embedded_io_async::Write`, so USB Serial JTAG, a UART or
//! a CDC-ACM class all work.

use embedded_io_async::Write;

use super::ranging::ReportReceiver;
use crate::telemetry::ReportSerialiser;

/// Task that writes reports to a serial interface
pub async fn report_writer_task<W: Write>(mut writer: W, receiver: ReportReceiver) {
    let serialiser = ReportSerialiser::new();

    loop {
        let report = receiver.receive().await;
        let encoded = serialiser.serialise(&report);
        if writer.write_all(&encoded).await.is_err() {
            log::debug!("Telemetry: write failed");
        }
    }
}
