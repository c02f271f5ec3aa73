//! Serial connection to a tag streaming telemetry reports.

use std::io::Read;
use std::time::{Duration, Instant};

use anyhow::Result;
use serialport::SerialPort;
use uwb_rtls::telemetry::{Report, ReportAccumulator, ReportError};

/// How long to listen on a candidate port during auto-detection.
/// The tag reports at least once per ranging round (one second).
const PROBE_TIMEOUT: Duration = Duration::from_millis(2500);

/// Find ports that emit valid reports.
pub fn find_report_ports(baud_rate: u32) -> Result<Vec<String>> {
    let ports = serialport::available_ports()?;
    let mut report_ports = Vec::new();

    for port_info in ports {
        let name = &port_info.port_name;
        if !(name.contains("ttyACM") || name.contains("ttyUSB") || name.starts_with("COM")) {
            continue;
        }

        if let Ok(mut client) = DeviceClient::new(name, baud_rate) {
            if let Ok(Some(_)) = client.next_report(PROBE_TIMEOUT) {
                report_ports.push(name.clone());
            }
        }
    }

    Ok(report_ports)
}

/// Resolve a port argument - returns the port path if not "auto", otherwise auto-detects.
pub fn resolve_port(port_arg: &str, baud_rate: u32) -> Result<String> {
    if port_arg != "auto" {
        return Ok(port_arg.to_string());
    }

    match find_report_ports(baud_rate)?.into_iter().next() {
        Some(port) => Ok(port),
        None => anyhow::bail!("No port emitting reports found - ensure the tag is connected"),
    }
}

/// Client reading reports from a tag.
pub struct DeviceClient {
    port: Box<dyn SerialPort>,
    accumulator: ReportAccumulator,
    /// Frames that failed to decode since the port was opened
    bad_frames: u32,
}

impl DeviceClient {
    /// Open `port_name` at `baud_rate`.
    pub fn new(port_name: &str, baud_rate: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud_rate)
            .timeout(Duration::from_millis(100))
            .open()?;

        Ok(Self {
            port,
            accumulator: ReportAccumulator::new(),
            bad_frames: 0,
        })
    }

    /// Discard anything already buffered, including a partial frame.
    pub fn clear_buffer(&mut self) -> Result<()> {
        self.port.clear(serialport::ClearBuffer::All)?;
        self.accumulator.reset();
        Ok(())
    }

    pub fn bad_frames(&self) -> u32 {
        self.bad_frames
    }

    /// Wait up to `timeout` for the next valid report.
    ///
    /// Frames that fail to decode are counted and skipped.
    pub fn next_report(&mut self, timeout: Duration) -> Result<Option<Report>> {
        let mut buf = [0u8; 1];
        let start = Instant::now();

        while start.elapsed() < timeout {
            match self.port.read(&mut buf) {
                Ok(1) => match self.accumulator.push(buf[0]) {
                    Some(Ok(report)) => return Ok(Some(report)),
                    Some(Err(e)) => self.record_bad_frame(e),
                    None => {}
                },
                Ok(_) => {}
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => continue,
                Err(e) => return Err(e.into()),
            }
        }

        Ok(None)
    }

    fn record_bad_frame(&mut self, error: ReportError) {
        self.bad_frames += 1;
        eprintln!("Dropped frame: {}", error);
    }
}
