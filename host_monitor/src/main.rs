//! Monitor for the UWB tag's telemetry stream.
//!
//! Prints ranges and position fixes as they arrive and optionally appends
//! each fix to a log file.

mod device;
mod position_log;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use colored::Colorize;
use uwb_rtls::config::telemetry::BAUD_RATE;
use uwb_rtls::telemetry::Report;

use device::{resolve_port, DeviceClient};
use position_log::PositionLog;

/// Give up when the tag is silent this long
const SILENCE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Parser)]
#[command(name = "uwb-monitor")]
#[command(about = "Print UWB ranges and position fixes streamed by a tag")]
struct Args {
    /// Serial port of the tag (use "auto" to auto-detect)
    #[arg(short, long, default_value = "auto")]
    port: String,

    /// Baud rate
    #[arg(short, long, default_value_t = BAUD_RATE)]
    baud: u32,

    /// Append each fix as an "x y" line to this file
    #[arg(short, long)]
    log: Option<PathBuf>,

    /// Stop after this many fixes
    #[arg(short, long)]
    count: Option<u32>,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let port = resolve_port(&args.port, args.baud)?;

    println!("{}", "UWB Tag Monitor".bold());
    println!("Port: {}", port);
    println!("Baud: {}", args.baud);
    if let Some(path) = &args.log {
        println!("Log:  {}", path.display());
    }
    println!();

    let mut device = DeviceClient::new(&port, args.baud)?;
    device.clear_buffer()?;

    let mut log = match &args.log {
        Some(path) => Some(PositionLog::append(path)?),
        None => None,
    };

    let mut fixes = 0u32;
    while args.count.map_or(true, |count| fixes < count) {
        let Some(report) = device.next_report(SILENCE_TIMEOUT)? else {
            anyhow::bail!("No report for {} s", SILENCE_TIMEOUT.as_secs());
        };

        print_report(&report);

        if let Report::Position { x, y, .. } = report {
            fixes += 1;
            if let Some(log) = log.as_mut() {
                log.record(x, y)?;
            }
        }
    }

    if device.bad_frames() > 0 {
        println!("{} {} bad frames", "Warning:".yellow().bold(), device.bad_frames());
    }

    Ok(())
}

fn print_report(report: &Report) {
    match report {
        Report::Version {
            major,
            minor,
            patch,
        } => println!("{} {}.{}.{}", "Firmware".bold(), major, minor, patch),
        Report::Range {
            anchor,
            sequence,
            distance_m,
        } => println!("  {} #{:<3} {:>8.3} m", anchor, sequence, distance_m),
        Report::RangeFailed { anchor, reason } => {
            println!("  {} {}", anchor, reason.to_string().yellow())
        }
        Report::Position { x, y, residual } => println!(
            "{} x={:.3} y={:.3} (rms {:.3} m)",
            "FIX".green().bold(),
            x,
            y,
            residual
        ),
        Report::Degenerate => println!("{}", "No fix: degenerate anchor geometry".red()),
    }
}
