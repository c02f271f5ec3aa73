//! Ranging tasks for the tag and the anchors
//!
//! Both tasks are generic over [`UwbRadio`] so the board crate can hand in its
//! DW3000 driver. Reports go out on [`REPORT_CHANNEL`] without blocking; when
//! the host link falls behind, reports are dropped rather than delaying a
//! ranging round.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::{Channel, Receiver, Sender};
use embassy_time::{Duration, Timer};

use crate::config::telemetry::{VERSION_MAJOR, VERSION_MINOR, VERSION_PATCH};
use crate::config::timing::RNG_DELAY_MS;
use crate::protocol::AnchorId;
use crate::radio::UwbRadio;
use crate::ranging::{RangingConfig, RangingError};
use crate::session::{InitiatorSession, ResponderSession};
use crate::telemetry::Report;

/// Channel capacity for outgoing reports
const REPORT_CHANNEL_SIZE: usize = 8;

/// Type alias for the report channel sender
pub type ReportSender = Sender<'static, CriticalSectionRawMutex, Report, REPORT_CHANNEL_SIZE>;

/// Type alias for the report channel receiver
pub type ReportReceiver = Receiver<'static, CriticalSectionRawMutex, Report, REPORT_CHANNEL_SIZE>;

/// Reports from the ranging task to the telemetry writer
pub static REPORT_CHANNEL: Channel<CriticalSectionRawMutex, Report, REPORT_CHANNEL_SIZE> =
    Channel::new();

fn publish(reports: &ReportSender, report: Report) {
    if reports.try_send(report).is_err() {
        log::debug!("Report channel full, dropping {:?}", report.id());
    }
}

/// Tag task: poll A1, A2, A3 in turn, one round every [`RNG_DELAY_MS`]
pub async fn tag_task<R: UwbRadio>(mut radio: R, config: RangingConfig, reports: ReportSender) {
    if let Err(e) = config.validate() {
        log::error!("Tag: invalid ranging config: {}", e);
        return;
    }

    publish(
        &reports,
        Report::Version {
            major: VERSION_MAJOR,
            minor: VERSION_MINOR,
            patch: VERSION_PATCH,
        },
    );

    let mut session = InitiatorSession::new(config);
    log::info!("Tag: ranging started");

    loop {
        match session.run_round(&mut radio).await {
            Ok(outcome) => {
                for report in Report::from_outcome(&outcome) {
                    publish(&reports, report);
                }
            }
            Err(e) => log::warn!("Tag: round not started: {}", e),
        }

        Timer::after(Duration::from_millis(RNG_DELAY_MS)).await;
    }
}

/// Anchor task: answer polls for the `served` identities forever
pub async fn anchor_task<R: UwbRadio>(
    mut radio: R,
    config: RangingConfig,
    served: &'static [AnchorId],
    reports: ReportSender,
) {
    if let Err(e) = config.validate() {
        log::error!("Anchor: invalid ranging config: {}", e);
        return;
    }

    let mut session = ResponderSession::new(config, served);
    log::info!("Anchor: serving {} identities", served.len());

    loop {
        match session.serve_once(&mut radio).await {
            Ok(result) => {
                if let Some(report) = result.fix.and_then(Report::from_fix) {
                    publish(&reports, report);
                }
            }
            Err(RangingError::Codec(_)) => {
                // Someone else's frame
            }
            Err(e) => log::debug!("Anchor: poll not served: {}", e),
        }
    }
}
