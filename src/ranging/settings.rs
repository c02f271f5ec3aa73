//! Runtime ranging configuration

use core::fmt;

use crate::config::{dw3000, timing};
use crate::solver::{AnchorLayout, Method};

/// Errors found while validating a [`RangingConfig`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// A receive timeout of zero would never see a frame
    ZeroTimeout,
    /// Responder replies before the initiator has enabled its receiver
    TurnaroundTooShort,
    /// An anchor coordinate is NaN or infinite
    NonFiniteLayout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroTimeout => f.write_str("receive timeout must be non-zero"),
            ConfigError::TurnaroundTooShort => {
                f.write_str("responder turnaround shorter than initiator RX delay")
            }
            ConfigError::NonFiniteLayout => f.write_str("anchor layout is not finite"),
        }
    }
}

/// Timing and solver parameters shared by both roles
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RangingConfig {
    /// Delay from poll TX to enabling RX for the response (uus)
    pub poll_tx_to_resp_rx_dly_uus: u32,
    /// Response receive timeout (uus)
    pub resp_rx_timeout_uus: u32,
    /// Responder turnaround from poll RX to response TX (uus)
    pub poll_rx_to_resp_tx_dly_uus: u32,
    /// TX antenna delay added to predicted transmit timestamps
    pub tx_antenna_delay: u16,
    /// How long an anchor waits for the tag's distance update (uus)
    pub distance_update_timeout_uus: u32,
    /// Tag sends each measured distance back to the anchor
    pub share_distances: bool,
    /// Stray frames tolerated while awaiting one response
    pub max_stray_frames: u8,
    /// Trilateration algorithm
    pub method: Method,
    /// Anchor positions used when solving
    pub layout: AnchorLayout,
}

impl Default for RangingConfig {
    fn default() -> Self {
        Self {
            poll_tx_to_resp_rx_dly_uus: timing::POLL_TX_TO_RESP_RX_DLY_UUS,
            resp_rx_timeout_uus: timing::RESP_RX_TIMEOUT_UUS,
            poll_rx_to_resp_tx_dly_uus: timing::POLL_RX_TO_RESP_TX_DLY_UUS,
            tx_antenna_delay: dw3000::TX_ANT_DLY,
            distance_update_timeout_uus: timing::DISTANCE_UPDATE_RX_TIMEOUT_UUS,
            share_distances: true,
            max_stray_frames: timing::MAX_STRAY_FRAMES,
            method: Method::default(),
            layout: AnchorLayout::tag(),
        }
    }
}

impl RangingConfig {
    /// Defaults with the anchor-side layout
    pub fn anchor() -> Self {
        Self {
            layout: AnchorLayout::anchor_side(),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.resp_rx_timeout_uus == 0 || self.distance_update_timeout_uus == 0 {
            return Err(ConfigError::ZeroTimeout);
        }

        if self.poll_rx_to_resp_tx_dly_uus <= self.poll_tx_to_resp_rx_dly_uus {
            return Err(ConfigError::TurnaroundTooShort);
        }

        if !self.layout.is_finite() {
            return Err(ConfigError::NonFiniteLayout);
        }

        Ok(())
    }
}
