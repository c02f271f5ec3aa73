//! UWB transceiver trait for abstraction and testability
//!
//! This is the whole surface the ranging code needs from a DW3000-class
//! driver: immediate or delayed transmit, timestamped receive, and two
//! register reads. Device bring-up, SPI transport and antenna calibration
//! stay behind the implementation.

use crate::config::frame::MAX_FRAME_LEN;
use crate::ranging::timestamp::DelayedTxTime;
use core::fmt;
use core::future::Future;
use heapless::Vec;

/// Errors reported by the transceiver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RadioError {
    /// Nothing received before the receive timeout
    Timeout,
    /// Frame received with a PHY header, FCS or sync error
    FrameError,
    /// Delayed transmission requested for a time that has already passed
    TooLate,
    /// Transmission failed for another reason
    TransmitFailed,
    /// SPI communication error
    SpiError,
}

impl fmt::Display for RadioError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RadioError::Timeout => f.write_str("receive timeout"),
            RadioError::FrameError => f.write_str("frame error"),
            RadioError::TooLate => f.write_str("delayed transmit too late"),
            RadioError::TransmitFailed => f.write_str("transmit failed"),
            RadioError::SpiError => f.write_str("SPI error"),
        }
    }
}

/// When a frame goes on air
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxSchedule {
    /// As soon as possible
    Immediate,
    /// At a precomputed device time
    At(DelayedTxTime),
}

/// Receiver window armed automatically after a transmit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseWindow {
    /// Delay from end of TX to enabling RX (uus)
    pub rx_after_tx_delay_uus: u32,
    /// Receive timeout once enabled (uus)
    pub rx_timeout_uus: u32,
}

/// Received frame with its RX timestamp
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RxFrame {
    /// Frame bytes as read from the RX buffer, FCS included
    pub data: Vec<u8, MAX_FRAME_LEN>,
    /// 40-bit RX timestamp in device time units
    pub rx_timestamp: u64,
}

/// Abstract UWB transceiver
pub trait UwbRadio {
    /// Transmit `frame`; the radio appends the FCS.
    ///
    /// With a `response` window the receiver is enabled after the transmit so
    /// the next [`UwbRadio::receive`] picks up the reply. A delayed transmit
    /// whose time has passed fails with [`RadioError::TooLate`] and nothing
    /// is sent.
    fn transmit(
        &mut self,
        frame: &[u8],
        schedule: TxSchedule,
        response: Option<ResponseWindow>,
    ) -> impl Future<Output = Result<(), RadioError>>;

    /// Wait for a frame. `None` waits indefinitely.
    fn receive(&mut self, timeout_uus: Option<u32>) -> impl Future<Output = Result<RxFrame, RadioError>>;

    /// 40-bit timestamp of the last transmitted frame
    fn read_tx_timestamp(&mut self) -> u64;

    /// Clock offset of the remote transmitter relative to ours, as a ratio
    fn read_clock_offset_ratio(&mut self) -> f32;
}
