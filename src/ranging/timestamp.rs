//! Device-time arithmetic for single-sided two-way ranging
//!
//! ```text
//! Initiator: |Poll TX| ..... |Resp RX|
//! Responder: |Poll RX| ..... |Resp TX|
//!
//! rtd_init = resp_rx - poll_tx
//! rtd_resp = resp_tx - poll_rx
//! tof      = (rtd_init - rtd_resp * (1 - clock_offset_ratio)) / 2
//! ```
//!
//! Timestamps are 40-bit device times but only their low 32 bits travel in
//! frames. Both round-trip delays stay far below 2^32 units (about 67 ms), so a
//! wrapping 32-bit subtraction always yields the true delay.

use crate::config::dw3000::{
    CLOCK_OFFSET_SCALE, DELAYED_TX_RESOLUTION_MASK, DWT_TIME_UNITS, SPEED_OF_LIGHT,
    TIMESTAMP_MASK, UUS_TO_DWT_TIME,
};

/// Keep the low 32 bits of a 40-bit timestamp
pub const fn truncate(timestamp: u64) -> u32 {
    timestamp as u32
}

/// Device time units from `start` to `end`, correct across a 32-bit wrap
pub const fn elapsed(start: u32, end: u32) -> u32 {
    end.wrapping_sub(start)
}

/// UWB microseconds left at `now` in a window of `window_uus` opened at `start`.
///
/// `None` once the window has closed, including a `now` that reads as before
/// `start`.
pub fn remaining_uus(start: u64, window_uus: u32, now: u64) -> Option<u32> {
    let window = window_uus as u64 * UUS_TO_DWT_TIME;
    let spent = elapsed(truncate(start), truncate(now)) as u64;
    let left = window.checked_sub(spent)? / UUS_TO_DWT_TIME;
    (left > 0).then_some(left as u32)
}

/// A transmit time quantized to the delayed-TX register granularity (512 units)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DelayedTxTime {
    device_time: u64,
}

impl DelayedTxTime {
    /// 40-bit device time at which the frame leaves, low 9 bits always zero
    pub const fn device_time(self) -> u64 {
        self.device_time
    }

    /// Value for the 32-bit delayed TX register (device time bits 39..8)
    pub const fn programmed_time(self) -> u32 {
        (self.device_time >> 8) as u32
    }

    /// Timestamp the radio will report for this transmission.
    ///
    /// The TX timestamp is taken at the antenna, so it is the programmed time
    /// plus the TX antenna delay.
    pub const fn predicted_tx_timestamp(self, tx_antenna_delay: u16) -> u64 {
        self.device_time + tx_antenna_delay as u64
    }
}

/// Schedule a response `response_delay_uus` after `rx_ts`
pub fn quantize_delayed_tx(rx_ts: u64, response_delay_uus: u32) -> DelayedTxTime {
    let target = rx_ts.wrapping_add(response_delay_uus as u64 * UUS_TO_DWT_TIME) & TIMESTAMP_MASK;
    DelayedTxTime {
        device_time: target & !DELAYED_TX_RESOLUTION_MASK,
    }
}

/// Time of flight in seconds from the four exchange timestamps.
///
/// `clock_offset_ratio` is the responder's clock offset relative to ours as
/// reported by the radio; it scales the responder's reply delay into local
/// time before subtracting.
pub fn time_of_flight(
    poll_tx_ts: u32,
    resp_rx_ts: u32,
    poll_rx_ts: u32,
    resp_tx_ts: u32,
    clock_offset_ratio: f32,
) -> f64 {
    let rtd_init = elapsed(poll_tx_ts, resp_rx_ts) as f64;
    let rtd_resp = elapsed(poll_rx_ts, resp_tx_ts) as f64;

    (rtd_init - rtd_resp * (1.0 - clock_offset_ratio as f64)) / 2.0 * DWT_TIME_UNITS
}

/// Distance in metres covered in `tof` seconds
pub fn distance(tof: f64) -> f64 {
    tof * SPEED_OF_LIGHT
}

/// Convert the radio's raw carrier-integrator reading to a clock offset ratio
pub fn clock_offset_ratio(raw: i32) -> f32 {
    raw as f32 / CLOCK_OFFSET_SCALE
}
