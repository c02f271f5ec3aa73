//! Deployment constants for the DW3000-based tag and anchors

/// DW3000 device-time constants
pub mod dw3000 {
    /// UWB microsecond (uus) to device time unit conversion factor.
    /// 1 uus = 512 / 499.2 us, 1 us = 499.2 * 128 dtu.
    pub const UUS_TO_DWT_TIME: u64 = 63898;

    /// Duration of one device time unit in seconds (1 / 499.2 MHz / 128)
    pub const DWT_TIME_UNITS: f64 = 1.0 / 499.2e6 / 128.0;

    /// Speed of radio waves in air (m/s)
    pub const SPEED_OF_LIGHT: f64 = 299_702_547.0;

    /// System timestamps are 40 bits wide
    pub const TIMESTAMP_MASK: u64 = 0xFF_FFFF_FFFF;

    /// Delayed TX/RX times are programmed with the low 9 bits ignored
    pub const DELAYED_TX_RESOLUTION_MASK: u64 = 0x1FF;

    /// Default TX antenna delay for 64 MHz PRF, in device time units
    pub const TX_ANT_DLY: u16 = 16385;

    /// Clock offset register values are scaled by 2^26
    pub const CLOCK_OFFSET_SCALE: f32 = (1u32 << 26) as f32;
}

/// Ranging exchange timing, in UWB microseconds unless noted
pub mod timing {
    /// Delay from poll TX to enabling RX for the response (initiator)
    pub const POLL_TX_TO_RESP_RX_DLY_UUS: u32 = 240;

    /// Response receive timeout (initiator), long enough for the whole frame at 6.8 Mbps
    pub const RESP_RX_TIMEOUT_UUS: u32 = 400;

    /// Delay from poll RX to response TX (responder turnaround)
    pub const POLL_RX_TO_RESP_TX_DLY_UUS: u32 = 650;

    /// How long the responder listens for the tag's distance update
    pub const DISTANCE_UPDATE_RX_TIMEOUT_UUS: u32 = 2000;

    /// Pause between ranging exchanges on the tag (milliseconds)
    pub const RNG_DELAY_MS: u64 = 1000;

    /// Stray frames tolerated while awaiting one response before giving up
    pub const MAX_STRAY_FRAMES: u8 = 4;
}

/// Fixed anchor positions in metres, indexed A1, A2, A3
pub mod layout {
    /// Anchor positions as surveyed for the tag
    pub const TAG_ANCHORS: [(f64, f64); 3] = [(2.0, 1.0), (3.0, 6.0), (7.0, 4.0)];

    /// Anchor positions as used by the anchor-side solver
    pub const ANCHOR_SIDE_ANCHORS: [(f64, f64); 3] = [(10.0, 10.0), (10.0, 5.0), (5.0, 10.0)];
}

/// Ranging frame constants (IEEE 802.15.4 data frames, 16-bit addressing)
pub mod frame {
    /// Frame control 0x8841: data frame, PAN id compression, short addresses
    pub const FRAME_CONTROL: u16 = 0x8841;

    /// PAN identifier shared by all devices
    pub const PAN_ID: u16 = 0xDECA;

    /// Function code of a poll
    pub const FUNC_CODE_POLL: u8 = 0xE0;

    /// Function code of a response
    pub const FUNC_CODE_RESPONSE: u8 = 0xE1;

    /// Length of the FCS appended by the radio
    pub const FCS_LEN: usize = 2;

    /// Largest frame the ranging code builds or accepts
    pub const MAX_FRAME_LEN: usize = 32;

    /// Largest auxiliary distance-update frame the responder accepts, FCS included
    pub const DISTANCE_UPDATE_RX_LEN: usize = 16;
}

/// Telemetry link to the host
pub mod telemetry {
    /// Frame delimiter for COBS encoding
    pub const FRAME_DELIMITER: u8 = 0x00;

    /// Maximum frame size
    pub const MAX_FRAME_SIZE: usize = 64;

    /// Protocol version (increment when report format changes)
    pub const PROTOCOL_VERSION: u8 = 1;

    /// Serial baud rate of the telemetry port
    pub const BAUD_RATE: u32 = 115200;

    /// Firmware version
    pub const VERSION_MAJOR: u8 = 0;
    pub const VERSION_MINOR: u8 = 1;
    pub const VERSION_PATCH: u8 = 0;
}
