//! Tag-side ranging state machine
//!
//! ```text
//! Idle --start_round--> AwaitingResponse(anchor) --response/timeout/error--> Idle
//! ```
//!
//! The anchor index advances after every round, successful or not, so one
//! silent anchor cannot stall the others. Closing a round with A3 completes a
//! cycle, after which the solver runs if all three distances are positive.

use crate::protocol::{
    decode_for, encode_poll, AnchorId, CodecError, Frame, RangingMessage, Role,
};
use crate::radio::ResponseWindow;
use crate::ranging::settings::RangingConfig;
use crate::ranging::timestamp::{distance, time_of_flight, truncate};
use crate::ranging::{solve_distances, Fix, Range, RangingError, RangingRound, RoundOutcome};
use crate::solver::SolverError;

/// Initiator states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitiatorState {
    Idle,
    AwaitingResponse { anchor: AnchorId },
}

/// Transmission requested by [`Initiator::start_round`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollRequest {
    pub anchor: AnchorId,
    /// Encoded poll, to be sent immediately
    pub frame: Frame,
    /// Receiver window to arm after the poll
    pub window: ResponseWindow,
}

/// SS-TWR initiator cycling over the three anchors
pub struct Initiator {
    config: RangingConfig,
    state: InitiatorState,
    next_anchor: AnchorId,
    rounds: [RangingRound; AnchorId::COUNT],
    /// Low 32 bits of the current poll's TX timestamp
    poll_tx_ts: Option<u32>,
}

impl Initiator {
    pub fn new(config: RangingConfig) -> Self {
        Self {
            config,
            state: InitiatorState::Idle,
            next_anchor: AnchorId::A1,
            rounds: [RangingRound::new(); AnchorId::COUNT],
            poll_tx_ts: None,
        }
    }

    pub fn state(&self) -> InitiatorState {
        self.state
    }

    pub fn config(&self) -> &RangingConfig {
        &self.config
    }

    /// Anchor the next call to [`Initiator::start_next_round`] will poll
    pub fn next_anchor(&self) -> AnchorId {
        self.next_anchor
    }

    pub fn round(&self, anchor: AnchorId) -> &RangingRound {
        &self.rounds[anchor.index()]
    }

    /// Last measured distance per anchor
    pub fn distances(&self) -> [f64; AnchorId::COUNT] {
        self.rounds.map(|r| r.distance)
    }

    /// Build the poll for `anchor` and wait for its response
    pub fn start_round(&mut self, anchor: AnchorId) -> Result<PollRequest, RangingError> {
        if self.state != InitiatorState::Idle {
            return Err(RangingError::InvalidState);
        }

        let sequence = self.rounds[anchor.index()].sequence;
        log::debug!("Polling {} seq={}", anchor, sequence);

        self.next_anchor = anchor;
        self.poll_tx_ts = None;
        self.state = InitiatorState::AwaitingResponse { anchor };

        Ok(PollRequest {
            anchor,
            frame: encode_poll(anchor, sequence),
            window: ResponseWindow {
                rx_after_tx_delay_uus: self.config.poll_tx_to_resp_rx_dly_uus,
                rx_timeout_uus: self.config.resp_rx_timeout_uus,
            },
        })
    }

    /// Start the round for the next anchor in the cycle
    pub fn start_next_round(&mut self) -> Result<PollRequest, RangingError> {
        self.start_round(self.next_anchor)
    }

    /// Record the poll's 40-bit TX timestamp once it has left the antenna
    pub fn on_poll_sent(&mut self, tx_ts: u64) {
        if matches!(self.state, InitiatorState::AwaitingResponse { .. }) {
            self.poll_tx_ts = Some(truncate(tx_ts));
        }
    }

    /// Handle a received frame.
    ///
    /// A response from the polled anchor completes the round. Anything else
    /// is rejected with an error and the round keeps waiting.
    pub fn on_frame_received(
        &mut self,
        frame: &[u8],
        rx_ts: u64,
        clock_offset_ratio: f32,
    ) -> Result<RoundOutcome, RangingError> {
        let InitiatorState::AwaitingResponse { anchor } = self.state else {
            return Err(RangingError::InvalidState);
        };

        let (poll_rx_ts, resp_tx_ts) = match decode_for(Role::Initiator, frame)? {
            RangingMessage::Response {
                anchor: from,
                poll_rx_ts,
                resp_tx_ts,
                ..
            } if from == anchor => (poll_rx_ts, resp_tx_ts),
            other => {
                log::debug!("Ignoring frame from {} while awaiting {}", other.anchor(), anchor);
                return Err(RangingError::Codec(CodecError::UnrecognizedFrame));
            }
        };

        let poll_tx_ts = self.poll_tx_ts.ok_or(RangingError::InvalidState)?;
        let tof_s = time_of_flight(
            poll_tx_ts,
            truncate(rx_ts),
            poll_rx_ts,
            resp_tx_ts,
            clock_offset_ratio,
        );

        let round = &mut self.rounds[anchor.index()];
        let range = Range {
            anchor,
            sequence: round.sequence,
            tof_s,
            distance_m: distance(tof_s),
        };
        round.distance = range.distance_m;
        round.sequence = round.sequence.wrapping_add(1);

        log::info!("{} distance={:.3} m", anchor, range.distance_m);
        Ok(self.finish(anchor, Ok(range)))
    }

    /// No response arrived within the window
    pub fn on_timeout(&mut self) -> Option<RoundOutcome> {
        self.on_error(RangingError::Timeout)
    }

    /// Abandon the current round with `error`
    pub fn on_error(&mut self, error: RangingError) -> Option<RoundOutcome> {
        let InitiatorState::AwaitingResponse { anchor } = self.state else {
            return None;
        };

        log::warn!("{} round abandoned: {}", anchor, error);
        Some(self.finish(anchor, Err(error)))
    }

    /// Solve from the stored distances, `None` until all three are positive
    pub fn solve(&self) -> Option<Result<Fix, SolverError>> {
        solve_distances(self.config.method, &self.config.layout, &self.distances())
    }

    fn finish(&mut self, anchor: AnchorId, result: Result<Range, RangingError>) -> RoundOutcome {
        self.state = InitiatorState::Idle;
        self.poll_tx_ts = None;
        self.next_anchor = anchor.next();

        let fix = if self.next_anchor == AnchorId::A1 {
            self.solve()
        } else {
            None
        };

        RoundOutcome { anchor, result, fix }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::dw3000::{DWT_TIME_UNITS, SPEED_OF_LIGHT};
    use crate::protocol::{encode_poll, encode_response};
    use crate::solver::AnchorLayout;

    const POLL_TX: u64 = 0x10_0000_0000;

    /// Response frame reporting a reply delay of `rtd_resp` and a one-way
    /// flight time of `tof_units`; returns the frame and its RX timestamp
    fn response(anchor: AnchorId, sequence: u8, tof_units: u32) -> (Frame, u64) {
        let poll_rx = 5_000u32;
        let rtd_resp = 40_000u32;
        let frame = encode_response(anchor, sequence, poll_rx, poll_rx + rtd_resp);
        (frame, POLL_TX + (rtd_resp + 2 * tof_units) as u64)
    }

    fn complete_round(initiator: &mut Initiator, tof_units: u32) -> RoundOutcome {
        let request = initiator.start_next_round().unwrap();
        initiator.on_poll_sent(POLL_TX);
        let sequence = initiator.round(request.anchor).sequence;
        let (frame, rx_ts) = response(request.anchor, sequence, tof_units);
        initiator.on_frame_received(&frame, rx_ts, 0.0).unwrap()
    }

    #[test]
    fn test_start_round_builds_poll() {
        let mut initiator = Initiator::new(RangingConfig::default());
        let request = initiator.start_round(AnchorId::A2).unwrap();

        assert_eq!(request.anchor, AnchorId::A2);
        assert_eq!(request.frame, encode_poll(AnchorId::A2, 0));
        assert_eq!(request.window.rx_after_tx_delay_uus, 240);
        assert_eq!(request.window.rx_timeout_uus, 400);
        assert_eq!(
            initiator.state(),
            InitiatorState::AwaitingResponse { anchor: AnchorId::A2 }
        );
    }

    #[test]
    fn test_start_round_while_busy_rejected() {
        let mut initiator = Initiator::new(RangingConfig::default());
        initiator.start_round(AnchorId::A1).unwrap();
        assert_eq!(
            initiator.start_round(AnchorId::A2),
            Err(RangingError::InvalidState)
        );
    }

    #[test]
    fn test_response_yields_distance() {
        let mut initiator = Initiator::new(RangingConfig::default());
        let outcome = complete_round(&mut initiator, 100);

        let range = outcome.result.unwrap();
        let expected = 100.0 * DWT_TIME_UNITS * SPEED_OF_LIGHT;
        assert_eq!(range.anchor, AnchorId::A1);
        assert_eq!(range.sequence, 0);
        assert!((range.distance_m - expected).abs() < 1e-9);
        assert_eq!(initiator.round(AnchorId::A1).distance, range.distance_m);
        assert_eq!(initiator.round(AnchorId::A1).sequence, 1);
        assert_eq!(initiator.state(), InitiatorState::Idle);
        assert!(outcome.fix.is_none());
    }

    #[test]
    fn test_round_robin_order() {
        let mut initiator = Initiator::new(RangingConfig::default());
        let mut polled = heapless::Vec::<AnchorId, 4>::new();

        for _ in 0..3 {
            let outcome = complete_round(&mut initiator, 100);
            assert!(outcome.result.is_ok());
            polled.push(outcome.anchor).unwrap();
        }

        assert_eq!(polled.as_slice(), &[AnchorId::A1, AnchorId::A2, AnchorId::A3]);
        assert_eq!(initiator.next_anchor(), AnchorId::A1);
    }

    #[test]
    fn test_stray_frames_keep_round_open() {
        let mut initiator = Initiator::new(RangingConfig::default());
        initiator.start_round(AnchorId::A1).unwrap();
        initiator.on_poll_sent(POLL_TX);

        // Response from the wrong anchor
        let (frame, rx_ts) = response(AnchorId::A2, 0, 100);
        assert_eq!(
            initiator.on_frame_received(&frame, rx_ts, 0.0),
            Err(RangingError::Codec(CodecError::UnrecognizedFrame))
        );

        // A poll is not a response
        let poll = encode_poll(AnchorId::A1, 0);
        assert_eq!(
            initiator.on_frame_received(&poll, rx_ts, 0.0),
            Err(RangingError::Codec(CodecError::UnrecognizedFrame))
        );

        // Too short to be anything
        assert_eq!(
            initiator.on_frame_received(&[0x41, 0x88], rx_ts, 0.0),
            Err(RangingError::Codec(CodecError::Truncated))
        );

        assert_eq!(
            initiator.state(),
            InitiatorState::AwaitingResponse { anchor: AnchorId::A1 }
        );

        let (frame, rx_ts) = response(AnchorId::A1, 0, 100);
        assert!(initiator.on_frame_received(&frame, rx_ts, 0.0).is_ok());
    }

    #[test]
    fn test_sequence_not_validated() {
        let mut initiator = Initiator::new(RangingConfig::default());
        initiator.start_round(AnchorId::A1).unwrap();
        initiator.on_poll_sent(POLL_TX);

        let (frame, rx_ts) = response(AnchorId::A1, 0x7F, 100);
        assert!(initiator.on_frame_received(&frame, rx_ts, 0.0).is_ok());
    }

    #[test]
    fn test_frame_while_idle_rejected() {
        let mut initiator = Initiator::new(RangingConfig::default());
        let (frame, rx_ts) = response(AnchorId::A1, 0, 100);
        assert_eq!(
            initiator.on_frame_received(&frame, rx_ts, 0.0),
            Err(RangingError::InvalidState)
        );
    }

    #[test]
    fn test_timeout_advances_anchor() {
        let mut initiator = Initiator::new(RangingConfig::default());
        initiator.start_round(AnchorId::A1).unwrap();

        let outcome = initiator.on_timeout().unwrap();
        assert_eq!(outcome.anchor, AnchorId::A1);
        assert_eq!(outcome.result, Err(RangingError::Timeout));
        assert_eq!(initiator.state(), InitiatorState::Idle);
        assert_eq!(initiator.next_anchor(), AnchorId::A2);
        assert_eq!(initiator.round(AnchorId::A1).sequence, 0);

        assert!(initiator.on_timeout().is_none());
    }

    #[test]
    fn test_cycle_produces_fix() {
        let config = RangingConfig {
            layout: AnchorLayout::from_table([(0.0, 0.0), (4.0, 0.0), (0.0, 3.0)]),
            ..RangingConfig::default()
        };
        let mut initiator = Initiator::new(config);

        let metre = 1.0 / (DWT_TIME_UNITS * SPEED_OF_LIGHT);
        let mut last = None;
        for d in [2.0f64.sqrt(), 10.0f64.sqrt(), 5.0f64.sqrt()] {
            last = Some(complete_round(&mut initiator, (d * metre).round() as u32));
        }

        let fix = last.unwrap().fix.unwrap().unwrap();
        // One device time unit is about 4.7 mm
        assert!((fix.position.x - 1.0).abs() < 0.02);
        assert!((fix.position.y - 1.0).abs() < 0.02);
    }

    #[test]
    fn test_failed_cycle_withholds_fix() {
        let mut initiator = Initiator::new(RangingConfig::default());
        complete_round(&mut initiator, 100);
        complete_round(&mut initiator, 100);
        initiator.start_next_round().unwrap();

        let outcome = initiator.on_timeout().unwrap();
        assert_eq!(outcome.anchor, AnchorId::A3);
        assert!(outcome.fix.is_none());
    }

    #[test]
    fn test_sequence_wraps() {
        let mut initiator = Initiator::new(RangingConfig::default());
        initiator.rounds[0].sequence = 255;
        complete_round(&mut initiator, 100);
        assert_eq!(initiator.round(AnchorId::A1).sequence, 0);
    }
}
