//! Anchor-side ranging state machine
//!
//! ```text
//! WaitingPoll --poll--> RespondingDelayed --tx done--> WaitingAck --update/timeout--> WaitingPoll
//!                               |
//!                               +--tx too late--> WaitingPoll
//! ```
//!
//! `WaitingAck` listens for the tag's optional distance update. The responder
//! keeps one distance per anchor identity and solves once all three are known.

use crate::protocol::{
    decode_for, encode_response, parse_distance_update, AnchorId, CodecError, Frame,
    RangingMessage, Role,
};
use crate::ranging::settings::RangingConfig;
use crate::ranging::timestamp::{quantize_delayed_tx, truncate, DelayedTxTime};
use crate::ranging::{solve_distances, Fix, RangingError};
use crate::solver::SolverError;

/// Responder states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponderState {
    WaitingPoll,
    /// Delayed response requested, waiting for TX complete
    RespondingDelayed { anchor: AnchorId },
    /// Response sent, listening for the tag's distance update
    WaitingAck { anchor: AnchorId },
}

/// Delayed transmission requested by [`Responder::on_poll_received`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DelayedResponse {
    pub anchor: AnchorId,
    pub frame: Frame,
    /// When the response must leave the antenna
    pub tx_time: DelayedTxTime,
}

/// SS-TWR responder answering polls for one or more anchor identities
pub struct Responder {
    config: RangingConfig,
    state: ResponderState,
    served: [bool; AnchorId::COUNT],
    sequences: [u8; AnchorId::COUNT],
    distances: [f64; AnchorId::COUNT],
}

impl Responder {
    /// Responder answering polls addressed to any of `served`
    pub fn new(config: RangingConfig, served: &[AnchorId]) -> Self {
        let mut flags = [false; AnchorId::COUNT];
        for anchor in served {
            flags[anchor.index()] = true;
        }

        Self {
            config,
            state: ResponderState::WaitingPoll,
            served: flags,
            sequences: [0; AnchorId::COUNT],
            distances: [0.0; AnchorId::COUNT],
        }
    }

    pub fn state(&self) -> ResponderState {
        self.state
    }

    pub fn config(&self) -> &RangingConfig {
        &self.config
    }

    pub fn serves(&self, anchor: AnchorId) -> bool {
        self.served[anchor.index()]
    }

    /// Sequence number of the next response for `anchor`
    pub fn sequence(&self, anchor: AnchorId) -> u8 {
        self.sequences[anchor.index()]
    }

    /// Last distance reported by the tag for `anchor`
    pub fn distance(&self, anchor: AnchorId) -> f64 {
        self.distances[anchor.index()]
    }

    /// Handle a poll received at `poll_rx_ts` and build the delayed response
    pub fn on_poll_received(
        &mut self,
        frame: &[u8],
        poll_rx_ts: u64,
    ) -> Result<DelayedResponse, RangingError> {
        if self.state != ResponderState::WaitingPoll {
            return Err(RangingError::InvalidState);
        }

        let anchor = match decode_for(Role::Responder, frame)? {
            RangingMessage::Poll { anchor, .. } if self.serves(anchor) => anchor,
            _ => return Err(RangingError::Codec(CodecError::UnrecognizedFrame)),
        };

        let tx_time = quantize_delayed_tx(poll_rx_ts, self.config.poll_rx_to_resp_tx_dly_uus);
        let resp_tx_ts = tx_time.predicted_tx_timestamp(self.config.tx_antenna_delay);
        let frame = encode_response(
            anchor,
            self.sequences[anchor.index()],
            truncate(poll_rx_ts),
            truncate(resp_tx_ts),
        );

        log::debug!("Poll for {}, responding at {:#x}", anchor, tx_time.device_time());
        self.state = ResponderState::RespondingDelayed { anchor };

        Ok(DelayedResponse {
            anchor,
            frame,
            tx_time,
        })
    }

    /// The delayed response went out; listen for a distance update
    pub fn on_tx_complete(&mut self) -> Result<(), RangingError> {
        let ResponderState::RespondingDelayed { anchor } = self.state else {
            return Err(RangingError::InvalidState);
        };

        let sequence = &mut self.sequences[anchor.index()];
        *sequence = sequence.wrapping_add(1);
        self.state = ResponderState::WaitingAck { anchor };
        Ok(())
    }

    /// The radio refused the delayed transmit because its time had passed
    pub fn on_tx_rejected(&mut self) -> RangingError {
        if let ResponderState::RespondingDelayed { anchor } = self.state {
            log::warn!("{} response scheduled too late, abandoning", anchor);
        }
        self.state = ResponderState::WaitingPoll;
        RangingError::LateSchedule
    }

    /// Handle the tag's distance update.
    ///
    /// Malformed updates are dropped. Returns a fix when the update completes
    /// a set of three positive distances.
    pub fn on_distance_update(&mut self, frame: &[u8]) -> Option<Result<Fix, SolverError>> {
        let ResponderState::WaitingAck { anchor } = self.state else {
            return None;
        };
        self.state = ResponderState::WaitingPoll;

        let Some(distance) = parse_distance_update(frame) else {
            log::debug!("Dropping malformed distance update for {}", anchor);
            return None;
        };

        log::info!("{} distance update {:.3} m", anchor, distance);
        self.distances[anchor.index()] = distance;
        solve_distances(self.config.method, &self.config.layout, &self.distances)
    }

    /// Receive window expired
    pub fn on_timeout(&mut self) {
        self.state = ResponderState::WaitingPoll;
    }

    /// Radio error while in any state
    pub fn on_error(&mut self, error: RangingError) {
        log::debug!("Responder reset after {}", error);
        self.state = ResponderState::WaitingPoll;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{decode, encode_distance_update, encode_poll};
    use crate::ranging::timestamp::elapsed;
    use crate::solver::AnchorLayout;

    const POLL_RX: u64 = 0x01_2345_6789;

    fn all_anchors() -> Responder {
        Responder::new(RangingConfig::anchor(), &AnchorId::ALL)
    }

    fn with_fcs(body: &[u8]) -> heapless::Vec<u8, 32> {
        let mut frame = heapless::Vec::new();
        frame.extend_from_slice(body).unwrap();
        frame.extend_from_slice(&[0x00, 0x00]).unwrap();
        frame
    }

    fn respond(responder: &mut Responder, anchor: AnchorId) -> DelayedResponse {
        let response = responder
            .on_poll_received(&with_fcs(&encode_poll(anchor, 9)), POLL_RX)
            .unwrap();
        responder.on_tx_complete().unwrap();
        response
    }

    #[test]
    fn test_poll_builds_delayed_response() {
        let mut responder = all_anchors();
        let response = responder
            .on_poll_received(&encode_poll(AnchorId::A2, 5), POLL_RX)
            .unwrap();

        assert_eq!(response.anchor, AnchorId::A2);
        assert_eq!(response.tx_time, quantize_delayed_tx(POLL_RX, 650));
        assert_eq!(
            responder.state(),
            ResponderState::RespondingDelayed { anchor: AnchorId::A2 }
        );

        match decode(&response.frame).unwrap() {
            RangingMessage::Response {
                anchor,
                sequence,
                poll_rx_ts,
                resp_tx_ts,
            } => {
                assert_eq!(anchor, AnchorId::A2);
                assert_eq!(sequence, 0);
                assert_eq!(poll_rx_ts, truncate(POLL_RX));
                assert_eq!(
                    resp_tx_ts,
                    truncate(response.tx_time.device_time() + 16385)
                );
                // Turnaround is roughly 650 uus
                let turnaround = elapsed(poll_rx_ts, resp_tx_ts);
                assert!(turnaround > 650 * 63898 - 512 && turnaround < 650 * 63898 + 16385);
            }
            other => panic!("Expected response, got {:?}", other),
        }
    }

    #[test]
    fn test_unserved_anchor_ignored() {
        let mut responder = Responder::new(RangingConfig::anchor(), &[AnchorId::A1]);
        assert_eq!(
            responder.on_poll_received(&encode_poll(AnchorId::A3, 0), POLL_RX),
            Err(RangingError::Codec(CodecError::UnrecognizedFrame))
        );
        assert_eq!(responder.state(), ResponderState::WaitingPoll);
    }

    #[test]
    fn test_non_poll_frames_ignored() {
        let mut responder = all_anchors();
        let response = encode_response(AnchorId::A1, 0, 1, 2);
        assert_eq!(
            responder.on_poll_received(&response, POLL_RX),
            Err(RangingError::Codec(CodecError::UnrecognizedFrame))
        );
        assert_eq!(
            responder.on_poll_received(&[0x41], POLL_RX),
            Err(RangingError::Codec(CodecError::Truncated))
        );
        assert_eq!(responder.state(), ResponderState::WaitingPoll);
    }

    #[test]
    fn test_tx_complete_increments_sequence() {
        let mut responder = all_anchors();
        respond(&mut responder, AnchorId::A1);

        assert_eq!(responder.sequence(AnchorId::A1), 1);
        assert_eq!(responder.sequence(AnchorId::A2), 0);
        assert_eq!(
            responder.state(),
            ResponderState::WaitingAck { anchor: AnchorId::A1 }
        );
    }

    #[test]
    fn test_late_schedule_returns_to_waiting_poll() {
        let mut responder = all_anchors();
        responder
            .on_poll_received(&encode_poll(AnchorId::A1, 0), POLL_RX)
            .unwrap();

        assert_eq!(responder.on_tx_rejected(), RangingError::LateSchedule);
        assert_eq!(responder.state(), ResponderState::WaitingPoll);
        assert_eq!(responder.sequence(AnchorId::A1), 0);
        assert_eq!(responder.on_tx_complete(), Err(RangingError::InvalidState));

        // Ready for the next poll straight away
        assert!(responder
            .on_poll_received(&encode_poll(AnchorId::A1, 1), POLL_RX)
            .is_ok());
    }

    #[test]
    fn test_poll_while_busy_rejected() {
        let mut responder = all_anchors();
        respond(&mut responder, AnchorId::A1);
        assert_eq!(
            responder.on_poll_received(&encode_poll(AnchorId::A2, 0), POLL_RX),
            Err(RangingError::InvalidState)
        );
    }

    #[test]
    fn test_distance_update_stored() {
        let mut responder = all_anchors();
        respond(&mut responder, AnchorId::A2);

        let update = with_fcs(&encode_distance_update(4.25).unwrap());
        assert!(responder.on_distance_update(&update).is_none());
        assert_eq!(responder.distance(AnchorId::A2), 4.25);
        assert_eq!(responder.state(), ResponderState::WaitingPoll);
    }

    #[test]
    fn test_malformed_distance_update_is_noop() {
        let mut responder = all_anchors();
        respond(&mut responder, AnchorId::A1);

        assert!(responder.on_distance_update(&with_fcs(b"hello")).is_none());
        assert_eq!(responder.distance(AnchorId::A1), 0.0);
        assert_eq!(responder.state(), ResponderState::WaitingPoll);
    }

    #[test]
    fn test_update_outside_ack_window_ignored() {
        let mut responder = all_anchors();
        let update = with_fcs(&encode_distance_update(1.0).unwrap());
        assert!(responder.on_distance_update(&update).is_none());
        assert_eq!(responder.distance(AnchorId::A1), 0.0);
    }

    #[test]
    fn test_three_updates_produce_fix() {
        let config = RangingConfig {
            layout: AnchorLayout::from_table([(0.0, 0.0), (4.0, 0.0), (0.0, 3.0)]),
            ..RangingConfig::anchor()
        };
        let mut responder = Responder::new(config, &AnchorId::ALL);

        let mut fix = None;
        for (anchor, d) in AnchorId::ALL
            .into_iter()
            .zip([2.0f64.sqrt(), 10.0f64.sqrt(), 5.0f64.sqrt()])
        {
            respond(&mut responder, anchor);
            fix = responder.on_distance_update(&with_fcs(&encode_distance_update(d).unwrap()));
        }

        let fix = fix.unwrap().unwrap();
        assert!((fix.position.x - 1.0).abs() < 0.01);
        assert!((fix.position.y - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_timeout_resets() {
        let mut responder = all_anchors();
        respond(&mut responder, AnchorId::A3);
        responder.on_timeout();
        assert_eq!(responder.state(), ResponderState::WaitingPoll);
    }
}
