//! Drives an [`Initiator`] over a [`UwbRadio`]

use heapless::Vec;

use crate::protocol::{encode_distance_update, AnchorId};
use crate::radio::{TxSchedule, UwbRadio};
use crate::ranging::timestamp::remaining_uus;
use crate::ranging::{Initiator, RangingConfig, RangingError, RoundOutcome};

/// Tag-side ranging session
pub struct InitiatorSession {
    initiator: Initiator,
}

impl InitiatorSession {
    pub fn new(config: RangingConfig) -> Self {
        Self {
            initiator: Initiator::new(config),
        }
    }

    pub fn initiator(&self) -> &Initiator {
        &self.initiator
    }

    /// Range against the next anchor in the cycle.
    ///
    /// Failures (timeouts, radio errors, too many stray frames) end the round
    /// and come back inside the outcome; the cycle always moves on. Stray
    /// frames do not extend the response window: it closes a fixed time after
    /// the poll left.
    pub async fn run_round<R: UwbRadio>(
        &mut self,
        radio: &mut R,
    ) -> Result<RoundOutcome, RangingError> {
        let request = match self.initiator.start_next_round() {
            Ok(request) => request,
            Err(error) => return self.initiator.on_error(error).ok_or(error),
        };

        if let Err(e) = radio
            .transmit(&request.frame, TxSchedule::Immediate, Some(request.window))
            .await
        {
            let error = RangingError::from(e);
            return self.initiator.on_error(error).ok_or(error);
        }
        let poll_tx_ts = radio.read_tx_timestamp();
        self.initiator.on_poll_sent(poll_tx_ts);

        let window_uus = request
            .window
            .rx_after_tx_delay_uus
            .saturating_add(request.window.rx_timeout_uus);
        let mut rx_timeout_uus = request.window.rx_timeout_uus;
        let mut strays = 0u8;
        let outcome = loop {
            let rx = match radio.receive(Some(rx_timeout_uus)).await {
                Ok(rx) => rx,
                Err(e) => {
                    let error = RangingError::from(e);
                    return self.initiator.on_error(error).ok_or(error);
                }
            };

            let ratio = radio.read_clock_offset_ratio();
            match self.initiator.on_frame_received(&rx.data, rx.rx_timestamp, ratio) {
                Ok(outcome) => break outcome,
                Err(RangingError::Codec(_)) if strays < self.initiator.config().max_stray_frames => {
                    strays += 1;
                    match remaining_uus(poll_tx_ts, window_uus, rx.rx_timestamp) {
                        Some(left) => rx_timeout_uus = left,
                        None => {
                            return self.initiator.on_timeout().ok_or(RangingError::Timeout);
                        }
                    }
                }
                Err(error) => return self.initiator.on_error(error).ok_or(error),
            }
        };

        if self.initiator.config().share_distances {
            if let Ok(range) = &outcome.result {
                self.share_distance(radio, range.anchor, range.distance_m).await;
            }
        }

        Ok(outcome)
    }

    /// Run rounds until the one for A3 closes the cycle
    pub async fn run_cycle<R: UwbRadio>(
        &mut self,
        radio: &mut R,
    ) -> Result<Vec<RoundOutcome, { AnchorId::COUNT }>, RangingError> {
        let mut outcomes = Vec::new();

        while !outcomes.is_full() {
            let outcome = self.run_round(radio).await?;
            let closes_cycle = outcome.anchor == AnchorId::A3;
            let _ = outcomes.push(outcome);
            if closes_cycle {
                break;
            }
        }

        Ok(outcomes)
    }

    async fn share_distance<R: UwbRadio>(&self, radio: &mut R, anchor: AnchorId, distance_m: f64) {
        let Some(frame) = encode_distance_update(distance_m) else {
            log::debug!("{} distance {} not shareable", anchor, distance_m);
            return;
        };

        if let Err(e) = radio.transmit(&frame, TxSchedule::Immediate, None).await {
            log::debug!("{} distance update not sent: {}", anchor, e);
        }
    }
}
