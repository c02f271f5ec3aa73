//! Drives a [`Responder`] over a [`UwbRadio`]

use crate::protocol::AnchorId;
use crate::radio::{RadioError, TxSchedule, UwbRadio};
use crate::ranging::{Fix, RangingConfig, RangingError, Responder};
use crate::solver::SolverError;

/// Result of one served poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Served {
    pub anchor: AnchorId,
    /// Present when the tag's distance update completed a set of three
    pub fix: Option<Result<Fix, SolverError>>,
}

/// Anchor-side ranging session
pub struct ResponderSession {
    responder: Responder,
}

impl ResponderSession {
    pub fn new(config: RangingConfig, served: &[AnchorId]) -> Self {
        Self {
            responder: Responder::new(config, served),
        }
    }

    pub fn responder(&self) -> &Responder {
        &self.responder
    }

    /// Wait for one poll, answer it and collect the tag's distance update.
    ///
    /// Whatever happens the responder is back in `WaitingPoll` on return.
    pub async fn serve_once<R: UwbRadio>(&mut self, radio: &mut R) -> Result<Served, RangingError> {
        let rx = match radio.receive(None).await {
            Ok(rx) => rx,
            Err(e) => return Err(self.fail(e)),
        };

        let response = self.responder.on_poll_received(&rx.data, rx.rx_timestamp)?;

        match radio
            .transmit(&response.frame, TxSchedule::At(response.tx_time), None)
            .await
        {
            Ok(()) => self.responder.on_tx_complete()?,
            Err(RadioError::TooLate) => return Err(self.responder.on_tx_rejected()),
            Err(e) => return Err(self.fail(e)),
        }

        if !self.responder.config().share_distances {
            self.responder.on_timeout();
            return Ok(Served {
                anchor: response.anchor,
                fix: None,
            });
        }

        let timeout = self.responder.config().distance_update_timeout_uus;
        let fix = match radio.receive(Some(timeout)).await {
            Ok(update) => self.responder.on_distance_update(&update.data),
            Err(RadioError::Timeout) => {
                self.responder.on_timeout();
                None
            }
            Err(e) => {
                self.fail(e);
                None
            }
        };

        Ok(Served {
            anchor: response.anchor,
            fix,
        })
    }

    fn fail(&mut self, error: RadioError) -> RangingError {
        let error = RangingError::from(error);
        self.responder.on_error(error);
        error
    }
}
