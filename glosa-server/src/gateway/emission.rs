//! Per-session emission loop
//!
//! Computes and pushes one recommendation per tick while its session is
//! active. Each loop is an independent task: a slow or failing prediction
//! fetch delays only its own session, and a failure never escapes the
//! task.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use glosa_core::Error;
use glosa_core::advisory::{self, SignalAhead, SpeedRange};
use glosa_core::model::{Position, Recommendation, Route};
use glosa_core::prediction::PredictionFeed;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;

use super::connection::Dialect;
use crate::protocol::{Body, Envelope};

pub(crate) struct EmissionLoop {
    pub route: Arc<Route>,
    pub position: watch::Receiver<Option<Position>>,
    pub active: Arc<AtomicBool>,
    pub feed: Arc<dyn PredictionFeed>,
    pub outbound: mpsc::Sender<String>,
    pub dialect: Dialect,
    pub tick: Duration,
    pub prediction_timeout: Duration,
    pub range: SpeedRange,
}

impl EmissionLoop {
    pub(crate) async fn run(mut self) {
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            // a tick without a known position emits nothing
            let Some(fix) = *self.position.borrow_and_update() else {
                continue;
            };
            let recommendation = self.advise(&fix).await;
            // re-check immediately before send: a stop that took effect
            // while this tick was computing must suppress the emission
            if !self.active.load(Ordering::Acquire) {
                break;
            }
            let envelope = Envelope::push(Body::Recommendation(Box::new(recommendation)));
            if self
                .outbound
                .send(self.dialect.encode(&envelope))
                .await
                .is_err()
            {
                break;
            }
        }
    }

    async fn advise(&self, fix: &Position) -> Recommendation {
        match advisory::locate_signal_ahead(&self.route, fix) {
            SignalAhead::EndOfRoute => Recommendation::failure(&Error::EndOfRoute),
            SignalAhead::Signal { group, distance } => {
                let fetched = tokio::time::timeout(
                    self.prediction_timeout,
                    self.feed.phase_prediction(&group.id),
                )
                .await;
                match fetched {
                    Ok(Ok(prediction)) if prediction.is_plausible() => {
                        advisory::compute_recommendation(group, distance, fix, &prediction, &self.range)
                    }
                    // timeout, feed failure and implausible timing all
                    // surface the same way; the next tick retries
                    _ => Recommendation::failure(&Error::PredictionUnavailable),
                }
            }
        }
    }
}
