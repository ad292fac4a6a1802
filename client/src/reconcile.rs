//! Server reconciliation for the owning client.
//!
//! Each targeted server state acknowledges a prefix of our input history
//! and tells us where the authoritative simulation actually put us. Small
//! disagreements are expected prediction noise and get absorbed visually;
//! large ones are genuine desyncs and reseed the motor before replaying
//! whatever the server has not seen yet.

use crate::prediction::OwnerPredictionEngine;
use log::debug;
use shared::{CollisionQuery, ServerState, Vec2};

/// Tunables for the error classification and replay budget. The threshold
/// and cap are configuration, not fixed behavior.
#[derive(Debug, Clone, Copy)]
pub struct ReconcileSettings {
    /// Positional error at or below this is absorbed by the visual layer;
    /// above it the motor is hard-reseeded.
    pub snap_threshold: f32,
    /// Maximum history entries replayed per message. Anything beyond is
    /// deferred, trading momentary staleness for a bounded per-message cost.
    pub max_replay: usize,
}

impl Default for ReconcileSettings {
    fn default() -> Self {
        Self {
            snap_threshold: 5.0,
            max_replay: 64,
        }
    }
}

/// Outcome handed to the visual smoothing layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correction {
    /// Small error: the motor was left untouched; the carried vector should
    /// be folded into the standing correction offset and decayed.
    Drift(Vec2),
    /// Large error: the motor was reseeded from the server and replayed;
    /// the presented transform should snap and zero its spring state.
    Snap,
}

/// Runs on the owning client whenever a targeted [`ServerState`] arrives.
pub struct ReconciliationEngine {
    settings: ReconcileSettings,
    /// (server clock - local clock), fixed by the first message of the
    /// session and never re-measured.
    time_offset_ms: Option<i64>,
}

impl ReconciliationEngine {
    pub fn new(settings: ReconcileSettings) -> Self {
        Self {
            settings,
            time_offset_ms: None,
        }
    }

    /// Processes one acknowledgment. Classifies the positional error,
    /// evicts acknowledged inputs, and replays the remainder when the motor
    /// was reseeded.
    pub fn apply<W: CollisionQuery + ?Sized>(
        &mut self,
        server: &ServerState,
        prediction: &mut OwnerPredictionEngine,
        world: &W,
        local_now_ms: u64,
    ) -> Correction {
        if self.time_offset_ms.is_none() {
            self.time_offset_ms = Some(server.server_time as i64 - local_now_ms as i64);
        }

        // Error against the pre-reconciliation prediction.
        let error = server.position - prediction.predicted_position();
        let ack = server.last_input_seq;

        let correction = if error.magnitude() <= self.settings.snap_threshold {
            Correction::Drift(error)
        } else {
            debug!(
                "rollback: error {:.2} above threshold {:.2}, reseeding from ack {}",
                error.magnitude(),
                self.settings.snap_threshold,
                ack
            );
            prediction
                .motor_mut()
                .set_position_velocity(server.position, server.velocity, server.grounded);
            Correction::Snap
        };

        prediction
            .history_mut()
            .remove_front_while(|sample| sample.sequence <= ack);

        if correction == Correction::Snap {
            let replayed = prediction.replay(world, self.settings.max_replay);
            debug!("replayed {} unacknowledged inputs", replayed);
        }

        correction
    }

    /// The fixed (server - local) clock offset, once known.
    pub fn time_offset_ms(&self) -> Option<i64> {
        self.time_offset_ms
    }

    pub fn settings(&self) -> &ReconcileSettings {
        &self.settings
    }

    /// Session teardown: forgets the clock offset so the next session
    /// re-measures it.
    pub fn reset(&mut self) {
        self.time_offset_ms = None;
    }
}
