//! Authoritative per-character simulation.
//!
//! The server runs the same motor as the owning client, but on its own
//! clock: every server tick consumes the latest input received for the
//! character, whether or not a fresh one arrived. Clients propose inputs;
//! this engine decides what actually happened.

use shared::{CollisionQuery, InputSample, KinematicMotor, MotionState, MotorSettings, ServerState, Vec2};

#[derive(Debug, Clone, Copy)]
pub struct AuthoritySettings {
    /// How long the latest input stays valid without a replacement. Past
    /// this the character is simulated with neutral input, so a silent
    /// client decelerates and falls instead of running forever.
    pub input_timeout_ms: u64,
}

impl Default for AuthoritySettings {
    fn default() -> Self {
        Self {
            input_timeout_ms: 100,
        }
    }
}

/// One instance per connected character. Holds the authoritative motor and
/// the latest-input slot that absorbs the client's send stream.
pub struct ServerAuthorityEngine {
    motor: KinematicMotor,
    settings: AuthoritySettings,
    latest_input: Option<InputSample>,
    last_input_at_ms: u64,
}

impl ServerAuthorityEngine {
    pub fn new(spawn: Vec2, motor: MotorSettings, settings: AuthoritySettings) -> Self {
        Self {
            motor: KinematicMotor::new(MotionState::at(spawn), motor),
            settings,
            latest_input: None,
            last_input_at_ms: 0,
        }
    }

    /// Offers a received input. Only samples with a sequence strictly above
    /// the current one are accepted, which makes reordered UDP delivery
    /// harmless: a late old packet can never roll the character's input
    /// back. Returns whether the sample was accepted.
    pub fn submit(&mut self, sample: InputSample, now_ms: u64) -> bool {
        if let Some(current) = &self.latest_input {
            if sample.sequence <= current.sequence {
                return false;
            }
        }

        self.latest_input = Some(sample);
        self.last_input_at_ms = now_ms;
        true
    }

    /// Advances the character by one server tick and produces the state to
    /// report. The acknowledged sequence is always the latest received
    /// input, even when that input has gone stale and a neutral one was
    /// simulated instead.
    pub fn tick<W: CollisionQuery + ?Sized>(
        &mut self,
        world: &W,
        dt: f32,
        now_ms: u64,
        server_time: u64,
    ) -> ServerState {
        let ack = self.latest_input.map(|i| i.sequence).unwrap_or(0);

        let input = match &self.latest_input {
            Some(sample) if now_ms.saturating_sub(self.last_input_at_ms) <= self.settings.input_timeout_ms => {
                *sample
            }
            _ => InputSample {
                sequence: ack,
                timestamp: now_ms,
                axis: 0.0,
                jump: false,
            },
        };

        self.motor.step(&input, world, dt);

        // A jump press fires at most once; held repeats must come from
        // fresh samples.
        if input.jump {
            if let Some(sample) = &mut self.latest_input {
                sample.jump = false;
            }
        }

        ServerState {
            last_input_seq: ack,
            position: self.motor.state.position,
            velocity: self.motor.state.velocity,
            grounded: self.motor.state.grounded,
            server_time,
        }
    }

    pub fn state(&self) -> &MotionState {
        &self.motor.state
    }
}
