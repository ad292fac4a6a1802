//! Owner-side prediction: fixed-step local simulation ahead of the server.
//!
//! The owning client never waits for the network. Every fixed tick it
//! builds the next input sample, remembers it for reconciliation, and steps
//! its own copy of the motor immediately. Transmission is rate-limited
//! separately from simulation; a skipped send is silently superseded by the
//! next one.

use shared::{
    CollisionQuery, HistoryBuffer, InputSample, KinematicMotor, MotionState, MotorSettings, Vec2,
    FIXED_DT,
};

/// How many unacknowledged inputs the owner retains. Overflow silently
/// drops the oldest; at 60Hz this covers more than two seconds of
/// round-trip latency.
pub const INPUT_HISTORY_CAPACITY: usize = 128;

/// Transmission rate limits for outgoing input samples.
#[derive(Debug, Clone, Copy)]
pub struct SendSettings {
    /// Minimum interval between sends in milliseconds.
    pub interval_ms: u64,
    /// Hard cap on sends within any rolling one-second window.
    pub max_per_second: usize,
}

impl Default for SendSettings {
    fn default() -> Self {
        Self {
            interval_ms: 30,
            max_per_second: 40,
        }
    }
}

/// Runs on the input-owning client once per fixed tick (driven through a
/// per-frame accumulator, so a slow frame produces several ticks and a fast
/// frame may produce none).
pub struct OwnerPredictionEngine {
    motor: KinematicMotor,
    history: HistoryBuffer<InputSample>,
    send: SendSettings,
    next_sequence: u32,
    accumulator: f32,
    last_send_ms: Option<u64>,
    recent_sends: Vec<u64>,
}

impl OwnerPredictionEngine {
    pub fn new(spawn: Vec2, settings: MotorSettings, send: SendSettings) -> Self {
        Self {
            motor: KinematicMotor::new(MotionState::at(spawn), settings),
            history: HistoryBuffer::new(INPUT_HISTORY_CAPACITY),
            send,
            next_sequence: 1,
            accumulator: 0.0,
            last_send_ms: None,
            recent_sends: Vec::new(),
        }
    }

    /// Consumes `frame_dt` seconds of frame time, producing zero or more
    /// fixed ticks. Each tick samples the given input, pushes it into the
    /// history, and steps the local motor. Returns the samples that passed
    /// the rate limiter and should be transmitted.
    pub fn advance<W: CollisionQuery + ?Sized>(
        &mut self,
        frame_dt: f32,
        axis: f32,
        jump: bool,
        world: &W,
        now_ms: u64,
    ) -> Vec<InputSample> {
        self.accumulator += frame_dt;

        let mut to_send = Vec::new();
        // The jump flag is edge-triggered: it belongs to the first tick of
        // this frame only.
        let mut jump_pending = jump;

        while self.accumulator >= FIXED_DT {
            self.accumulator -= FIXED_DT;

            let sample = InputSample {
                sequence: self.next_sequence,
                timestamp: now_ms,
                axis: axis.clamp(-1.0, 1.0),
                jump: jump_pending,
            };
            jump_pending = false;
            self.next_sequence += 1;

            self.history.push(sample);
            self.motor.step(&sample, world, FIXED_DT);

            if self.try_claim_send(now_ms) {
                to_send.push(sample);
            }
        }

        to_send
    }

    /// Applies the send-rate policy for one candidate sample. A refused
    /// send is dropped, not queued; later inputs supersede it.
    fn try_claim_send(&mut self, now_ms: u64) -> bool {
        if let Some(last) = self.last_send_ms {
            if now_ms.saturating_sub(last) < self.send.interval_ms {
                return false;
            }
        }

        self.recent_sends
            .retain(|&sent| now_ms.saturating_sub(sent) < 1000);
        if self.recent_sends.len() >= self.send.max_per_second {
            return false;
        }

        self.recent_sends.push(now_ms);
        self.last_send_ms = Some(now_ms);
        true
    }

    /// Replays up to `max` of the oldest retained inputs through the motor,
    /// in order. Returns how many were replayed; any remainder is deferred.
    pub fn replay<W: CollisionQuery + ?Sized>(&mut self, world: &W, max: usize) -> usize {
        let count = self.history.len().min(max);
        for i in 0..count {
            let sample = self.history[i];
            self.motor.step(&sample, world, FIXED_DT);
        }
        count
    }

    pub fn predicted_state(&self) -> &MotionState {
        &self.motor.state
    }

    pub fn predicted_position(&self) -> Vec2 {
        self.motor.state.position
    }

    pub fn motor_mut(&mut self) -> &mut KinematicMotor {
        &mut self.motor
    }

    pub fn history(&self) -> &HistoryBuffer<InputSample> {
        &self.history
    }

    pub fn history_mut(&mut self) -> &mut HistoryBuffer<InputSample> {
        &mut self.history
    }

    /// Session teardown: clears buffered inputs, restarts sequence
    /// numbering, and reseeds the motor.
    pub fn reset(&mut self, spawn: Vec2) {
        self.history.clear();
        self.recent_sends.clear();
        self.last_send_ms = None;
        self.next_sequence = 1;
        self.accumulator = 0.0;
        self.motor.state = MotionState::at(spawn);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{default_world, SPAWN_Y};

    fn engine(send: SendSettings) -> OwnerPredictionEngine {
        OwnerPredictionEngine::new(
            Vec2::new(400.0, SPAWN_Y),
            MotorSettings::default(),
            send,
        )
    }

    fn unlimited() -> SendSettings {
        SendSettings {
            interval_ms: 0,
            max_per_second: usize::MAX,
        }
    }

    #[test]
    fn test_accumulator_produces_whole_ticks() {
        let world = default_world();
        let mut engine = engine(unlimited());

        // Half a tick: nothing happens yet.
        let sent = engine.advance(FIXED_DT * 0.5, 0.0, false, &world, 0);
        assert!(sent.is_empty());
        assert_eq!(engine.history().len(), 0);

        // The other half plus two more ticks: three ticks fire.
        let sent = engine.advance(FIXED_DT * 2.5, 0.0, false, &world, 1);
        assert_eq!(sent.len(), 3);
        assert_eq!(engine.history().len(), 3);
    }

    #[test]
    fn test_sequence_numbers_start_at_one_and_increase() {
        let world = default_world();
        let mut engine = engine(unlimited());

        engine.advance(FIXED_DT * 4.0, 1.0, false, &world, 0);

        let sequences: Vec<u32> = engine.history().iter().map(|s| s.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_jump_flag_applies_to_first_tick_only() {
        let world = default_world();
        let mut engine = engine(unlimited());

        engine.advance(FIXED_DT * 3.0, 0.0, true, &world, 0);

        let jumps: Vec<bool> = engine.history().iter().map(|s| s.jump).collect();
        assert_eq!(jumps, vec![true, false, false]);
    }

    #[test]
    fn test_send_interval_limits_transmission() {
        let world = default_world();
        let mut engine = engine(SendSettings {
            interval_ms: 30,
            max_per_second: usize::MAX,
        });

        // Four ticks in one frame, all at the same wall-clock instant:
        // only the first passes the interval gate.
        let sent = engine.advance(FIXED_DT * 4.0, 0.0, false, &world, 100);
        assert_eq!(sent.len(), 1);

        // 30ms later a single tick may send again.
        let sent = engine.advance(FIXED_DT, 0.0, false, &world, 130);
        assert_eq!(sent.len(), 1);
    }

    #[test]
    fn test_rolling_window_cap_skips_silently() {
        let world = default_world();
        let mut engine = engine(SendSettings {
            interval_ms: 0,
            max_per_second: 3,
        });

        let sent = engine.advance(FIXED_DT * 6.0, 0.0, false, &world, 500);
        assert_eq!(sent.len(), 3);
        // All six ticks still simulated and recorded.
        assert_eq!(engine.history().len(), 6);

        // A second later the window has rolled over.
        let sent = engine.advance(FIXED_DT, 0.0, false, &world, 1501);
        assert_eq!(sent.len(), 1);
    }

    #[test]
    fn test_local_motor_advances_immediately() {
        let world = default_world();
        let mut engine = engine(unlimited());
        let start_x = engine.predicted_position().x;

        for frame in 0..30 {
            engine.advance(FIXED_DT, 1.0, false, &world, frame * 16);
        }

        assert!(engine.predicted_position().x > start_x);
    }

    #[test]
    fn test_history_overflow_drops_oldest() {
        let world = default_world();
        let mut engine = engine(unlimited());

        for frame in 0..(INPUT_HISTORY_CAPACITY as u64 + 10) {
            engine.advance(FIXED_DT, 0.0, false, &world, frame * 16);
        }

        assert_eq!(engine.history().len(), INPUT_HISTORY_CAPACITY);
        assert_eq!(engine.history().front().unwrap().sequence, 11);
    }

    #[test]
    fn test_reset_restarts_sequencing() {
        let world = default_world();
        let mut engine = engine(unlimited());

        engine.advance(FIXED_DT * 5.0, 1.0, false, &world, 0);
        engine.reset(Vec2::new(400.0, SPAWN_Y));

        assert!(engine.history().is_empty());
        let sent = engine.advance(FIXED_DT, 0.0, false, &world, 2000);
        assert_eq!(sent[0].sequence, 1);
    }
}
