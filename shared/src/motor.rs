//! Deterministic kinematic character motor.
//!
//! The motor is the one piece of simulation both sides must agree on
//! bit-for-bit: the server steps it authoritatively, the owner steps it
//! speculatively and replays it during reconciliation. It is a plain
//! stepping function over explicit value state; all collision access goes
//! through [`CollisionQuery`] and must be stable for identical queries.

use crate::collision::{CollisionQuery, LayerMask, LAYER_GROUND, LAYER_SOLID};
use crate::math::{move_toward, Vec2};
use crate::protocol::InputSample;
use serde::{Deserialize, Serialize};

/// Tuning constants for the motor. Plain data so both sides construct the
/// same values from shared defaults.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MotorSettings {
    /// Maximum horizontal speed in units per second.
    pub max_speed: f32,
    /// Horizontal acceleration toward a requested direction.
    pub acceleration: f32,
    /// Horizontal deceleration when no direction is requested.
    pub deceleration: f32,
    /// Gravity in units per second squared; negative (downward).
    pub gravity: f32,
    /// Vertical velocity applied when a jump is consumed.
    pub jump_velocity: f32,
    /// Grace window after leaving the ground during which a jump still fires.
    pub coyote_time: f32,
    /// Grace window before landing during which an early jump request is
    /// remembered.
    pub jump_buffer: f32,
    /// Inset subtracted from swept distances to avoid sticking at contacts.
    pub skin_width: f32,
    /// Collision box of the character.
    pub body_size: Vec2,
    /// Depth of the ground probe box below the feet.
    pub ground_probe_depth: f32,
    /// Layers that block movement.
    pub solid_mask: LayerMask,
    /// Layers that count as ground.
    pub ground_mask: LayerMask,
}

impl Default for MotorSettings {
    fn default() -> Self {
        Self {
            max_speed: 300.0,
            acceleration: 2400.0,
            deceleration: 3000.0,
            gravity: -980.0,
            jump_velocity: 420.0,
            coyote_time: 0.1,
            jump_buffer: 0.1,
            skin_width: 0.5,
            body_size: Vec2::new(24.0, 32.0),
            ground_probe_depth: 1.5,
            solid_mask: LAYER_SOLID,
            ground_mask: LAYER_GROUND,
        }
    }
}

/// The complete per-character simulation state.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MotionState {
    /// Center of the collision box.
    pub position: Vec2,
    pub velocity: Vec2,
    pub grounded: bool,
    /// Seconds since last grounded; advances every tick, resets on landing.
    pub time_since_grounded: f32,
    /// Seconds since jump was last requested; resets when the flag arrives.
    pub time_since_jump: f32,
}

impl MotionState {
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            grounded: false,
            // Start outside both grace windows so a spawn cannot jump
            // before touching ground.
            time_since_grounded: f32::MAX / 2.0,
            time_since_jump: f32::MAX / 2.0,
        }
    }
}

/// Kinematic motor: one instance per side per character, stepped at a fixed
/// timestep.
#[derive(Debug, Clone)]
pub struct KinematicMotor {
    pub state: MotionState,
    pub settings: MotorSettings,
}

impl KinematicMotor {
    pub fn new(state: MotionState, settings: MotorSettings) -> Self {
        Self { state, settings }
    }

    /// Advances the state by one fixed timestep.
    ///
    /// Callable repeatedly in immediate succession with the same `dt`:
    /// given the same starting state and ordered input sequence, the end
    /// state is reproduced exactly.
    pub fn step<W: CollisionQuery + ?Sized>(&mut self, input: &InputSample, world: &W, dt: f32) {
        let s = self.settings;
        let state = &mut self.state;

        state.time_since_grounded += dt;
        state.time_since_jump += dt;
        if input.jump {
            state.time_since_jump = 0.0;
        }

        // Horizontal: move-toward the requested speed, never overshooting
        // within a single tick.
        let axis = input.axis.clamp(-1.0, 1.0);
        let target = axis * s.max_speed;
        let rate = if target != 0.0 {
            s.acceleration
        } else {
            s.deceleration
        };
        state.velocity.x = move_toward(state.velocity.x, target, rate * dt);

        state.velocity.y += s.gravity * dt;

        // Buffered jump: fires while both grace windows are open, then both
        // timers are pushed past their thresholds so it cannot fire twice.
        if state.time_since_jump <= s.jump_buffer && state.time_since_grounded <= s.coyote_time {
            state.velocity.y = s.jump_velocity;
            state.grounded = false;
            state.time_since_jump = s.jump_buffer + 1.0;
            state.time_since_grounded = s.coyote_time + 1.0;
        }

        // Horizontal sweep.
        let dx = state.velocity.x * dt;
        let (moved_x, _) = Self::sweep_axis(world, &s, state.position, dx, true);
        state.position.x += moved_x;

        // Vertical sweep.
        let dy = state.velocity.y * dt;
        let (moved_y, blocked_y) = Self::sweep_axis(world, &s, state.position, dy, false);
        state.position.y += moved_y;

        if blocked_y {
            if dy < 0.0 {
                state.velocity.y = 0.0;
                state.grounded = true;
                state.time_since_grounded = 0.0;
            } else {
                // Ceiling hit.
                state.velocity.y = 0.0;
                state.grounded = false;
            }
        } else {
            let probe_center = Vec2::new(
                state.position.x,
                state.position.y - s.body_size.y / 2.0 - s.ground_probe_depth / 2.0,
            );
            let probe_size = Vec2::new(s.body_size.x, s.ground_probe_depth);
            state.grounded = world.overlap(probe_center, probe_size, s.ground_mask);
            if state.grounded {
                state.time_since_grounded = 0.0;
            }
        }
    }

    /// Sweeps the body along one cardinal axis by `delta` units. Returns the
    /// resolved displacement and whether the move was clamped by geometry.
    fn sweep_axis<W: CollisionQuery + ?Sized>(
        world: &W,
        s: &MotorSettings,
        from: Vec2,
        delta: f32,
        horizontal: bool,
    ) -> (f32, bool) {
        if delta == 0.0 {
            return (0.0, false);
        }

        let sign = delta.signum();
        let dir = if horizontal {
            Vec2::new(sign, 0.0)
        } else {
            Vec2::new(0.0, sign)
        };
        let distance = delta.abs();

        match world.sweep(s.body_size, from, dir, distance + s.skin_width, s.solid_mask) {
            Some(hit) => {
                let allowed = (hit - s.skin_width).max(0.0);
                if allowed < distance {
                    (allowed * sign, true)
                } else {
                    (delta, false)
                }
            }
            None => (delta, false),
        }
    }

    /// External override used only for hard reconciliation.
    pub fn set_position_velocity(&mut self, position: Vec2, velocity: Vec2, grounded: bool) {
        self.state.position = position;
        self.state.velocity = velocity;
        self.state.grounded = grounded;
        if grounded {
            self.state.time_since_grounded = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collision::{Collider, StaticWorld};
    use assert_approx_eq::assert_approx_eq;

    const DT: f32 = 1.0 / 60.0;

    fn floor_world() -> StaticWorld {
        let mut world = StaticWorld::new();
        world.add(Collider::new(
            Vec2::new(0.0, -10.0),
            Vec2::new(2000.0, 20.0),
            LAYER_SOLID | LAYER_GROUND,
        ));
        world
    }

    fn sample(sequence: u32, axis: f32, jump: bool) -> InputSample {
        InputSample {
            sequence,
            timestamp: sequence as u64 * 16,
            axis,
            jump,
        }
    }

    fn grounded_motor() -> KinematicMotor {
        // Resting just above the floor with a skin gap, as the motor
        // leaves a body after landing.
        let mut state = MotionState::at(Vec2::new(0.0, 16.5));
        state.grounded = true;
        state.time_since_grounded = 0.0;
        KinematicMotor::new(state, MotorSettings::default())
    }

    #[test]
    fn test_step_is_deterministic() {
        let world = floor_world();
        let inputs: Vec<InputSample> = (1..=120)
            .map(|i| sample(i, if i % 17 < 9 { 1.0 } else { -1.0 }, i % 31 == 0))
            .collect();

        let mut a = grounded_motor();
        let mut b = grounded_motor();

        for input in &inputs {
            a.step(input, &world, DT);
        }
        for input in &inputs {
            b.step(input, &world, DT);
        }

        assert_eq!(a.state, b.state);
    }

    #[test]
    fn test_replay_is_associative() {
        let world = floor_world();
        let inputs: Vec<InputSample> = (1..=5).map(|i| sample(i, 1.0, i == 3)).collect();

        let mut one_pass = grounded_motor();
        for input in &inputs {
            one_pass.step(input, &world, DT);
        }

        let mut split = grounded_motor();
        for input in &inputs[..3] {
            split.step(input, &world, DT);
        }
        for input in &inputs[3..] {
            split.step(input, &world, DT);
        }

        assert_eq!(one_pass.state, split.state);
    }

    #[test]
    fn test_move_toward_acceleration_no_overshoot() {
        let world = floor_world();
        let mut motor = grounded_motor();

        motor.step(&sample(1, 1.0, false), &world, DT);
        let expected = (motor.settings.acceleration * DT).min(motor.settings.max_speed);
        assert_approx_eq!(motor.state.velocity.x, expected, 1e-4);

        // Many ticks later the speed is exactly capped, not oscillating.
        for i in 2..=60 {
            motor.step(&sample(i, 1.0, false), &world, DT);
        }
        assert_approx_eq!(motor.state.velocity.x, motor.settings.max_speed, 1e-4);
    }

    #[test]
    fn test_deceleration_stops_at_zero() {
        let world = floor_world();
        let mut motor = grounded_motor();
        motor.state.velocity.x = 100.0;

        for i in 1..=60 {
            motor.step(&sample(i, 0.0, false), &world, DT);
        }
        assert_approx_eq!(motor.state.velocity.x, 0.0, 1e-4);
    }

    #[test]
    fn test_grounded_jump_executes() {
        let world = floor_world();
        let mut motor = grounded_motor();

        motor.step(&sample(1, 0.0, true), &world, DT);

        assert!(!motor.state.grounded);
        assert!(motor.state.velocity.y > 0.0);
        // Both windows are closed so the jump cannot fire again.
        assert!(motor.state.time_since_jump > motor.settings.jump_buffer);
        assert!(motor.state.time_since_grounded > motor.settings.coyote_time);
    }

    #[test]
    fn test_coyote_time_window() {
        let world = floor_world();

        // Just left the ground: jump still fires.
        let mut motor = grounded_motor();
        motor.state.grounded = false;
        motor.state.time_since_grounded = 0.05;
        motor.step(&sample(1, 0.0, true), &world, DT);
        assert_approx_eq!(motor.state.velocity.y, motor.settings.jump_velocity, 1e-4);

        // Too long airborne: jump does not fire.
        let mut motor = grounded_motor();
        motor.state.grounded = false;
        motor.state.position.y = 100.0;
        motor.state.time_since_grounded = 0.3;
        motor.step(&sample(1, 0.0, true), &world, DT);
        assert!(motor.state.velocity.y < 0.0);
    }

    #[test]
    fn test_jump_buffer_executes_on_landing() {
        let world = floor_world();
        let settings = MotorSettings::default();

        // Falling toward the floor, jump pressed shortly before impact.
        let mut state = MotionState::at(Vec2::new(0.0, 30.0));
        state.velocity.y = -200.0;
        let mut motor = KinematicMotor::new(state, settings);

        let mut jumped_tick = None;
        for i in 1..=30 {
            // Press jump on the first tick only; afterwards the buffer
            // timer carries the request.
            motor.step(&sample(i, 0.0, i == 1), &world, DT);
            if motor.state.velocity.y == settings.jump_velocity {
                jumped_tick = Some(i);
                break;
            }
        }

        // Impact happens within the buffer window, so the jump fires.
        assert!(jumped_tick.is_some());
    }

    #[test]
    fn test_jump_buffer_expires() {
        let world = floor_world();
        let settings = MotorSettings::default();

        // High enough that the fall outlasts the jump buffer.
        let state = MotionState::at(Vec2::new(0.0, 200.0));
        let mut motor = KinematicMotor::new(state, settings);

        let mut jumped = false;
        for i in 1..=120 {
            motor.step(&sample(i, 0.0, i == 1), &world, DT);
            if motor.state.velocity.y == settings.jump_velocity {
                jumped = true;
            }
        }

        assert!(!jumped);
        assert!(motor.state.grounded);
    }

    #[test]
    fn test_landing_grounds_and_zeroes_velocity() {
        let world = floor_world();
        let mut state = MotionState::at(Vec2::new(0.0, 60.0));
        state.velocity.y = -300.0;
        let mut motor = KinematicMotor::new(state, MotorSettings::default());

        for i in 1..=60 {
            motor.step(&sample(i, 0.0, false), &world, DT);
        }

        assert!(motor.state.grounded);
        assert_approx_eq!(motor.state.velocity.y, 0.0, 1e-4);
        assert_approx_eq!(motor.state.time_since_grounded, 0.0, 1e-4);
        // Resting just above the floor surface, inside the skin width.
        let feet = motor.state.position.y - motor.settings.body_size.y / 2.0;
        assert!(feet >= 0.0 && feet <= motor.settings.skin_width + 1e-3);
    }

    #[test]
    fn test_ceiling_hit_zeroes_upward_velocity() {
        let mut world = floor_world();
        world.add(Collider::new(
            Vec2::new(0.0, 60.0),
            Vec2::new(2000.0, 20.0),
            LAYER_SOLID,
        ));

        let mut motor = grounded_motor();
        motor.step(&sample(1, 0.0, true), &world, DT);
        for i in 2..=20 {
            motor.step(&sample(i, 0.0, false), &world, DT);
            if motor.state.velocity.y == 0.0 && !motor.state.grounded {
                return; // ceiling reached
            }
        }
        panic!("never hit the ceiling");
    }

    #[test]
    fn test_wall_clamps_horizontal_movement() {
        let mut world = floor_world();
        world.add(Collider::new(
            Vec2::new(100.0, 50.0),
            Vec2::new(20.0, 200.0),
            LAYER_SOLID,
        ));

        let mut motor = grounded_motor();
        for i in 1..=120 {
            motor.step(&sample(i, 1.0, false), &world, DT);
        }

        // Right edge stops at the wall's left face, minus the skin.
        let right = motor.state.position.x + motor.settings.body_size.x / 2.0;
        assert!(right <= 90.0);
        assert!(right >= 90.0 - motor.settings.skin_width - 1e-3);
    }

    #[test]
    fn test_set_position_velocity_override() {
        let mut motor = grounded_motor();
        motor.set_position_velocity(Vec2::new(5.0, 40.0), Vec2::new(-10.0, 3.0), false);

        assert_eq!(motor.state.position, Vec2::new(5.0, 40.0));
        assert_eq!(motor.state.velocity, Vec2::new(-10.0, 3.0));
        assert!(!motor.state.grounded);
    }
}
