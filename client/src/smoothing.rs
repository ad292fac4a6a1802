//! Visual smoothing between the simulated target and the presented
//! transform.
//!
//! The simulation is allowed to be blunt (reconciliation nudges, replay
//! jumps, interpolation steps); this layer keeps the rendered position
//! continuous. It carries the standing correction offset from small
//! reconciliation errors, decays it toward zero, and critically damps the
//! presented position toward the corrected target. Discontinuities past the
//! snap distance are presented honestly as a snap.

use shared::Vec2;

#[derive(Debug, Clone, Copy)]
pub struct SmoothingSettings {
    /// Approximate time to reach the target, in seconds.
    pub smooth_time: f32,
    /// Exponential decay rate of the correction offset, per second.
    pub offset_decay: f32,
    /// Discontinuities larger than this are snapped, not eased.
    pub snap_distance: f32,
}

impl Default for SmoothingSettings {
    fn default() -> Self {
        Self {
            smooth_time: 0.08,
            offset_decay: 8.0,
            snap_distance: 48.0,
        }
    }
}

/// Per-character presentation state. Owned by the render step; never
/// touched by the simulation tick.
pub struct VisualSmoothing {
    settings: SmoothingSettings,
    position: Vec2,
    velocity: Vec2,
    offset: Vec2,
    initialized: bool,
}

impl VisualSmoothing {
    pub fn new(settings: SmoothingSettings) -> Self {
        Self {
            settings,
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            offset: Vec2::ZERO,
            initialized: false,
        }
    }

    /// Folds a small reconciliation error into the standing offset.
    pub fn add_correction(&mut self, error: Vec2) {
        self.offset += error;
    }

    /// Hard snap: jumps the presented position and zeroes both the spring
    /// velocity and the correction offset. Used for large reconciliation
    /// errors and first appearance.
    pub fn snap_to(&mut self, position: Vec2) {
        self.position = position;
        self.velocity = Vec2::ZERO;
        self.offset = Vec2::ZERO;
        self.initialized = true;
    }

    /// Advances the presented position toward `target` plus the standing
    /// offset. Call once per render step.
    pub fn update(&mut self, target: Vec2, dt: f32) -> Vec2 {
        if !self.initialized {
            self.snap_to(target);
            return self.position;
        }

        self.offset = self.offset.scale((-self.settings.offset_decay * dt).exp());

        let goal = target + self.offset;
        if (goal - self.position).magnitude() > self.settings.snap_distance {
            self.snap_to(goal);
            return self.position;
        }

        self.position.x = smooth_damp(
            self.position.x,
            goal.x,
            &mut self.velocity.x,
            self.settings.smooth_time,
            dt,
        );
        self.position.y = smooth_damp(
            self.position.y,
            goal.y,
            &mut self.velocity.y,
            self.settings.smooth_time,
            dt,
        );
        self.position
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }
}

/// Critically damped spring toward `target` (the classic SmoothDamp
/// approximation), clamped so it never overshoots within a step.
fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    let omega = 2.0 / smooth_time.max(1e-4);
    let x = omega * dt;
    let decay = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * decay;
    let mut output = target + (change + temp) * decay;

    if (target > current) == (output > target) {
        output = target;
        *velocity = 0.0;
    }
    output
}
