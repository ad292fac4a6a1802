use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Mul, Neg, Sub};

/// Represents a vector in 2D space.
/// Positive x is to the right, positive y is up.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Returns the magnitude of the vector.
    pub fn magnitude(&self) -> f32 {
        (self.x * self.x + self.y * self.y).sqrt()
    }

    /// Returns the normalized vector, or zero if the magnitude is zero.
    pub fn normalize(&self) -> Vec2 {
        let mag = self.magnitude();
        if mag == 0.0 {
            Vec2::ZERO
        } else {
            Vec2 {
                x: self.x / mag,
                y: self.y / mag,
            }
        }
    }

    /// Returns the scaled vector.
    pub fn scale(&self, scalar: f32) -> Vec2 {
        Vec2 {
            x: self.x * scalar,
            y: self.y * scalar,
        }
    }

    /// Linear interpolation between two vectors by factor `t` in [0, 1].
    pub fn lerp(&self, other: &Vec2, t: f32) -> Vec2 {
        Vec2 {
            x: self.x + (other.x - self.x) * t,
            y: self.y + (other.y - self.y) * t,
        }
    }
}

impl Add for Vec2 {
    type Output = Vec2;

    fn add(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Vec2 {
    fn add_assign(&mut self, rhs: Vec2) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Vec2 {
    type Output = Vec2;

    fn sub(self, rhs: Vec2) -> Vec2 {
        Vec2::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl Mul<f32> for Vec2 {
    type Output = Vec2;

    fn mul(self, rhs: f32) -> Vec2 {
        self.scale(rhs)
    }
}

impl Neg for Vec2 {
    type Output = Vec2;

    fn neg(self) -> Vec2 {
        Vec2::new(-self.x, -self.y)
    }
}

/// Moves `current` toward `target` by at most `max_delta`, without overshoot.
pub fn move_toward(current: f32, target: f32, max_delta: f32) -> f32 {
    let delta = target - current;
    if delta.abs() <= max_delta {
        target
    } else {
        current + max_delta * delta.signum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_magnitude() {
        let v = Vec2::new(3.0, 4.0);
        assert_approx_eq!(v.magnitude(), 5.0, 1e-6);
    }

    #[test]
    fn test_normalize_zero_vector() {
        let v = Vec2::ZERO.normalize();
        assert_eq!(v, Vec2::ZERO);
    }

    #[test]
    fn test_lerp_endpoints() {
        let a = Vec2::new(0.0, 10.0);
        let b = Vec2::new(20.0, -10.0);
        assert_eq!(a.lerp(&b, 0.0), a);
        assert_eq!(a.lerp(&b, 1.0), b);

        let mid = a.lerp(&b, 0.5);
        assert_approx_eq!(mid.x, 10.0, 1e-6);
        assert_approx_eq!(mid.y, 0.0, 1e-6);
    }

    #[test]
    fn test_move_toward_no_overshoot() {
        assert_approx_eq!(move_toward(0.0, 10.0, 3.0), 3.0, 1e-6);
        assert_approx_eq!(move_toward(9.0, 10.0, 3.0), 10.0, 1e-6);
        assert_approx_eq!(move_toward(0.0, -10.0, 3.0), -3.0, 1e-6);
        assert_approx_eq!(move_toward(5.0, 5.0, 3.0), 5.0, 1e-6);
    }
}
