//! Collision queries against static level geometry.
//!
//! The motor only ever needs two capabilities from the world: sweep a box
//! along a cardinal axis and report the nearest blocking distance, and test
//! a box region for overlap. Both are expressed through [`CollisionQuery`]
//! so the simulation core stays independent of any particular physics
//! backend. [`StaticWorld`] is the axis-aligned implementation both sides
//! run against; identical queries must return identical results for
//! prediction and replay to converge.

use crate::math::Vec2;
use serde::{Deserialize, Serialize};

/// Bitmask selecting which collider layers a query is allowed to hit.
pub type LayerMask = u32;

/// Layer for fully blocking geometry (walls, ceilings, floors).
pub const LAYER_SOLID: LayerMask = 1 << 0;
/// Layer for surfaces that count as ground for the stand/jump logic.
pub const LAYER_GROUND: LayerMask = 1 << 1;

/// Shape-based queries the kinematic motor performs against level geometry.
pub trait CollisionQuery {
    /// Casts a box of `size` centered at `from` along `dir` (unit vector) up
    /// to `max_distance`. Returns the distance to the nearest blocking hit,
    /// or `None` if the path is clear.
    fn sweep(
        &self,
        size: Vec2,
        from: Vec2,
        dir: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<f32>;

    /// Returns true if a box of `size` centered at `center` overlaps any
    /// collider on the given layers.
    fn overlap(&self, center: Vec2, size: Vec2, mask: LayerMask) -> bool;
}

/// An axis-aligned box collider in the static level.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Collider {
    /// The positional center of the box.
    pub center: Vec2,
    pub size: Vec2,
    pub layers: LayerMask,
}

impl Collider {
    pub fn new(center: Vec2, size: Vec2, layers: LayerMask) -> Self {
        Self {
            center,
            size,
            layers,
        }
    }

    fn min(&self) -> Vec2 {
        Vec2::new(
            self.center.x - self.size.x / 2.0,
            self.center.y - self.size.y / 2.0,
        )
    }

    fn max(&self) -> Vec2 {
        Vec2::new(
            self.center.x + self.size.x / 2.0,
            self.center.y + self.size.y / 2.0,
        )
    }
}

/// Static level geometry: a flat list of axis-aligned colliders.
#[derive(Debug, Clone, Default)]
pub struct StaticWorld {
    colliders: Vec<Collider>,
}

impl StaticWorld {
    pub fn new() -> Self {
        Self {
            colliders: Vec::new(),
        }
    }

    pub fn add(&mut self, collider: Collider) {
        self.colliders.push(collider);
    }

    pub fn colliders(&self) -> &[Collider] {
        &self.colliders
    }
}

impl CollisionQuery for StaticWorld {
    fn sweep(
        &self,
        size: Vec2,
        from: Vec2,
        dir: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<f32> {
        if max_distance <= 0.0 {
            return None;
        }

        let half = size.scale(0.5);
        let mut nearest: Option<f32> = None;

        for collider in &self.colliders {
            if collider.layers & mask == 0 {
                continue;
            }

            let c_min = collider.min();
            let c_max = collider.max();

            // The motor sweeps along cardinal axes only; resolve each axis
            // as a gap test on the motion axis plus an overlap test on the
            // perpendicular axis.
            let hit = if dir.x != 0.0 {
                let overlaps_y = from.y + half.y > c_min.y && from.y - half.y < c_max.y;
                if !overlaps_y {
                    None
                } else if dir.x > 0.0 {
                    let gap = c_min.x - (from.x + half.x);
                    (gap >= 0.0).then_some(gap)
                } else {
                    let gap = (from.x - half.x) - c_max.x;
                    (gap >= 0.0).then_some(gap)
                }
            } else {
                let overlaps_x = from.x + half.x > c_min.x && from.x - half.x < c_max.x;
                if !overlaps_x {
                    None
                } else if dir.y > 0.0 {
                    let gap = c_min.y - (from.y + half.y);
                    (gap >= 0.0).then_some(gap)
                } else {
                    let gap = (from.y - half.y) - c_max.y;
                    (gap >= 0.0).then_some(gap)
                }
            };

            if let Some(distance) = hit {
                if distance <= max_distance && nearest.map_or(true, |n| distance < n) {
                    nearest = Some(distance);
                }
            }
        }

        nearest
    }

    fn overlap(&self, center: Vec2, size: Vec2, mask: LayerMask) -> bool {
        let half = size.scale(0.5);

        self.colliders.iter().any(|collider| {
            if collider.layers & mask == 0 {
                return false;
            }

            let c_min = collider.min();
            let c_max = collider.max();

            center.x + half.x > c_min.x
                && center.x - half.x < c_max.x
                && center.y + half.y > c_min.y
                && center.y - half.y < c_max.y
        })
    }
}
