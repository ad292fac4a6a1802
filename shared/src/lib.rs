//! Deterministic simulation core and wire protocol shared by the server and
//! every client.
//!
//! Both sides of the connection run the exact same kinematic motor over the
//! exact same level geometry; the netcode on top (prediction,
//! reconciliation, interpolation) only works because the pieces in this
//! crate behave identically everywhere.

pub mod collision;
pub mod history;
pub mod math;
pub mod motor;
pub mod protocol;

pub use collision::{Collider, CollisionQuery, LayerMask, StaticWorld, LAYER_GROUND, LAYER_SOLID};
pub use history::HistoryBuffer;
pub use math::Vec2;
pub use motor::{KinematicMotor, MotionState, MotorSettings};
pub use protocol::{now_ms, InputSample, Packet, ServerState};

/// Fixed simulation tick rate, identical on server and owner.
pub const TICK_RATE: f32 = 60.0;
/// Fixed simulation timestep in seconds.
pub const FIXED_DT: f32 = 1.0 / TICK_RATE;

pub const WORLD_WIDTH: f32 = 800.0;
pub const WORLD_HEIGHT: f32 = 600.0;

/// Spawn height for new characters, clear of all geometry.
pub const SPAWN_Y: f32 = 80.0;

/// Builds the level both sides simulate against. Any mismatch here breaks
/// prediction, so the layout lives in one place.
pub fn default_world() -> StaticWorld {
    let mut world = StaticWorld::new();

    // Floor.
    world.add(Collider::new(
        Vec2::new(WORLD_WIDTH / 2.0, -20.0),
        Vec2::new(WORLD_WIDTH, 40.0),
        LAYER_SOLID | LAYER_GROUND,
    ));
    // Side walls.
    world.add(Collider::new(
        Vec2::new(-20.0, WORLD_HEIGHT / 2.0),
        Vec2::new(40.0, WORLD_HEIGHT * 2.0),
        LAYER_SOLID,
    ));
    world.add(Collider::new(
        Vec2::new(WORLD_WIDTH + 20.0, WORLD_HEIGHT / 2.0),
        Vec2::new(40.0, WORLD_HEIGHT * 2.0),
        LAYER_SOLID,
    ));
    // Platforms.
    world.add(Collider::new(
        Vec2::new(200.0, 120.0),
        Vec2::new(160.0, 16.0),
        LAYER_SOLID | LAYER_GROUND,
    ));
    world.add(Collider::new(
        Vec2::new(600.0, 180.0),
        Vec2::new(160.0, 16.0),
        LAYER_SOLID | LAYER_GROUND,
    ));

    world
}
