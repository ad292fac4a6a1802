//! # Game Client Library
//!
//! Client-side implementation of the predictive netcode stack. The client
//! owns exactly one character and applies its inputs locally the instant
//! they are sampled; everyone else's character is reconstructed slightly in
//! the past from broadcast snapshots.
//!
//! ## Module Organization
//!
//! ### Prediction Module (`prediction`)
//! Fixed-timestep local simulation of the owned character:
//! - Frame-time accumulator producing whole 60Hz ticks
//! - Input sequencing and bounded unacknowledged-input history
//! - Send-rate limiting decoupled from the simulation rate
//!
//! ### Reconciliation Module (`reconcile`)
//! Processing of targeted authoritative states:
//! - Positional error classification against a snap threshold
//! - Acknowledged-prefix eviction from the input history
//! - Motor reseed and bounded input replay on hard corrections
//!
//! ### Interpolation Module (`interpolation`)
//! Snapshot interpolation for remote characters:
//! - Ordered snapshot history with out-of-order rejection
//! - Delayed-target sampling between bracketing snapshots
//! - Bounded dead-reckoning when the buffer runs dry
//!
//! ### Smoothing Module (`smoothing`)
//! Presentation layer between simulation and rendering:
//! - Critically damped spring toward the simulated target
//! - Decaying correction offset for small reconciliation errors
//! - Honest snapping past a discontinuity distance
//!
//! ### Session Module (`session`)
//! The network loop tying the engines together:
//! - UDP connection handshake and packet routing
//! - Targeted states into reconciliation, broadcasts into interpolation
//! - Per-character render signals for the presentation layer
//!
//! ## Design Philosophy
//!
//! The client runs the exact same motor as the server, with identical
//! constants and collision queries from the shared library. Prediction is
//! only useful if replaying the same inputs from the same state lands in
//! the same place, so determinism of the shared simulation is the one
//! property everything here leans on.

pub mod interpolation;
pub mod prediction;
pub mod reconcile;
pub mod session;
pub mod smoothing;
