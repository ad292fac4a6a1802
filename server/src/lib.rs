//! # Game Server Library
//!
//! Authoritative server for the networked platformer. The server is the
//! only place characters actually move: clients propose inputs, the server
//! simulates them with the shared motor on its own clock, and the resulting
//! states flow back out for reconciliation and interpolation.
//!
//! ## Core Responsibilities
//!
//! ### Authoritative Simulation
//! Each connected character is advanced once per server tick using the
//! latest input received for it. Missing, stale, or reordered inputs never
//! stall the simulation; a silent client simply coasts to a stop under the
//! motor's normal deceleration and gravity.
//!
//! ### Client Management
//! Handles the complete lifecycle of client connections including
//! connection establishment, character spawning, input routing, timeout
//! detection, and cleanup.
//!
//! ### State Reporting
//! Every tick, each character's authoritative state is sent two ways: a
//! targeted packet to the owner (carrying the acknowledged input sequence
//! their reconciliation needs) and a broadcast to everyone else (feeding
//! their snapshot interpolation).
//!
//! ## Module Organization
//!
//! ### Authority Module (`authority`)
//! The per-character simulation engine: latest-input selection with
//! monotonic sequence replacement, input staleness handling, single-shot
//! jump consumption, and state reporting.
//!
//! ### Client Manager Module (`client_manager`)
//! Connection tracking, ID and spawn assignment, capacity enforcement, and
//! fan-out of the per-tick simulation across all connected characters.
//!
//! ### Network Module (`network`)
//! UDP socket management, packet routing, and the main event loop
//! coordinating receiver, sender, and timeout tasks around the fixed tick.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::network::Server;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new(
//!         "127.0.0.1:8080",
//!         Duration::from_millis(16), // 60Hz
//!         16
//!     ).await?;
//!
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod authority;
pub mod client_manager;
pub mod network;
