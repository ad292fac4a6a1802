//! Client connection management for the multiplayer server
//!
//! This module handles the server-side management of connected clients:
//! - Client connection lifecycle (connect, disconnect, timeout)
//! - Per-client authoritative simulation, one engine per character
//! - Connection health monitoring and automatic cleanup
//! - Client capacity management and address tracking
//!
//! The client manager decides who participates; what their characters do is
//! delegated to each client's [`ServerAuthorityEngine`].

use crate::authority::{AuthoritySettings, ServerAuthorityEngine};
use log::info;
use rand::Rng;
use shared::{CollisionQuery, InputSample, MotorSettings, ServerState, Vec2, SPAWN_Y, WORLD_WIDTH};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

/// A connected client: connection metadata plus the authoritative engine
/// for its character.
pub struct Client {
    /// Unique client identifier assigned by the server
    pub id: u32,
    /// Network address for sending responses
    pub addr: SocketAddr,
    /// Last time we received any packet from this client
    pub last_seen: Instant,
    /// Authoritative simulation of this client's character
    pub engine: ServerAuthorityEngine,
}

impl Client {
    pub fn new(id: u32, addr: SocketAddr, spawn: Vec2) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            engine: ServerAuthorityEngine::new(
                spawn,
                MotorSettings::default(),
                AuthoritySettings::default(),
            ),
        }
    }

    /// Offers a received input to the character's engine and refreshes the
    /// activity timestamp.
    pub fn submit_input(&mut self, sample: InputSample, now_ms: u64) -> bool {
        self.last_seen = Instant::now();
        self.engine.submit(sample, now_ms)
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }
}

/// Manages all connected clients and their characters.
///
/// Enforces the capacity limit, assigns IDs and spawn positions, and fans
/// the per-tick simulation out across every connected character.
pub struct ClientManager {
    /// Connected clients indexed by their unique ID
    clients: HashMap<u32, Client>,
    /// Next available client ID for new connections
    next_client_id: u32,
    /// Maximum number of concurrent clients allowed
    max_clients: usize,
}

impl ClientManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            clients: HashMap::new(),
            next_client_id: 1,
            max_clients,
        }
    }

    /// Attempts to add a new client connection.
    ///
    /// Returns `Some(client_id)` if successful, `None` if the server is at
    /// capacity. The character spawns above the floor at a per-client slot
    /// with a little jitter so simultaneous joins don't stack exactly.
    pub fn add_client(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.clients.len() >= self.max_clients {
            return None;
        }

        let client_id = self.next_client_id;
        self.next_client_id += 1;

        let jitter: f32 = rand::thread_rng().gen_range(-10.0..10.0);
        let spawn_x = 100.0 + (client_id as f32 * 60.0) % (WORLD_WIDTH - 200.0) + jitter;
        let spawn = Vec2::new(spawn_x, SPAWN_Y);

        let client = Client::new(client_id, addr, spawn);
        info!("Client {} connected from {}", client_id, addr);
        self.clients.insert(client_id, client);

        Some(client_id)
    }

    /// Removes a client from the server. Returns true if the client was
    /// found and removed, false if they were already gone.
    pub fn remove_client(&mut self, client_id: &u32) -> bool {
        if let Some(client) = self.clients.remove(client_id) {
            info!("Client {} disconnected", client.id);
            true
        } else {
            false
        }
    }

    /// Finds a client ID by their network address.
    pub fn find_client_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.clients
            .iter()
            .find(|(_, client)| client.addr == addr)
            .map(|(id, _)| *id)
    }

    /// Routes a received input to the owning character's engine. Returns
    /// false if the client ID is invalid.
    pub fn submit_input(&mut self, client_id: u32, sample: InputSample, now_ms: u64) -> bool {
        if let Some(client) = self.clients.get_mut(&client_id) {
            client.submit_input(sample, now_ms)
        } else {
            false
        }
    }

    /// Advances every connected character by one server tick. Returns the
    /// per-character states to report, paired with the owning client ID.
    pub fn tick_all<W: CollisionQuery + ?Sized>(
        &mut self,
        world: &W,
        dt: f32,
        now_ms: u64,
        server_time: u64,
    ) -> Vec<(u32, ServerState)> {
        let mut states: Vec<(u32, ServerState)> = self
            .clients
            .iter_mut()
            .map(|(id, client)| (*id, client.engine.tick(world, dt, now_ms, server_time)))
            .collect();

        // Stable report order regardless of map iteration.
        states.sort_by_key(|(id, _)| *id);
        states
    }

    /// Checks for and removes timed-out clients. Returns the removed IDs
    /// for cleanup in other systems.
    pub fn check_timeouts(&mut self) -> Vec<u32> {
        let timeout = Duration::from_secs(5);
        let timed_out: Vec<u32> = self
            .clients
            .iter()
            .filter(|(_, client)| client.is_timed_out(timeout))
            .map(|(id, _)| *id)
            .collect();

        for client_id in &timed_out {
            self.remove_client(client_id);
        }

        timed_out
    }

    /// All client IDs and their network addresses, for packet distribution.
    pub fn get_client_addrs(&self) -> Vec<(u32, SocketAddr)> {
        self.clients
            .iter()
            .map(|(id, client)| (*id, client.addr))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
