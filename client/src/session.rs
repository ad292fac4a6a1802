//! Client session: the network loop tying the engines together.
//!
//! One session owns exactly one predicted character (ours) and an
//! interpolated view of everyone else's. Targeted `State` packets feed
//! reconciliation; broadcast `State` packets feed per-character
//! interpolation. Which engine a character gets is decided once, by
//! ownership, not re-branched per tick.

use crate::interpolation::{InterpolationSettings, SnapshotInterpolationEngine};
use crate::prediction::{OwnerPredictionEngine, SendSettings};
use crate::reconcile::{Correction, ReconcileSettings, ReconciliationEngine};
use crate::smoothing::{SmoothingSettings, VisualSmoothing};
use bincode::{deserialize, serialize};
use log::{debug, error, info, warn};
use shared::{
    default_world, now_ms, MotorSettings, Packet, ServerState, StaticWorld, Vec2, SPAWN_Y,
    WORLD_WIDTH,
};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};
use tokio::net::UdpSocket;
use tokio::time::{interval, sleep};

/// Produces one input reading per fixed tick. Input polling itself (keys,
/// gamepads, scripts) is outside the core; the session only consumes the
/// sampled values.
pub trait InputSource {
    /// Returns the horizontal axis in [-1, 1] and an edge-triggered jump
    /// flag.
    fn poll(&mut self) -> (f32, bool);
}

/// What the render/animation layer reads each presentation step. Pure
/// output; mutating it never affects simulation.
#[derive(Debug, Clone, Copy)]
pub struct RenderSignal {
    pub position: Vec2,
    pub velocity: Vec2,
    pub facing_right: bool,
    pub grounded: bool,
}

impl RenderSignal {
    fn new(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            facing_right: true,
            grounded: false,
        }
    }

    fn track(&mut self, position: Vec2, velocity: Vec2, grounded: bool) {
        self.position = position;
        self.velocity = velocity;
        self.grounded = grounded;
        // Facing holds its last direction while standing still.
        if velocity.x > f32::EPSILON {
            self.facing_right = true;
        } else if velocity.x < -f32::EPSILON {
            self.facing_right = false;
        }
    }
}

/// A remote character as this client sees it: interpolation plus its own
/// smoothing state.
struct RemoteCharacter {
    interpolation: SnapshotInterpolationEngine,
    smoothing: VisualSmoothing,
    signal: RenderSignal,
}

impl RemoteCharacter {
    fn new() -> Self {
        Self {
            interpolation: SnapshotInterpolationEngine::new(InterpolationSettings::default()),
            smoothing: VisualSmoothing::new(SmoothingSettings::default()),
            signal: RenderSignal::new(Vec2::ZERO),
        }
    }
}

pub struct Session<I: InputSource> {
    socket: UdpSocket,
    server_addr: SocketAddr,
    client_id: Option<u32>,
    connected: bool,

    input: I,
    world: StaticWorld,
    prediction: OwnerPredictionEngine,
    reconciliation: ReconciliationEngine,
    smoothing: VisualSmoothing,
    signal: RenderSignal,
    remotes: HashMap<u32, RemoteCharacter>,

    fake_ping_ms: u64,
    ping_ms: u64,
}

impl<I: InputSource> Session<I> {
    pub async fn new(
        server_addr: &str,
        input: I,
        fake_ping_ms: u64,
    ) -> Result<Self, Box<dyn std::error::Error>> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        let server_addr = server_addr.parse()?;
        let spawn = Vec2::new(WORLD_WIDTH / 2.0, SPAWN_Y);

        Ok(Session {
            socket,
            server_addr,
            client_id: None,
            connected: false,
            input,
            world: default_world(),
            prediction: OwnerPredictionEngine::new(
                spawn,
                MotorSettings::default(),
                SendSettings::default(),
            ),
            reconciliation: ReconciliationEngine::new(ReconcileSettings::default()),
            smoothing: VisualSmoothing::new(SmoothingSettings::default()),
            signal: RenderSignal::new(spawn),
            remotes: HashMap::new(),
            fake_ping_ms,
            ping_ms: 0,
        })
    }

    async fn connect(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        info!("Connecting to server...");
        self.send_packet(&Packet::Connect { client_version: 1 })
            .await
    }

    async fn send_packet(&self, packet: &Packet) -> Result<(), Box<dyn std::error::Error>> {
        if self.fake_ping_ms > 0 {
            sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
        }

        let data = serialize(packet)?;
        self.socket.send_to(&data, self.server_addr).await?;
        Ok(())
    }

    /// Routes one decoded packet. Split from the socket loop so state
    /// handling is testable without a live server.
    fn handle_packet(&mut self, packet: Packet, local_now_ms: u64) {
        match packet {
            Packet::Connected { client_id } => {
                info!("Connected! Client ID: {}", client_id);
                self.client_id = Some(client_id);
                self.connected = true;
            }

            Packet::State { player_id, state } => {
                if state.server_time > 0 {
                    self.ping_ms = local_now_ms.saturating_sub(state.server_time);
                }

                if Some(player_id) == self.client_id {
                    self.handle_ack(&state, local_now_ms);
                } else {
                    self.remotes
                        .entry(player_id)
                        .or_insert_with(RemoteCharacter::new)
                        .interpolation
                        .record(state, local_now_ms);
                }
            }

            Packet::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.stop();
            }

            _ => {
                warn!("Unexpected packet type");
            }
        }
    }

    /// Targeted server state for our own character.
    fn handle_ack(&mut self, state: &ServerState, local_now_ms: u64) {
        let correction =
            self.reconciliation
                .apply(state, &mut self.prediction, &self.world, local_now_ms);

        match correction {
            Correction::Drift(error) => self.smoothing.add_correction(error),
            Correction::Snap => self.smoothing.snap_to(self.prediction.predicted_position()),
        }
    }

    /// One fixed-rate simulation update: polls input, advances prediction,
    /// transmits whatever passed the rate limiter.
    async fn simulation_tick(&mut self, frame_dt: f32) {
        let (axis, jump) = self.input.poll();
        let samples = self
            .prediction
            .advance(frame_dt, axis, jump, &self.world, now_ms());

        if !self.connected {
            return;
        }
        for sample in samples {
            if let Err(e) = self.send_packet(&Packet::Input { sample }).await {
                error!("Error sending input: {}", e);
            }
        }
    }

    /// One presentation update: smooths our own predicted target and every
    /// remote character's interpolated target.
    fn render_step(&mut self, dt: f32, local_now_ms: u64) {
        let predicted = self.prediction.predicted_state();
        let presented = self.smoothing.update(predicted.position, dt);
        self.signal
            .track(presented, predicted.velocity, predicted.grounded);

        for remote in self.remotes.values_mut() {
            if let Some(state) = remote.interpolation.sample(local_now_ms) {
                let presented = remote.smoothing.update(state.position, dt);
                remote
                    .signal
                    .track(presented, state.velocity, state.grounded);
            }
        }
    }

    /// The render signal for our own character.
    pub fn own_signal(&self) -> &RenderSignal {
        &self.signal
    }

    /// The render signal for a remote character, if we have seen it.
    pub fn remote_signal(&self, player_id: u32) -> Option<&RenderSignal> {
        self.remotes.get(&player_id).map(|remote| &remote.signal)
    }

    pub fn remote_ids(&self) -> Vec<u32> {
        self.remotes.keys().copied().collect()
    }

    pub fn ping_ms(&self) -> u64 {
        self.ping_ms
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Ends the session locally: clears every buffer and counter so a
    /// reconnect starts from scratch.
    fn stop(&mut self) {
        self.connected = false;
        self.client_id = None;
        self.prediction.reset(Vec2::new(WORLD_WIDTH / 2.0, SPAWN_Y));
        self.reconciliation.reset();
        self.remotes.clear();
    }

    /// Runs the session until `duration` elapses (or forever if `None`).
    pub async fn run(
        &mut self,
        duration: Option<Duration>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        self.connect().await?;

        let mut tick_interval = interval(Duration::from_millis(16));
        let mut render_interval = interval(Duration::from_millis(16));
        let mut last_tick = Instant::now();
        let mut last_render = Instant::now();
        let started = Instant::now();

        let mut buffer = [0u8; 2048];

        loop {
            if let Some(limit) = duration {
                if started.elapsed() >= limit {
                    break;
                }
            }

            tokio::select! {
                result = self.socket.recv_from(&mut buffer) => {
                    match result {
                        Ok((len, _)) => {
                            if self.fake_ping_ms > 0 {
                                sleep(Duration::from_millis(self.fake_ping_ms / 2)).await;
                            }

                            if let Ok(packet) = deserialize::<Packet>(&buffer[0..len]) {
                                self.handle_packet(packet, now_ms());
                            }
                        },
                        Err(e) => error!("Error receiving packet: {}", e),
                    }
                },

                _ = tick_interval.tick() => {
                    let now = Instant::now();
                    let frame_dt = now.duration_since(last_tick).as_secs_f32();
                    last_tick = now;
                    self.simulation_tick(frame_dt).await;
                },

                _ = render_interval.tick() => {
                    let now = Instant::now();
                    let dt = now.duration_since(last_render).as_secs_f32();
                    last_render = now;
                    self.render_step(dt, now_ms());

                    debug!(
                        "presented ({:.1}, {:.1}) ping {}ms remotes {}",
                        self.signal.position.x,
                        self.signal.position.y,
                        self.ping_ms,
                        self.remotes.len(),
                    );
                },
            }
        }

        if self.connected {
            let _ = self.send_packet(&Packet::Disconnect).await;
        }
        self.stop();

        Ok(())
    }
}
