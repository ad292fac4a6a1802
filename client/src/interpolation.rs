//! Snapshot interpolation for remote characters.
//!
//! Observers never simulate a remote character; they replay its broadcast
//! history slightly in the past, far enough back that two bracketing
//! snapshots are usually on hand despite jitter, and dead-reckon briefly
//! when they are not.

use shared::{HistoryBuffer, ServerState, Vec2};

/// Tuning for the interpolation window.
#[derive(Debug, Clone, Copy)]
pub struct InterpolationSettings {
    /// Fixed rendering lag behind the estimated server clock.
    pub delay_ms: u64,
    /// Snapshots older than this are evicted from the front.
    pub horizon_ms: u64,
    /// Upper bound on forward extrapolation past the newest snapshot, in
    /// seconds.
    pub max_extrapolation: f32,
    /// Snapshot history capacity; overflow overwrites the oldest.
    pub capacity: usize,
}

impl Default for InterpolationSettings {
    fn default() -> Self {
        Self {
            delay_ms: 120,
            horizon_ms: 1000,
            max_extrapolation: 0.05,
            capacity: 64,
        }
    }
}

/// A de-jittered sample of a remote character for presentation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InterpolatedState {
    pub position: Vec2,
    pub velocity: Vec2,
    pub grounded: bool,
}

impl From<&ServerState> for InterpolatedState {
    fn from(state: &ServerState) -> Self {
        Self {
            position: state.position,
            velocity: state.velocity,
            grounded: state.grounded,
        }
    }
}

/// Runs on observer clients, one instance per remote character.
pub struct SnapshotInterpolationEngine {
    settings: InterpolationSettings,
    snapshots: HistoryBuffer<ServerState>,
    /// (server clock - local clock); first receipt only, like the
    /// reconciliation engine's offset.
    time_offset_ms: Option<i64>,
}

impl SnapshotInterpolationEngine {
    pub fn new(settings: InterpolationSettings) -> Self {
        Self {
            snapshots: HistoryBuffer::new(settings.capacity),
            settings,
            time_offset_ms: None,
        }
    }

    /// Appends a broadcast snapshot. Arrivals that are not newer than the
    /// newest retained snapshot are dropped so the history stays ordered by
    /// server time; that ordering is what makes the bracket search correct
    /// under reordered delivery.
    pub fn record(&mut self, state: ServerState, local_now_ms: u64) {
        if self.time_offset_ms.is_none() {
            self.time_offset_ms = Some(state.server_time as i64 - local_now_ms as i64);
        }

        if let Some(newest) = self.snapshots.back() {
            if state.server_time <= newest.server_time {
                return;
            }
        }
        self.snapshots.push(state);
    }

    /// Reconstructs the remote character at `estimated server now - delay`.
    ///
    /// Returns `None` only when no snapshot has ever arrived. With a single
    /// snapshot it is tracked directly; past the newest pair the state is
    /// extrapolated by at most [`InterpolationSettings::max_extrapolation`]
    /// seconds.
    pub fn sample(&mut self, local_now_ms: u64) -> Option<InterpolatedState> {
        let offset = self.time_offset_ms?;
        let est_server_now = local_now_ms as i64 + offset;

        // Evict stale history from the front.
        let cutoff = est_server_now - self.settings.horizon_ms as i64;
        self.snapshots
            .remove_front_while(|s| (s.server_time as i64) < cutoff);

        if self.snapshots.is_empty() {
            return None;
        }
        let target = est_server_now - self.settings.delay_ms as i64;

        if self.snapshots.len() == 1 {
            return self.snapshots.front().map(InterpolatedState::from);
        }

        let newest = self.snapshots.back()?;
        if target >= newest.server_time as i64 {
            // Bounded dead-reckoning past the newest snapshot.
            let overshoot = (target - newest.server_time as i64) as f32 / 1000.0;
            let ahead = overshoot.min(self.settings.max_extrapolation);
            return Some(InterpolatedState {
                position: newest.position + newest.velocity * ahead,
                velocity: newest.velocity,
                grounded: newest.grounded,
            });
        }

        // First pair (a, b) with b.server_time >= target; if the target
        // precedes the whole history this clamps to the two oldest.
        let mut index = 1;
        while index < self.snapshots.len() - 1
            && (self.snapshots[index].server_time as i64) < target
        {
            index += 1;
        }
        let a = self.snapshots[index - 1];
        let b = self.snapshots[index];

        let span = (b.server_time - a.server_time) as f32;
        let alpha = if span > 0.0 {
            ((target - a.server_time as i64) as f32 / span).clamp(0.0, 1.0)
        } else {
            0.0
        };

        // Grounded comes from the nearer endpoint; ties favor the earlier.
        let from_a = target - a.server_time as i64;
        let to_b = b.server_time as i64 - target;
        let grounded = if from_a <= to_b { a.grounded } else { b.grounded };

        Some(InterpolatedState {
            position: a.position.lerp(&b.position, alpha),
            velocity: a.velocity.lerp(&b.velocity, alpha),
            grounded,
        })
    }

    pub fn snapshot_count(&self) -> usize {
        self.snapshots.len()
    }

    /// Session teardown: drops history and the clock offset.
    pub fn reset(&mut self) {
        self.snapshots.clear();
        self.time_offset_ms = None;
    }
}
