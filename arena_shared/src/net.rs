//! Session-level message types.
//!
//! Transport and replication belong to the network runtime; this module only
//! defines what crosses the boundary between it and the simulation:
//! - participant identity
//! - per-tick input snapshots
//! - session events (join / leave / input)

use serde::{Deserialize, Serialize};

/// Identifies a participant (and the simulation instance it runs).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ParticipantId(pub u32);

impl ParticipantId {
    /// Raw encoded value, used for spawn-slot selection.
    pub fn raw(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[Player:{}]", self.0)
    }
}

/// Input for one tick, produced by whichever instance controls an entity.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InputSnapshot {
    pub horizontal: f32,
    pub vertical: f32,
    pub jump: bool,
}

impl InputSnapshot {
    /// Builds a snapshot with both axes clamped to `[-1, 1]`.
    pub fn new(horizontal: f32, vertical: f32, jump: bool) -> Self {
        Self {
            horizontal: clamp_axis(horizontal),
            vertical: clamp_axis(vertical),
            jump,
        }
    }
}

fn clamp_axis(v: f32) -> f32 {
    if v.is_nan() {
        0.0
    } else {
        v.clamp(-1.0, 1.0)
    }
}

/// Events delivered by the network runtime to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    Joined(ParticipantId),
    Left(ParticipantId),
    /// Input for the next tick from a participant.
    Input {
        participant: ParticipantId,
        snapshot: InputSnapshot,
    },
}
