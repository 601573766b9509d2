//! Player spawning on join.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    entity::{EntityId, EntityTemplate},
    math::{Quat, Vec3},
    net::ParticipantId,
    runtime::SessionRuntime,
};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SessionPhase {
    /// Waiting for enough players.
    #[default]
    Lobby,
    /// Match running; joining players get a character.
    InMatch,
}

/// Fixed, ordered spawn points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnTable {
    points: Vec<Vec3>,
}

impl Default for SpawnTable {
    fn default() -> Self {
        Self {
            points: vec![
                Vec3::new(-3.0, 0.0, 0.0),
                Vec3::new(-1.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(3.0, 0.0, 0.0),
            ],
        }
    }
}

impl SpawnTable {
    /// Builds a table; an empty list falls back to the default points.
    pub fn new(points: Vec<Vec3>) -> Self {
        if points.is_empty() {
            Self::default()
        } else {
            Self { points }
        }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    /// Spawn point for `participant`: `id mod len`.
    pub fn point_for(&self, participant: ParticipantId) -> Vec3 {
        let index = participant.raw() as usize % self.points.len();
        self.points[index]
    }
}

/// Spawns a character for a joining participant.
///
/// Only the host spawns, and only once the match is running.
pub fn handle_join<R: SessionRuntime + ?Sized>(
    runtime: &mut R,
    phase: SessionPhase,
    participant: ParticipantId,
    table: &SpawnTable,
    template: &EntityTemplate,
) -> Option<EntityId> {
    if phase != SessionPhase::InMatch {
        debug!(participant = %participant, "join outside match, not spawning");
        return None;
    }
    if !runtime.is_host() {
        return None;
    }
    if let Some(existing) = runtime.player_object(participant) {
        return Some(existing);
    }

    let position = table.point_for(participant);
    let entity = runtime.spawn(template, position, Quat::IDENTITY, participant);
    info!(participant = %participant, entity = ?entity, ?position, "spawned player");
    Some(entity)
}
