//! Entity identity and spatial state.

use serde::{Deserialize, Serialize};

use crate::{
    math::{Quat, Vec3},
    physics::Capsule,
};

/// Opaque entity id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Position and orientation of an entity.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Transform {
    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }
}

/// What the runtime needs to know to spawn a player entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityTemplate {
    pub name: String,
    pub capsule: Capsule,
}

impl Default for EntityTemplate {
    fn default() -> Self {
        Self {
            name: "Player".to_string(),
            capsule: Capsule::default(),
        }
    }
}
