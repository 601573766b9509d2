//! Network runtime abstraction.
//!
//! The simulation never talks to a transport directly. Whatever drives the
//! session (an in-process host, a real netcode layer, a test double) implements
//! these traits and is passed to the controllers by reference.

use crate::{
    authority::Authority,
    entity::{EntityId, EntityTemplate, Transform},
    math::{Quat, Vec3},
    net::{InputSnapshot, ParticipantId},
    physics::{Capsule, CapsuleQuery, CharacterBody},
};

/// Read-only view of an entity's physical state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BodyView {
    pub transform: Transform,
    pub capsule: Capsule,
    pub body: CharacterBody,
}

/// Per-tick simulation view of the network runtime.
pub trait NetworkRuntime {
    /// Fixed tick length in seconds.
    fn delta_time(&self) -> f32;

    /// Write proof if the local instance holds state authority over `entity`.
    fn authority(&self, entity: EntityId) -> Option<Authority>;

    /// Input for the current tick from whoever controls `entity`.
    fn input(&self, entity: EntityId) -> Option<InputSnapshot>;

    fn body(&self, entity: EntityId) -> Option<BodyView>;

    /// Entities whose colliders intersect `query`.
    fn overlap_capsule(&self, query: &CapsuleQuery) -> Vec<EntityId>;

    fn set_velocity(&mut self, auth: &Authority, velocity: Vec3);

    /// Collision and gravity aware displacement.
    fn apply_move(&mut self, auth: &Authority, delta: Vec3);

    fn apply_jump_impulse(&mut self, auth: &Authority);

    fn teleport(&mut self, auth: &Authority, position: Vec3);

    fn set_rotation(&mut self, auth: &Authority, rotation: Quat);
}

/// Session lifecycle operations of the network runtime.
pub trait SessionRuntime: NetworkRuntime {
    /// Whether the local instance is the host (the spawning authority).
    fn is_host(&self) -> bool;

    /// Connected participants in the runtime's enumeration order.
    fn active_participants(&self) -> Vec<ParticipantId>;

    /// Entity spawned for `participant`, if any.
    fn player_object(&self, participant: ParticipantId) -> Option<EntityId>;

    /// Instance currently holding authority over `entity`.
    fn authority_holder(&self, entity: EntityId) -> Option<ParticipantId>;

    fn spawn(
        &mut self,
        template: &EntityTemplate,
        position: Vec3,
        rotation: Quat,
        owner: ParticipantId,
    ) -> EntityId;

    fn despawn(&mut self, entity: EntityId);

    /// Asks for authority over `entity` on behalf of `new_owner`.
    ///
    /// Fire-and-forget: the grant may land on a later tick.
    fn request_authority(&mut self, entity: EntityId, new_owner: ParticipantId);
}
