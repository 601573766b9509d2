//! Recording runtime double for unit tests.

use std::collections::BTreeMap;

use crate::{
    authority::{Authority, AuthorityTable},
    entity::{EntityId, EntityTemplate, Transform},
    math::{Quat, Vec3},
    net::{InputSnapshot, ParticipantId},
    physics::{Capsule, CapsuleQuery, CharacterBody},
    runtime::{BodyView, NetworkRuntime, SessionRuntime},
};

/// Every primitive call the code under test made, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Op {
    SetVelocity(EntityId, Vec3),
    Move(EntityId, Vec3),
    Jump(EntityId),
    Teleport(EntityId, Vec3),
    SetRotation(EntityId, Quat),
    Spawn(EntityId, ParticipantId, Vec3),
    Despawn(EntityId),
    RequestAuthority(EntityId, ParticipantId),
}

pub struct MockEntity {
    pub owner: ParticipantId,
    pub transform: Transform,
    pub capsule: Capsule,
    pub body: CharacterBody,
}

/// Moves add the delta verbatim; grounded state is whatever the test sets.
pub struct MockRuntime {
    pub local: ParticipantId,
    pub host: bool,
    pub dt: f32,
    pub entities: BTreeMap<EntityId, MockEntity>,
    pub authority: AuthorityTable,
    pub inputs: BTreeMap<EntityId, InputSnapshot>,
    pub participants: Vec<ParticipantId>,
    pub ops: Vec<Op>,
    /// Rotation applied by every move, to observe restore behaviour.
    pub spin_on_move: Option<Quat>,
    next_id: u64,
}

impl MockRuntime {
    pub fn new(local: ParticipantId) -> Self {
        Self {
            local,
            host: true,
            dt: 1.0 / 64.0,
            entities: BTreeMap::new(),
            authority: AuthorityTable::new(),
            inputs: BTreeMap::new(),
            participants: vec![local],
            ops: Vec::new(),
            spin_on_move: None,
            next_id: 1,
        }
    }

    /// Inserts an entity without recording a spawn op.
    pub fn add_entity(&mut self, owner: ParticipantId, holder: ParticipantId, pos: Vec3) -> EntityId {
        let id = EntityId(self.next_id);
        self.next_id += 1;
        self.entities.insert(
            id,
            MockEntity {
                owner,
                transform: Transform::new(pos, Quat::IDENTITY),
                capsule: Capsule::default(),
                body: CharacterBody {
                    velocity: Vec3::ZERO,
                    grounded: true,
                },
            },
        );
        self.authority.grant(id, holder).unwrap();
        id
    }

    pub fn entity(&self, id: EntityId) -> &MockEntity {
        &self.entities[&id]
    }

    pub fn entity_mut(&mut self, id: EntityId) -> &mut MockEntity {
        self.entities.get_mut(&id).unwrap()
    }
}

impl NetworkRuntime for MockRuntime {
    fn delta_time(&self) -> f32 {
        self.dt
    }

    fn authority(&self, entity: EntityId) -> Option<Authority> {
        self.authority.check(entity, self.local)
    }

    fn input(&self, entity: EntityId) -> Option<InputSnapshot> {
        self.inputs.get(&entity).copied()
    }

    fn body(&self, entity: EntityId) -> Option<BodyView> {
        self.entities.get(&entity).map(|e| BodyView {
            transform: e.transform,
            capsule: e.capsule,
            body: e.body,
        })
    }

    fn overlap_capsule(&self, query: &CapsuleQuery) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, e)| e.capsule.query_at(e.transform.position, 0.0).overlaps(query))
            .map(|(id, _)| *id)
            .collect()
    }

    fn set_velocity(&mut self, auth: &Authority, velocity: Vec3) {
        self.ops.push(Op::SetVelocity(auth.entity(), velocity));
        self.entity_mut(auth.entity()).body.velocity = velocity;
    }

    fn apply_move(&mut self, auth: &Authority, delta: Vec3) {
        self.ops.push(Op::Move(auth.entity(), delta));
        let spin = self.spin_on_move;
        let e = self.entity_mut(auth.entity());
        e.transform.position += delta;
        if let Some(rot) = spin {
            e.transform.rotation = rot;
        }
    }

    fn apply_jump_impulse(&mut self, auth: &Authority) {
        self.ops.push(Op::Jump(auth.entity()));
        let e = self.entity_mut(auth.entity());
        e.body.velocity.y += 8.0;
        e.body.grounded = false;
    }

    fn teleport(&mut self, auth: &Authority, position: Vec3) {
        self.ops.push(Op::Teleport(auth.entity(), position));
        self.entity_mut(auth.entity()).transform.position = position;
    }

    fn set_rotation(&mut self, auth: &Authority, rotation: Quat) {
        self.ops.push(Op::SetRotation(auth.entity(), rotation));
        self.entity_mut(auth.entity()).transform.rotation = rotation;
    }
}

impl SessionRuntime for MockRuntime {
    fn is_host(&self) -> bool {
        self.host
    }

    fn active_participants(&self) -> Vec<ParticipantId> {
        self.participants.clone()
    }

    fn player_object(&self, participant: ParticipantId) -> Option<EntityId> {
        self.entities
            .iter()
            .find(|(_, e)| e.owner == participant)
            .map(|(id, _)| *id)
    }

    fn authority_holder(&self, entity: EntityId) -> Option<ParticipantId> {
        self.authority.holder(entity)
    }

    fn spawn(
        &mut self,
        template: &EntityTemplate,
        position: Vec3,
        rotation: Quat,
        owner: ParticipantId,
    ) -> EntityId {
        let id = self.add_entity(owner, self.local, position);
        let e = self.entity_mut(id);
        e.transform.rotation = rotation;
        e.capsule = template.capsule;
        self.ops.push(Op::Spawn(id, owner, position));
        id
    }

    fn despawn(&mut self, entity: EntityId) {
        self.ops.push(Op::Despawn(entity));
        self.entities.remove(&entity);
        self.authority.revoke(entity);
    }

    fn request_authority(&mut self, entity: EntityId, new_owner: ParticipantId) {
        self.ops.push(Op::RequestAuthority(entity, new_owner));
    }
}
