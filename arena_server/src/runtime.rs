//! In-process network runtime.
//!
//! Stands in for the netcode layer when the whole session runs inside one
//! process: it owns entity state, the authority table, the participant list
//! and the inputs received for the current tick.
//!
//! In `Host` mode the host instance holds authority over every entity. In
//! `Shared` mode each participant holds its own entity, and the server
//! simulates every instance in turn through [`HostRuntime::set_acting`].

use std::collections::{BTreeMap, HashMap};

use arena_shared::{
    authority::{Authority, AuthorityTable},
    entity::{EntityId, EntityTemplate, Transform},
    math::{Quat, Vec3},
    net::{InputSnapshot, ParticipantId},
    physics::{Capsule, CapsuleQuery, CharacterBody, PhysicsConfig},
    runtime::{BodyView, NetworkRuntime, SessionRuntime},
};
use tracing::{debug, warn};

/// Who holds authority over newly spawned entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthorityMode {
    #[default]
    Host,
    Shared,
}

#[derive(Debug, Clone)]
struct SimEntity {
    owner: ParticipantId,
    transform: Transform,
    capsule: Capsule,
    body: CharacterBody,
}

/// Single-process implementation of the runtime traits.
pub struct HostRuntime {
    host: ParticipantId,
    acting: ParticipantId,
    mode: AuthorityMode,
    dt: f32,
    physics: PhysicsConfig,
    entities: BTreeMap<EntityId, SimEntity>,
    authority: AuthorityTable,
    participants: Vec<ParticipantId>,
    inputs: HashMap<ParticipantId, InputSnapshot>,
    authority_requests: Vec<(EntityId, ParticipantId)>,
    next_id: u64,
}

impl HostRuntime {
    pub fn new(host: ParticipantId, mode: AuthorityMode, dt: f32, physics: PhysicsConfig) -> Self {
        Self {
            host,
            acting: host,
            mode,
            dt,
            physics,
            entities: BTreeMap::new(),
            authority: AuthorityTable::new(),
            participants: Vec::new(),
            inputs: HashMap::new(),
            authority_requests: Vec::new(),
            next_id: 1,
        }
    }

    pub fn host(&self) -> ParticipantId {
        self.host
    }

    pub fn mode(&self) -> AuthorityMode {
        self.mode
    }

    /// Simulates as `instance` until changed.
    pub fn set_acting(&mut self, instance: ParticipantId) {
        self.acting = instance;
    }

    pub fn acting(&self) -> ParticipantId {
        self.acting
    }

    pub fn set_delta_time(&mut self, dt: f32) {
        self.dt = dt;
    }

    /// Adds a participant; returns false if already present.
    pub fn add_participant(&mut self, participant: ParticipantId) -> bool {
        if self.participants.contains(&participant) {
            return false;
        }
        self.participants.push(participant);
        true
    }

    pub fn remove_participant(&mut self, participant: ParticipantId) {
        self.participants.retain(|p| *p != participant);
        self.inputs.remove(&participant);
    }

    pub fn is_participant(&self, participant: ParticipantId) -> bool {
        self.participants.contains(&participant)
    }

    /// Stores `participant`'s input for the coming tick.
    ///
    /// Several snapshots before one tick merge: latest axes win, jump
    /// stays set until the tick consumes it.
    pub fn submit_input(&mut self, participant: ParticipantId, snapshot: InputSnapshot) {
        self.inputs
            .entry(participant)
            .and_modify(|queued| {
                let jump = queued.jump || snapshot.jump;
                *queued = InputSnapshot { jump, ..snapshot };
            })
            .or_insert(snapshot);
    }

    /// Discards this tick's inputs; each snapshot is consumed once.
    pub fn end_tick(&mut self) {
        self.inputs.clear();
    }

    /// Grants queued authority requests. Returns how many changed hands.
    pub fn apply_authority_requests(&mut self) -> usize {
        let mut granted = 0;
        for (entity, new_owner) in std::mem::take(&mut self.authority_requests) {
            match self.authority.transfer(entity, new_owner) {
                Ok(previous) if previous != new_owner => {
                    debug!(entity = ?entity, from = %previous, to = %new_owner, "authority transferred");
                    granted += 1;
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "authority request dropped"),
            }
        }
        granted
    }

    /// Instances holding at least one entity, in id order.
    pub fn authority_instances(&self) -> Vec<ParticipantId> {
        let mut out: Vec<ParticipantId> = self
            .entities
            .keys()
            .filter_map(|e| self.authority.holder(*e))
            .collect();
        out.sort();
        out.dedup();
        out
    }

    pub fn entity_ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entities.keys().copied()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn owner_of(&self, entity: EntityId) -> Option<ParticipantId> {
        self.entities.get(&entity).map(|e| e.owner)
    }
}

impl NetworkRuntime for HostRuntime {
    fn delta_time(&self) -> f32 {
        self.dt
    }

    fn authority(&self, entity: EntityId) -> Option<Authority> {
        self.authority.check(entity, self.acting)
    }

    fn input(&self, entity: EntityId) -> Option<InputSnapshot> {
        let owner = self.entities.get(&entity)?.owner;
        self.inputs.get(&owner).copied()
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
        if let Some(e) = self.entities.get_mut(&auth.entity()) {
            e.body.velocity = velocity;
        }
    }

    fn apply_move(&mut self, auth: &Authority, delta: Vec3) {
        let (dt, physics) = (self.dt, self.physics);
        if let Some(e) = self.entities.get_mut(&auth.entity()) {
            e.body.move_by(&mut e.transform, delta, dt, &physics);
        }
    }

    fn apply_jump_impulse(&mut self, auth: &Authority) {
        let physics = self.physics;
        if let Some(e) = self.entities.get_mut(&auth.entity()) {
            e.body.jump(&physics);
        }
    }

    fn teleport(&mut self, auth: &Authority, position: Vec3) {
        if let Some(e) = self.entities.get_mut(&auth.entity()) {
            e.transform.position = position;
        }
    }

    fn set_rotation(&mut self, auth: &Authority, rotation: Quat) {
        if let Some(e) = self.entities.get_mut(&auth.entity()) {
            e.transform.rotation = rotation;
        }
    }
}

impl SessionRuntime for HostRuntime {
    fn is_host(&self) -> bool {
        self.acting == self.host
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
        let id = EntityId(self.next_id);
        self.next_id += 1;

        self.entities.insert(
            id,
            SimEntity {
                owner,
                transform: Transform::new(position, rotation),
                capsule: template.capsule,
                body: CharacterBody {
                    velocity: Vec3::ZERO,
                    grounded: position.y <= self.physics.ground_height,
                },
            },
        );

        let holder = match self.mode {
            AuthorityMode::Host => self.host,
            AuthorityMode::Shared => owner,
        };
        if let Err(e) = self.authority.grant(id, holder) {
            warn!(error = %e, "spawned entity already had a holder");
        }
        id
    }

    fn despawn(&mut self, entity: EntityId) {
        self.entities.remove(&entity);
        self.authority.revoke(entity);
        self.authority_requests.retain(|(e, _)| *e != entity);
    }

    fn request_authority(&mut self, entity: EntityId, new_owner: ParticipantId) {
        self.authority_requests.push((entity, new_owner));
    }
}
