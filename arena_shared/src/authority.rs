//! State authority bookkeeping.
//!
//! Every entity has at most one holder: the participant whose simulation
//! instance may mutate it. The only way to obtain an [`Authority`] proof is
//! [`AuthorityTable::check`], and every mutating runtime primitive takes one,
//! so writes without a prior authority check do not compile.

use std::collections::HashMap;

use crate::{entity::EntityId, net::ParticipantId};

/// Proof that the local instance holds state authority over one entity.
///
/// Neither `Clone` nor `Copy`: a proof is obtained for a single tick and
/// dropped with it.
#[derive(Debug, PartialEq, Eq)]
pub struct Authority {
    entity: EntityId,
}

impl Authority {
    /// Entity this proof grants write access to.
    pub fn entity(&self) -> EntityId {
        self.entity
    }
}

/// Authority operation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthorityError {
    /// The entity has no registered holder.
    NotSpawned(EntityId),
    /// The entity already has a holder.
    AlreadyHeld {
        entity: EntityId,
        holder: ParticipantId,
    },
}

impl std::fmt::Display for AuthorityError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthorityError::NotSpawned(e) => write!(f, "entity {:?} has no authority holder", e),
            AuthorityError::AlreadyHeld { entity, holder } => {
                write!(f, "entity {:?} is already held by {}", entity, holder)
            }
        }
    }
}

impl std::error::Error for AuthorityError {}

/// Single-writer holder map.
#[derive(Debug, Default)]
pub struct AuthorityTable {
    holders: HashMap<EntityId, ParticipantId>,
}

impl AuthorityTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the first holder of a freshly spawned entity.
    pub fn grant(&mut self, entity: EntityId, holder: ParticipantId) -> Result<(), AuthorityError> {
        if let Some(&existing) = self.holders.get(&entity) {
            return Err(AuthorityError::AlreadyHeld {
                entity,
                holder: existing,
            });
        }
        self.holders.insert(entity, holder);
        Ok(())
    }

    /// Moves authority to `new_holder`, returning the previous holder.
    pub fn transfer(
        &mut self,
        entity: EntityId,
        new_holder: ParticipantId,
    ) -> Result<ParticipantId, AuthorityError> {
        let slot = self
            .holders
            .get_mut(&entity)
            .ok_or(AuthorityError::NotSpawned(entity))?;
        Ok(std::mem::replace(slot, new_holder))
    }

    /// Forgets the entity (on despawn).
    pub fn revoke(&mut self, entity: EntityId) -> Option<ParticipantId> {
        self.holders.remove(&entity)
    }

    pub fn holder(&self, entity: EntityId) -> Option<ParticipantId> {
        self.holders.get(&entity).copied()
    }

    /// Issues a write proof if `instance` currently holds `entity`.
    pub fn check(&self, entity: EntityId, instance: ParticipantId) -> Option<Authority> {
        (self.holder(entity) == Some(instance)).then_some(Authority { entity })
    }

    /// Entities currently held by `instance`.
    pub fn held_by(&self, instance: ParticipantId) -> impl Iterator<Item = EntityId> + '_ {
        self.holders
            .iter()
            .filter(move |(_, h)| **h == instance)
            .map(|(e, _)| *e)
    }
}
