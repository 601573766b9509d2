//! Authority handover when a participant leaves.
//!
//! Per departing entity:
//!
//! ```text
//! Active(owner) -> Orphaned -> Active(new_owner) | Despawned
//! ```
//!
//! The replacement is the first still-connected participant in the runtime's
//! enumeration order. The authority request is fire-and-forget and the
//! departing entity is despawned right after, whether or not a replacement
//! existed.

use tracing::{debug, info};

use crate::{entity::EntityId, net::ParticipantId, runtime::SessionRuntime};

/// Lifecycle of an entity whose controller is leaving.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandoverState {
    Active(ParticipantId),
    Orphaned,
    Despawned,
}

/// What `handle_departure` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandoverOutcome {
    /// The participant had no spawned entity.
    NoEntity,
    /// The departing participant did not hold authority; entity despawned.
    Despawned { entity: EntityId },
    /// Authority was requested for the replacement, then the entity despawned.
    Transferred {
        entity: EntityId,
        new_owner: ParticipantId,
        new_owner_entity: EntityId,
    },
    /// The departing participant held authority but nobody could take over.
    Abandoned { entity: EntityId },
}

impl HandoverOutcome {
    /// Sequence of states the departing entity went through.
    pub fn states(&self, departing: ParticipantId) -> Vec<HandoverState> {
        match self {
            HandoverOutcome::NoEntity => Vec::new(),
            HandoverOutcome::Despawned { .. } => {
                vec![HandoverState::Active(departing), HandoverState::Despawned]
            }
            HandoverOutcome::Transferred { new_owner, .. } => vec![
                HandoverState::Active(departing),
                HandoverState::Orphaned,
                HandoverState::Active(*new_owner),
                HandoverState::Despawned,
            ],
            HandoverOutcome::Abandoned { .. } => vec![
                HandoverState::Active(departing),
                HandoverState::Orphaned,
                HandoverState::Despawned,
            ],
        }
    }

    /// Entity that was despawned, if any.
    pub fn despawned(&self) -> Option<EntityId> {
        match self {
            HandoverOutcome::NoEntity => None,
            HandoverOutcome::Despawned { entity }
            | HandoverOutcome::Transferred { entity, .. }
            | HandoverOutcome::Abandoned { entity } => Some(*entity),
        }
    }
}

/// First connected participant other than `departing`.
pub fn find_replacement<R: SessionRuntime + ?Sized>(
    runtime: &R,
    departing: ParticipantId,
) -> Option<ParticipantId> {
    runtime
        .active_participants()
        .into_iter()
        .find(|p| *p != departing)
}

/// Reacts to `departing` being removed from the session.
pub fn handle_departure<R: SessionRuntime + ?Sized>(
    runtime: &mut R,
    departing: ParticipantId,
) -> HandoverOutcome {
    let Some(entity) = runtime.player_object(departing) else {
        debug!(participant = %departing, "departed without a player object");
        return HandoverOutcome::NoEntity;
    };

    if runtime.authority_holder(entity) != Some(departing) {
        runtime.despawn(entity);
        info!(participant = %departing, entity = ?entity, "despawned departed player");
        return HandoverOutcome::Despawned { entity };
    }

    info!(participant = %departing, entity = ?entity, "departed player held authority, handing over");

    let replacement = find_replacement(runtime, departing)
        .and_then(|p| runtime.player_object(p).map(|e| (p, e)));

    let outcome = match replacement {
        Some((new_owner, new_owner_entity)) => {
            runtime.request_authority(new_owner_entity, new_owner);
            info!(new_owner = %new_owner, entity = ?new_owner_entity, "requested authority");
            HandoverOutcome::Transferred {
                entity,
                new_owner,
                new_owner_entity,
            }
        }
        None => HandoverOutcome::Abandoned { entity },
    };

    runtime.despawn(entity);
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        math::Vec3,
        testing::{MockRuntime, Op},
    };

    const A: ParticipantId = ParticipantId(1);
    const B: ParticipantId = ParticipantId(2);
    const C: ParticipantId = ParticipantId(3);

    #[test]
    fn holder_leaving_hands_authority_to_first_other_participant() {
        let mut rt = MockRuntime::new(A);
        rt.participants = vec![A, B, C];
        let ea = rt.add_entity(A, A, Vec3::ZERO);
        let eb = rt.add_entity(B, B, Vec3::ZERO);
        let _ec = rt.add_entity(C, C, Vec3::ZERO);

        let outcome = handle_departure(&mut rt, A);

        assert_eq!(
            outcome,
            HandoverOutcome::Transferred {
                entity: ea,
                new_owner: B,
                new_owner_entity: eb
            }
        );
        assert_eq!(
            rt.ops,
            vec![Op::RequestAuthority(eb, B), Op::Despawn(ea)]
        );
        assert_eq!(
            outcome.states(A),
            vec![
                HandoverState::Active(A),
                HandoverState::Orphaned,
                HandoverState::Active(B),
                HandoverState::Despawned
            ]
        );
    }

    #[test]
    fn enumeration_order_decides_replacement() {
        let mut rt = MockRuntime::new(A);
        rt.participants = vec![C, A, B];
        let ea = rt.add_entity(A, A, Vec3::ZERO);
        let _eb = rt.add_entity(B, B, Vec3::ZERO);
        let ec = rt.add_entity(C, C, Vec3::ZERO);

        handle_departure(&mut rt, A);

        assert_eq!(rt.ops, vec![Op::RequestAuthority(ec, C), Op::Despawn(ea)]);
    }

    #[test]
    fn last_player_leaving_only_despawns() {
        let mut rt = MockRuntime::new(A);
        rt.participants = vec![A];
        let ea = rt.add_entity(A, A, Vec3::ZERO);

        let outcome = handle_departure(&mut rt, A);

        assert_eq!(outcome, HandoverOutcome::Abandoned { entity: ea });
        assert_eq!(rt.ops, vec![Op::Despawn(ea)]);
        assert!(rt.entities.is_empty());
    }

    #[test]
    fn non_holder_leaving_skips_handover() {
        let mut rt = MockRuntime::new(A);
        rt.participants = vec![A, B];
        let _ea = rt.add_entity(A, A, Vec3::ZERO);
        let eb = rt.add_entity(B, A, Vec3::ZERO);

        let outcome = handle_departure(&mut rt, B);

        assert_eq!(outcome, HandoverOutcome::Despawned { entity: eb });
        assert_eq!(rt.ops, vec![Op::Despawn(eb)]);
    }

    #[test]
    fn departure_without_entity_is_a_no_op() {
        let mut rt = MockRuntime::new(A);
        rt.participants = vec![A, B];

        assert_eq!(handle_departure(&mut rt, B), HandoverOutcome::NoEntity);
        assert!(rt.ops.is_empty());
    }

    #[test]
    fn replacement_without_entity_abandons() {
        let mut rt = MockRuntime::new(A);
        rt.participants = vec![A, B];
        let ea = rt.add_entity(A, A, Vec3::ZERO);

        let outcome = handle_departure(&mut rt, A);

        assert_eq!(outcome, HandoverOutcome::Abandoned { entity: ea });
        assert_eq!(outcome.despawned(), Some(ea));
        assert_eq!(rt.ops, vec![Op::Despawn(ea)]);
    }
}
