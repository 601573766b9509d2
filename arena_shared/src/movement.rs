//! Authoritative character movement and peer pushing.
//!
//! Runs once per fixed tick for every entity the local instance holds
//! authority over:
//! - input present: optional jump, velocity eased toward the wish velocity,
//!   collision-aware move, remember the resulting position
//! - input missing: go idle and snap back to the last good position
//! - grounded bodies lose their vertical velocity
//! - moving characters push overlapping characters apart, weighted by mass
//!
//! Entities are processed in `EntityId` order so a tick is reproducible.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::{
    authority::Authority,
    entity::EntityId,
    math::Vec3,
    runtime::NetworkRuntime,
};

/// Movement tuning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MovementConfig {
    /// Horizontal speed at full input (units/s).
    #[serde(default = "default_move_speed")]
    pub move_speed: f32,
    /// How fast velocity approaches the wish velocity (units/s per second).
    #[serde(default = "default_velocity_rate")]
    pub velocity_rate: f32,
    #[serde(default = "default_moving_mass")]
    pub moving_mass: f32,
    #[serde(default = "default_idle_mass")]
    pub idle_mass: f32,
    /// Extra radius for the peer overlap query.
    #[serde(default = "default_push_padding")]
    pub push_padding: f32,
}

fn default_move_speed() -> f32 {
    5.0
}

fn default_velocity_rate() -> f32 {
    15.0
}

fn default_moving_mass() -> f32 {
    3.0
}

fn default_idle_mass() -> f32 {
    1.0
}

fn default_push_padding() -> f32 {
    0.12
}

impl Default for MovementConfig {
    fn default() -> Self {
        Self {
            move_speed: default_move_speed(),
            velocity_rate: default_velocity_rate(),
            moving_mass: default_moving_mass(),
            idle_mass: default_idle_mass(),
            push_padding: default_push_padding(),
        }
    }
}

/// Whether a character consumed input this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MotionState {
    #[default]
    Idle,
    Moving,
}

impl MotionState {
    /// Mass is derived from the motion state and cannot be set on its own.
    pub fn mass(self, cfg: &MovementConfig) -> f32 {
        match self {
            MotionState::Idle => cfg.idle_mass,
            MotionState::Moving => cfg.moving_mass,
        }
    }
}

/// Per-entity controller state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerController {
    pub entity: EntityId,
    pub motion: MotionState,
    /// Where the entity returns to when its input goes missing.
    pub last_good_position: Vec3,
}

impl PlayerController {
    pub fn new(entity: EntityId, spawn_position: Vec3) -> Self {
        Self {
            entity,
            motion: MotionState::Idle,
            last_good_position: spawn_position,
        }
    }

    pub fn mass(&self, cfg: &MovementConfig) -> f32 {
        self.motion.mass(cfg)
    }

    /// Movement part of the tick; the caller has already proven authority.
    fn step<R: NetworkRuntime + ?Sized>(
        &mut self,
        runtime: &mut R,
        auth: &Authority,
        cfg: &MovementConfig,
    ) {
        let dt = runtime.delta_time();

        match runtime.input(self.entity) {
            Some(input) => {
                // Jump first so horizontal processing can't swallow it.
                if input.jump {
                    runtime.apply_jump_impulse(auth);
                }

                self.motion = MotionState::Moving;

                let dir = Vec3::new(input.horizontal, 0.0, input.vertical).normalize_or_zero();
                let desired = dir * cfg.move_speed;
                if let Some(view) = runtime.body(self.entity) {
                    let eased = view
                        .body
                        .velocity
                        .move_towards(desired, cfg.velocity_rate * dt);
                    runtime.set_velocity(auth, eased);
                }

                runtime.apply_move(auth, dir * cfg.move_speed * dt);

                if let Some(view) = runtime.body(self.entity) {
                    self.last_good_position = view.transform.position;
                }
            }
            None => {
                self.motion = MotionState::Idle;
                runtime.teleport(auth, self.last_good_position);
            }
        }

        if let Some(view) = runtime.body(self.entity) {
            if view.body.grounded && view.body.velocity.y != 0.0 {
                runtime.set_velocity(auth, view.body.velocity.with_y(0.0));
            }
        }
    }
}

/// All player controllers of the local simulation.
#[derive(Debug, Default)]
pub struct MovementSystem {
    config: MovementConfig,
    controllers: BTreeMap<EntityId, PlayerController>,
}

impl MovementSystem {
    pub fn new(config: MovementConfig) -> Self {
        Self {
            config,
            controllers: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &MovementConfig {
        &self.config
    }

    /// Starts controlling a freshly spawned entity.
    pub fn insert(&mut self, entity: EntityId, spawn_position: Vec3) {
        self.controllers
            .insert(entity, PlayerController::new(entity, spawn_position));
    }

    pub fn remove(&mut self, entity: EntityId) -> Option<PlayerController> {
        self.controllers.remove(&entity)
    }

    pub fn get(&self, entity: EntityId) -> Option<&PlayerController> {
        self.controllers.get(&entity)
    }

    pub fn len(&self) -> usize {
        self.controllers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.controllers.is_empty()
    }

    /// Motion state of `entity`; unknown entities count as idle.
    pub fn motion(&self, entity: EntityId) -> MotionState {
        self.controllers
            .get(&entity)
            .map(|c| c.motion)
            .unwrap_or_default()
    }

    /// Runs one fixed tick for every controlled entity.
    pub fn tick<R: NetworkRuntime + ?Sized>(&mut self, runtime: &mut R) {
        let ids: Vec<EntityId> = self.controllers.keys().copied().collect();
        for id in ids {
            self.tick_entity(runtime, id);
        }
    }

    /// Runs one fixed tick for a single entity.
    ///
    /// Without local authority this is a no-op.
    pub fn tick_entity<R: NetworkRuntime + ?Sized>(&mut self, runtime: &mut R, entity: EntityId) {
        let Some(auth) = runtime.authority(entity) else {
            return;
        };
        let Some(controller) = self.controllers.get_mut(&entity) else {
            return;
        };

        controller.step(runtime, &auth, &self.config);
        let pusher = *controller;
        self.resolve_pushes(runtime, &pusher);
    }

    /// Pushes every overlapping character the local instance holds.
    fn resolve_pushes<R: NetworkRuntime + ?Sized>(
        &self,
        runtime: &mut R,
        pusher: &PlayerController,
    ) {
        // Idle characters exert no push.
        if pusher.motion != MotionState::Moving {
            return;
        }
        let Some(view) = runtime.body(pusher.entity) else {
            return;
        };

        let query = view
            .capsule
            .query_at(view.transform.position, self.config.push_padding);
        let pusher_mass = pusher.mass(&self.config);
        let dt = runtime.delta_time();

        for target in runtime.overlap_capsule(&query) {
            if target == pusher.entity {
                continue;
            }
            let Some(target_auth) = runtime.authority(target) else {
                continue;
            };
            let Some(target_view) = runtime.body(target) else {
                continue;
            };

            let dir = (target_view.transform.position - view.transform.position)
                .with_y(0.0)
                .normalize_or_zero();
            let target_mass = self.motion(target).mass(&self.config);
            let force = pusher_mass / (pusher_mass + target_mass);
            let push = dir * force * self.config.move_speed * dt;

            let original_rotation = target_view.transform.rotation;
            runtime.apply_move(&target_auth, push);
            runtime.set_rotation(&target_auth, original_rotation);

            trace!(pusher = ?pusher.entity, target = ?target, force, "push");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        math::Quat,
        net::{InputSnapshot, ParticipantId},
        testing::{MockRuntime, Op},
    };

    const HOST: ParticipantId = ParticipantId(1);
    const OTHER: ParticipantId = ParticipantId(2);

    fn setup() -> (MockRuntime, MovementSystem) {
        (
            MockRuntime::new(HOST),
            MovementSystem::new(MovementConfig::default()),
        )
    }

    #[test]
    fn no_authority_means_no_mutation() {
        let (mut rt, mut sys) = setup();
        let e = rt.add_entity(OTHER, OTHER, Vec3::ZERO);
        sys.insert(e, Vec3::ZERO);
        rt.inputs.insert(e, InputSnapshot::new(1.0, 0.0, true));

        sys.tick(&mut rt);

        assert!(rt.ops.is_empty());
        assert_eq!(sys.motion(e), MotionState::Idle);
    }

    #[test]
    fn input_moves_and_sets_moving_mass() {
        let (mut rt, mut sys) = setup();
        let e = rt.add_entity(HOST, HOST, Vec3::ZERO);
        sys.insert(e, Vec3::ZERO);
        rt.inputs.insert(e, InputSnapshot::new(1.0, 0.0, false));

        sys.tick(&mut rt);

        let cfg = MovementConfig::default();
        let c = sys.get(e).unwrap();
        assert_eq!(c.motion, MotionState::Moving);
        assert_eq!(c.mass(&cfg), 3.0);

        let step = cfg.move_speed * rt.dt;
        assert_eq!(rt.entity(e).transform.position, Vec3::new(step, 0.0, 0.0));
        assert_eq!(c.last_good_position, Vec3::new(step, 0.0, 0.0));

        // Velocity eased by at most rate * dt toward (5, 0, 0).
        let vel = rt.entity(e).body.velocity;
        assert!((vel.x - cfg.velocity_rate * rt.dt).abs() < 1.0e-6);
    }

    #[test]
    fn diagonal_input_is_normalized() {
        let (mut rt, mut sys) = setup();
        let e = rt.add_entity(HOST, HOST, Vec3::ZERO);
        sys.insert(e, Vec3::ZERO);
        rt.inputs.insert(e, InputSnapshot::new(1.0, 1.0, false));

        sys.tick(&mut rt);

        let moved = rt.entity(e).transform.position;
        let expected = 5.0 * rt.dt;
        assert!((moved.len() - expected).abs() < 1.0e-6);
    }

    #[test]
    fn missing_input_goes_idle_and_teleports_back() {
        let (mut rt, mut sys) = setup();
        let e = rt.add_entity(HOST, HOST, Vec3::ZERO);
        sys.insert(e, Vec3::ZERO);

        rt.inputs.insert(e, InputSnapshot::new(0.0, 1.0, false));
        sys.tick(&mut rt);
        let good = rt.entity(e).transform.position;

        // Something else shoves the entity, then input goes missing.
        rt.entity_mut(e).transform.position = Vec3::new(9.0, 0.0, 9.0);
        rt.inputs.clear();
        rt.ops.clear();
        sys.tick(&mut rt);

        assert_eq!(sys.motion(e), MotionState::Idle);
        assert_eq!(sys.get(e).unwrap().mass(sys.config()), 1.0);
        assert_eq!(rt.ops[0], Op::Teleport(e, good));
        assert_eq!(rt.entity(e).transform.position, good);
    }

    #[test]
    fn jump_is_issued_before_move() {
        let (mut rt, mut sys) = setup();
        let e = rt.add_entity(HOST, HOST, Vec3::ZERO);
        sys.insert(e, Vec3::ZERO);
        rt.inputs.insert(e, InputSnapshot::new(1.0, 0.0, true));

        sys.tick(&mut rt);

        let jump_at = rt.ops.iter().position(|op| *op == Op::Jump(e)).unwrap();
        let move_at = rt
            .ops
            .iter()
            .position(|op| matches!(op, Op::Move(id, _) if *id == e))
            .unwrap();
        assert!(jump_at < move_at);
    }

    #[test]
    fn no_jump_without_jump_flag() {
        let (mut rt, mut sys) = setup();
        let e = rt.add_entity(HOST, HOST, Vec3::ZERO);
        sys.insert(e, Vec3::ZERO);
        rt.inputs.insert(e, InputSnapshot::new(1.0, 0.0, false));

        sys.tick(&mut rt);

        assert!(!rt.ops.contains(&Op::Jump(e)));
    }

    #[test]
    fn grounded_clears_vertical_velocity() {
        let (mut rt, mut sys) = setup();
        let e = rt.add_entity(HOST, HOST, Vec3::ZERO);
        sys.insert(e, Vec3::ZERO);
        rt.entity_mut(e).body.velocity = Vec3::new(0.0, -4.0, 0.0);

        sys.tick(&mut rt);

        assert_eq!(rt.entity(e).body.velocity.y, 0.0);
    }

    #[test]
    fn airborne_keeps_vertical_velocity() {
        let (mut rt, mut sys) = setup();
        let e = rt.add_entity(HOST, HOST, Vec3::ZERO);
        sys.insert(e, Vec3::ZERO);
        rt.entity_mut(e).body.grounded = false;
        rt.entity_mut(e).body.velocity = Vec3::new(0.0, -4.0, 0.0);

        sys.tick(&mut rt);

        assert_eq!(rt.entity(e).body.velocity.y, -4.0);
    }

    #[test]
    fn moving_pusher_pushes_overlapping_peer_by_mass_ratio() {
        let (mut rt, mut sys) = setup();
        let a = rt.add_entity(HOST, HOST, Vec3::ZERO);
        let b = rt.add_entity(OTHER, HOST, Vec3::new(0.8, 0.0, 0.0));
        sys.insert(a, Vec3::ZERO);
        sys.insert(b, Vec3::new(0.8, 0.0, 0.0));
        rt.inputs.insert(a, InputSnapshot::new(0.0, 0.0, false));

        sys.tick_entity(&mut rt, a);

        // Pusher moving (3), target idle (1): force 0.75.
        let expected = 0.75 * 5.0 * rt.dt;
        let pushed = rt.entity(b).transform.position;
        assert!((pushed.x - (0.8 + expected)).abs() < 1.0e-6);
        assert_eq!(pushed.y, 0.0);
        assert_eq!(pushed.z, 0.0);
    }

    #[test]
    fn push_direction_ignores_height_difference() {
        let (mut rt, mut sys) = setup();
        let a = rt.add_entity(HOST, HOST, Vec3::ZERO);
        let b = rt.add_entity(OTHER, HOST, Vec3::new(0.0, 0.5, 0.6));
        sys.insert(a, Vec3::ZERO);
        sys.insert(b, Vec3::new(0.0, 0.5, 0.6));
        rt.inputs.insert(a, InputSnapshot::default());

        sys.tick_entity(&mut rt, a);

        let push = rt
            .ops
            .iter()
            .find_map(|op| match op {
                Op::Move(id, d) if *id == b => Some(*d),
                _ => None,
            })
            .unwrap();
        assert_eq!(push.x, 0.0);
        assert_eq!(push.y, 0.0);
        assert!(push.z > 0.0);
    }

    #[test]
    fn idle_pusher_exerts_no_push() {
        let (mut rt, mut sys) = setup();
        let a = rt.add_entity(HOST, HOST, Vec3::ZERO);
        let b = rt.add_entity(OTHER, HOST, Vec3::new(0.8, 0.0, 0.0));
        sys.insert(a, Vec3::ZERO);
        sys.insert(b, Vec3::new(0.8, 0.0, 0.0));

        sys.tick_entity(&mut rt, a);

        assert!(!rt.ops.iter().any(|op| matches!(op, Op::Move(id, _) if *id == b)));
    }

    #[test]
    fn push_skipped_without_authority_over_target() {
        let (mut rt, mut sys) = setup();
        let a = rt.add_entity(HOST, HOST, Vec3::ZERO);
        let b = rt.add_entity(OTHER, OTHER, Vec3::new(0.8, 0.0, 0.0));
        sys.insert(a, Vec3::ZERO);
        sys.insert(b, Vec3::new(0.8, 0.0, 0.0));
        rt.inputs.insert(a, InputSnapshot::new(1.0, 0.0, false));

        sys.tick(&mut rt);

        assert!(rt.ops.iter().all(|op| match op {
            Op::Move(id, _) | Op::SetRotation(id, _) | Op::Teleport(id, _) => *id != b,
            _ => true,
        }));
        assert_eq!(rt.entity(b).transform.position, Vec3::new(0.8, 0.0, 0.0));
    }

    #[test]
    fn distant_peer_is_not_pushed() {
        let (mut rt, mut sys) = setup();
        let a = rt.add_entity(HOST, HOST, Vec3::ZERO);
        let b = rt.add_entity(OTHER, HOST, Vec3::new(3.0, 0.0, 0.0));
        sys.insert(a, Vec3::ZERO);
        rt.inputs.insert(a, InputSnapshot::new(1.0, 0.0, false));

        sys.tick(&mut rt);

        assert_eq!(rt.entity(b).transform.position, Vec3::new(3.0, 0.0, 0.0));
    }

    #[test]
    fn push_restores_target_rotation_exactly() {
        let (mut rt, mut sys) = setup();
        let a = rt.add_entity(HOST, HOST, Vec3::ZERO);
        let b = rt.add_entity(OTHER, HOST, Vec3::new(0.8, 0.0, 0.0));
        let facing = Quat::from_yaw(1.234);
        rt.entity_mut(b).transform.rotation = facing;
        rt.spin_on_move = Some(Quat::from_yaw(-2.0));
        sys.insert(a, Vec3::ZERO);
        rt.inputs.insert(a, InputSnapshot::new(1.0, 0.0, false));

        sys.tick_entity(&mut rt, a);

        let rot = rt.entity(b).transform.rotation;
        assert_eq!(rot.x.to_bits(), facing.x.to_bits());
        assert_eq!(rot.y.to_bits(), facing.y.to_bits());
        assert_eq!(rot.z.to_bits(), facing.z.to_bits());
        assert_eq!(rot.w.to_bits(), facing.w.to_bits());
    }

    #[test]
    fn equal_mass_push_splits_evenly() {
        let (mut rt, mut sys) = setup();
        let a = rt.add_entity(HOST, HOST, Vec3::ZERO);
        let b = rt.add_entity(OTHER, HOST, Vec3::new(0.8, 0.0, 0.0));
        sys.insert(a, Vec3::ZERO);
        sys.insert(b, Vec3::new(0.8, 0.0, 0.0));
        rt.inputs.insert(a, InputSnapshot::default());
        rt.inputs.insert(b, InputSnapshot::default());

        // Tick b first so it is moving when a pushes it.
        sys.tick_entity(&mut rt, b);
        rt.ops.clear();
        sys.tick_entity(&mut rt, a);

        let push = rt
            .ops
            .iter()
            .find_map(|op| match op {
                Op::Move(id, d) if *id == b => Some(*d),
                _ => None,
            })
            .unwrap();
        // Equal masses: force 0.5.
        assert!((push.x - 0.5 * 5.0 * rt.dt).abs() < 1.0e-6);
    }
}
