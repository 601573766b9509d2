//! Physics primitives.
//!
//! A deterministic kinematic character model over a flat ground plane:
//! - capsule colliders (Y-aligned) and capsule overlap tests
//! - gravity, jump impulse and ground snapping for character bodies
//!
//! Entity positions are the capsule's base; the collider center is offset by
//! `Capsule::center`.

use serde::{Deserialize, Serialize};

use crate::{entity::Transform, math::Vec3};

/// Physics parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsConfig {
    #[serde(default = "default_gravity")]
    pub gravity: Vec3,
    /// Upward speed added by a jump (units/s).
    #[serde(default = "default_jump_impulse")]
    pub jump_impulse: f32,
    /// Height of the ground plane.
    #[serde(default)]
    pub ground_height: f32,
}

fn default_gravity() -> Vec3 {
    Vec3::new(0.0, -9.81, 0.0)
}

fn default_jump_impulse() -> f32 {
    8.0
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            gravity: default_gravity(),
            jump_impulse: default_jump_impulse(),
            ground_height: 0.0,
        }
    }
}

/// Y-aligned capsule collider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Capsule {
    pub height: f32,
    pub radius: f32,
    /// Offset of the capsule center from the entity position.
    pub center: Vec3,
}

impl Default for Capsule {
    fn default() -> Self {
        Self {
            height: 2.0,
            radius: 0.5,
            center: Vec3::new(0.0, 1.0, 0.0),
        }
    }
}

impl Capsule {
    /// Overlap query volume for this collider at `position`, with `padding`
    /// added to the radius.
    pub fn query_at(&self, position: Vec3, padding: f32) -> CapsuleQuery {
        let center = position + self.center;
        let half_segment = (self.height / 2.0 - self.radius).max(0.0);
        CapsuleQuery {
            bottom: center - Vec3::UP * half_segment,
            top: center + Vec3::UP * half_segment,
            radius: self.radius + padding,
        }
    }
}

/// A capsule in world space, described by its segment endpoints.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapsuleQuery {
    pub bottom: Vec3,
    pub top: Vec3,
    pub radius: f32,
}

impl CapsuleQuery {
    /// Whether two Y-aligned capsules intersect (touching counts).
    pub fn overlaps(&self, other: &CapsuleQuery) -> bool {
        let dx = self.bottom.x - other.bottom.x;
        let dz = self.bottom.z - other.bottom.z;
        let lo = self.bottom.y.max(other.bottom.y);
        let hi = self.top.y.min(other.top.y);
        let gap_y = (lo - hi).max(0.0);
        let reach = self.radius + other.radius;
        dx * dx + dz * dz + gap_y * gap_y <= reach * reach
    }
}

/// Kinematic state of a character.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct CharacterBody {
    pub velocity: Vec3,
    pub grounded: bool,
}

impl CharacterBody {
    /// Adds the jump impulse when standing on the ground.
    ///
    /// Returns whether the impulse was applied.
    pub fn jump(&mut self, cfg: &PhysicsConfig) -> bool {
        if !self.grounded {
            return false;
        }
        self.velocity.y += cfg.jump_impulse;
        self.grounded = false;
        true
    }

    /// Moves `transform` by the horizontal `delta` plus this tick's gravity
    /// contribution, snapping to the ground plane.
    pub fn move_by(
        &mut self,
        transform: &mut Transform,
        delta: Vec3,
        dt_sec: f32,
        cfg: &PhysicsConfig,
    ) {
        let mut vy = self.velocity.y;
        if self.grounded && vy < 0.0 {
            vy = 0.0;
        }
        vy += cfg.gravity.y * dt_sec;

        let mut next = transform.position + delta.with_y(delta.y + vy * dt_sec);
        if next.y <= cfg.ground_height {
            next.y = cfg.ground_height;
            vy = vy.max(0.0);
            self.grounded = true;
        } else {
            self.grounded = false;
        }

        transform.position = next;
        self.velocity.y = vy;
    }
}
