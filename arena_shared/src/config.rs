//! Configuration system.
//!
//! Loads arena configuration from JSON strings/files. Every field has a
//! default, so a partial file (or `{}`) is valid.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::{
    math::Vec3, matchmaking::MatchConfig, movement::MovementConfig, physics::PhysicsConfig,
    spawn::SpawnTable,
};

/// Root configuration shared by client/server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArenaConfig {
    /// Fixed simulation tick rate.
    #[serde(default = "default_tick_hz")]
    pub tick_hz: u32,
    /// Session every instance joins.
    #[serde(default = "default_session_name")]
    pub session_name: String,
    #[serde(default)]
    pub movement: MovementConfig,
    #[serde(default)]
    pub physics: PhysicsConfig,
    #[serde(default)]
    pub match_rules: MatchConfig,
    /// Spawn positions; empty means the built-in four.
    #[serde(default)]
    pub spawn_points: Vec<Vec3>,
}

fn default_tick_hz() -> u32 {
    64
}

fn default_session_name() -> String {
    "TestRoom".to_string()
}

impl Default for ArenaConfig {
    fn default() -> Self {
        Self {
            tick_hz: default_tick_hz(),
            session_name: default_session_name(),
            movement: MovementConfig::default(),
            physics: PhysicsConfig::default(),
            match_rules: MatchConfig::default(),
            spawn_points: Vec::new(),
        }
    }
}

impl ArenaConfig {
    /// Parses config from JSON.
    pub fn from_json_str(s: &str) -> serde_json::Result<Self> {
        serde_json::from_str(s)
    }

    /// Reads and parses a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("read config {}", path.display()))?;
        let cfg = Self::from_json_str(&text)
            .with_context(|| format!("parse config {}", path.display()))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Rejects values the simulation cannot run with.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.tick_hz == 0 {
            anyhow::bail!("tick_hz must be positive");
        }
        if self.movement.moving_mass <= 0.0 || self.movement.idle_mass <= 0.0 {
            anyhow::bail!("masses must be positive");
        }
        if self.match_rules.start_threshold < 2 {
            anyhow::bail!("start_threshold must be at least 2");
        }
        Ok(())
    }

    /// Fixed tick length in seconds.
    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_hz as f32
    }

    pub fn spawn_table(&self) -> SpawnTable {
        SpawnTable::new(self.spawn_points.clone())
    }
}
