//! Match start gate.
//!
//! Decides when a waiting session moves into the match:
//! - enough players: start right away
//! - exactly two players: start after a countdown
//! - fewer: keep waiting, and a running countdown is cancelled

use serde::{Deserialize, Serialize};

/// Match start rules.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MatchConfig {
    /// Player count that starts the match immediately.
    #[serde(default = "default_start_threshold")]
    pub start_threshold: usize,
    /// Countdown (seconds) used when two players are waiting.
    #[serde(default = "default_wait_time")]
    pub wait_time: f32,
}

fn default_start_threshold() -> usize {
    3
}

fn default_wait_time() -> f32 {
    10.0
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            start_threshold: default_start_threshold(),
            wait_time: default_wait_time(),
        }
    }
}

/// Result of one gate update.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GateDecision {
    Waiting,
    /// Countdown running; seconds left.
    CountingDown(f32),
    Start,
}

/// Lobby countdown state.
#[derive(Debug, Clone)]
pub struct MatchGate {
    config: MatchConfig,
    countdown: Option<f32>,
    player_count: usize,
}

impl MatchGate {
    pub fn new(config: MatchConfig) -> Self {
        Self {
            config,
            countdown: None,
            player_count: 0,
        }
    }

    /// Feeds the current player count and elapsed time.
    pub fn update(&mut self, player_count: usize, dt_sec: f32) -> GateDecision {
        self.player_count = player_count;

        if player_count >= self.config.start_threshold {
            return GateDecision::Start;
        }

        if player_count == 2 {
            let remaining = self.countdown.get_or_insert(self.config.wait_time);
            *remaining -= dt_sec;
            if *remaining <= 0.0 {
                return GateDecision::Start;
            }
            return GateDecision::CountingDown(*remaining);
        }

        self.countdown = None;
        GateDecision::Waiting
    }

    pub fn is_counting(&self) -> bool {
        self.countdown.is_some()
    }

    /// Lobby header text, e.g. `2/3`.
    pub fn status_line(&self) -> String {
        format!("{}/{}", self.player_count, self.config.start_threshold)
    }
}
