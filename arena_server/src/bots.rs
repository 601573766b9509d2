//! Scripted participants for running a session without real players.
//!
//! Each bot is a regular `GameClient` fed with wandering input: it keeps a
//! heading for a while, then picks a new one, and jumps now and then.

use arena_client::{input::FrameInput, GameClient};
use arena_shared::net::{ParticipantId, SessionEvent};
use rand::Rng;
use tokio::sync::mpsc;

/// Seconds a bot keeps its heading, at most.
const MAX_HEADING_TIME: f32 = 2.0;
/// Chance per frame to press jump.
const JUMP_CHANCE: f64 = 0.01;

pub struct Bot {
    client: GameClient,
    heading: (f32, f32),
    heading_left: f32,
    jump_held: bool,
}

impl Bot {
    pub async fn join(
        participant: ParticipantId,
        events: mpsc::Sender<SessionEvent>,
    ) -> anyhow::Result<Self> {
        Ok(Self {
            client: GameClient::join(participant, events).await?,
            heading: (0.0, 0.0),
            heading_left: 0.0,
            jump_held: false,
        })
    }

    pub fn participant(&self) -> ParticipantId {
        self.client.participant
    }

    /// Produces this frame's input and feeds it to the client.
    pub fn frame<R: Rng + ?Sized>(&mut self, rng: &mut R, dt_sec: f32) {
        self.heading_left -= dt_sec;
        if self.heading_left <= 0.0 {
            self.heading = (rng.gen_range(-1.0..=1.0), rng.gen_range(-1.0..=1.0));
            self.heading_left = rng.gen_range(0.2..MAX_HEADING_TIME);
        }
        // Release for a frame after each press so the next press is an edge.
        self.jump_held = !self.jump_held && rng.gen_bool(JUMP_CHANCE);

        self.client.frame(
            FrameInput {
                horizontal: self.heading.0,
                vertical: self.heading.1,
                jump_held: self.jump_held,
            },
            dt_sec,
        );
    }

    /// Sends the input for the next network tick.
    pub async fn tick(&mut self) -> anyhow::Result<()> {
        self.client.tick().await?;
        Ok(())
    }

    pub async fn leave(&mut self) -> anyhow::Result<()> {
        self.client.leave().await
    }
}
