//! Client implementation.
//!
//! A client is one participant's local instance:
//! - announces itself to the session (join / leave)
//! - samples input every frame
//! - hands the network runtime one `InputSnapshot` per tick
//!
//! The session is reached through an event channel; how those events travel
//! between machines is the network runtime's business.

use anyhow::Context;
use arena_shared::net::{InputSnapshot, ParticipantId, SessionEvent};
use tokio::sync::mpsc;
use tracing::{debug, info};

use crate::input::{FrameInput, InputSampler};

/// Client connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    /// Joined and providing input.
    Joined,
    /// Left the session.
    Left,
}

/// High-level game client.
pub struct GameClient {
    pub participant: ParticipantId,
    pub state: ClientState,
    sampler: InputSampler,
    events: mpsc::Sender<SessionEvent>,
    tick: u32,
}

impl GameClient {
    /// Joins the session as `participant`.
    pub async fn join(
        participant: ParticipantId,
        events: mpsc::Sender<SessionEvent>,
    ) -> anyhow::Result<Self> {
        events
            .send(SessionEvent::Joined(participant))
            .await
            .context("send join")?;
        info!(participant = %participant, "Joined session");

        Ok(Self {
            participant,
            state: ClientState::Joined,
            sampler: InputSampler::default(),
            events,
            tick: 0,
        })
    }

    /// Per-frame update.
    pub fn frame(&mut self, input: FrameInput, dt_sec: f32) {
        self.sampler.frame(input, dt_sec);
    }

    pub fn sampler(&self) -> &InputSampler {
        &self.sampler
    }

    /// Provides input for the next network tick.
    ///
    /// The buffered jump is consumed here whether or not the send succeeds.
    pub async fn tick(&mut self) -> anyhow::Result<InputSnapshot> {
        let snapshot = self.sampler.build_snapshot();
        if self.state != ClientState::Joined {
            return Ok(snapshot);
        }

        self.events
            .send(SessionEvent::Input {
                participant: self.participant,
                snapshot,
            })
            .await
            .context("send input")?;
        if snapshot.jump {
            debug!(participant = %self.participant, tick = self.tick, "jump sent");
        }
        self.tick += 1;
        Ok(snapshot)
    }

    /// Number of snapshots delivered so far.
    pub fn ticks_sent(&self) -> u32 {
        self.tick
    }

    /// Leaves the session.
    pub async fn leave(&mut self) -> anyhow::Result<()> {
        if self.state == ClientState::Left {
            return Ok(());
        }
        self.events
            .send(SessionEvent::Left(self.participant))
            .await
            .context("send leave")?;
        self.state = ClientState::Left;
        info!(participant = %self.participant, "Left session");
        Ok(())
    }
}
