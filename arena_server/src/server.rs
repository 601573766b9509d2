//! Server implementation.
//!
//! This is an authoritative session loop with fixed-timestep simulation. Each
//! step:
//! - runs queued console commands
//! - drains session events (join / leave / input)
//! - grants pending authority requests
//! - advances the match gate while in the lobby
//! - ticks every player controller, per authority-holding instance
//!
//! Determinism notes:
//! - Keep simulation in a fixed timestep.
//! - Avoid wall-clock-dependent branching in gameplay code.
//! - Use stable ordering when iterating collections.

use arena_shared::{
    config::ArenaConfig,
    entity::{EntityId, EntityTemplate},
    handover::{handle_departure, HandoverOutcome},
    matchmaking::{GateDecision, MatchGate},
    math::Vec3,
    movement::MovementSystem,
    net::{InputSnapshot, ParticipantId, SessionEvent},
    runtime::{NetworkRuntime, SessionRuntime},
    spawn::{handle_join, SessionPhase, SpawnTable},
};
use std::time::Duration;
use tokio::{sync::mpsc, time::Instant};
use tracing::{debug, info, warn};

use crate::runtime::{AuthorityMode, HostRuntime};

/// Capacity of the session event channel.
const EVENT_QUEUE: usize = 1024;

/// Participant id used by the server's own instance.
pub const HOST_ID: ParticipantId = ParticipantId(0);

/// Game server.
pub struct GameServer {
    pub cfg: ArenaConfig,
    runtime: HostRuntime,
    movement: MovementSystem,
    gate: MatchGate,
    phase: SessionPhase,
    spawn_table: SpawnTable,
    template: EntityTemplate,

    events_tx: mpsc::Sender<SessionEvent>,
    events_rx: mpsc::Receiver<SessionEvent>,

    tick: u32,
    shutdown: bool,

    /// Channel for console commands from stdin.
    console_rx: Option<mpsc::Receiver<String>>,
}

impl GameServer {
    /// Creates a server with the given config.
    pub fn new(cfg: ArenaConfig, mode: AuthorityMode) -> anyhow::Result<Self> {
        cfg.validate()?;

        let (events_tx, events_rx) = mpsc::channel(EVENT_QUEUE);
        let runtime = HostRuntime::new(HOST_ID, mode, cfg.tick_dt(), cfg.physics);
        info!(
            session = %cfg.session_name,
            tick_hz = cfg.tick_hz,
            ?mode,
            "Session created"
        );

        Ok(Self {
            movement: MovementSystem::new(cfg.movement),
            gate: MatchGate::new(cfg.match_rules),
            phase: SessionPhase::Lobby,
            spawn_table: cfg.spawn_table(),
            template: EntityTemplate::default(),
            runtime,
            events_tx,
            events_rx,
            tick: 0,
            shutdown: false,
            console_rx: None,
            cfg,
        })
    }

    /// Sender clients use to reach this session.
    pub fn events(&self) -> mpsc::Sender<SessionEvent> {
        self.events_tx.clone()
    }

    /// Sets the console input receiver.
    pub fn set_console_input(&mut self, rx: mpsc::Receiver<String>) {
        self.console_rx = Some(rx);
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown
    }

    pub fn runtime(&self) -> &HostRuntime {
        &self.runtime
    }

    pub fn movement(&self) -> &MovementSystem {
        &self.movement
    }

    /// Entity spawned for `participant`.
    pub fn player_entity(&self, participant: ParticipantId) -> Option<EntityId> {
        self.runtime.player_object(participant)
    }

    /// Current position of `participant`'s character.
    pub fn player_position(&self, participant: ParticipantId) -> Option<Vec3> {
        let entity = self.player_entity(participant)?;
        self.runtime.body(entity).map(|v| v.transform.position)
    }

    /// Runs the server for a number of ticks in real time.
    pub async fn run_for_ticks(&mut self, ticks: u32) -> anyhow::Result<()> {
        let dt = Duration::from_secs_f32(self.cfg.tick_dt());
        let mut next = Instant::now();

        for _ in 0..ticks {
            next += dt;
            self.step(dt.as_secs_f32())?;
            if self.shutdown {
                break;
            }
            tokio::time::sleep_until(next).await;
        }
        Ok(())
    }

    /// Executes one fixed simulation step.
    pub fn step(&mut self, dt_sec: f32) -> anyhow::Result<()> {
        self.runtime.set_delta_time(dt_sec);
        self.process_console_commands()?;
        self.drain_events();
        self.runtime.apply_authority_requests();

        if self.phase == SessionPhase::Lobby {
            self.update_gate(dt_sec);
        }

        self.simulate();
        self.runtime.end_tick();
        self.tick += 1;
        Ok(())
    }

    fn process_console_commands(&mut self) -> anyhow::Result<()> {
        // Collect lines first to avoid borrow conflict
        let lines: Vec<String> = if let Some(ref mut rx) = self.console_rx {
            let mut collected = Vec::new();
            while let Ok(line) = rx.try_recv() {
                collected.push(line);
            }
            collected
        } else {
            Vec::new()
        };

        for line in lines {
            match self.exec_console(&line) {
                Ok(out) => {
                    for l in out {
                        println!("{}", l);
                    }
                }
                Err(e) => println!("Error: {}", e),
            }
        }
        Ok(())
    }

    /// Executes a console command.
    pub fn exec_console(&mut self, line: &str) -> anyhow::Result<Vec<String>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        match tokens[0] {
            "status" => {
                let mut out = Vec::new();
                out.push(format!("Session: {}", self.cfg.session_name));
                out.push(format!("Phase: {:?}", self.phase));
                out.push(format!("Tick: {}", self.tick));
                out.push(format!("Players: {}", self.gate.status_line()));
                for p in self.runtime.active_participants() {
                    match self.player_entity(p) {
                        Some(e) => out.push(format!(
                            "  {}: entity={:?} holder={:?} pos={:?} motion={:?}",
                            p,
                            e,
                            self.runtime.authority_holder(e),
                            self.player_position(p),
                            self.movement.motion(e)
                        )),
                        None => out.push(format!("  {}: no entity", p)),
                    }
                }
                Ok(out)
            }
            "join" => {
                let p = parse_participant(&tokens)?;
                self.on_joined(p);
                Ok(vec![format!("{} joined", p)])
            }
            "leave" | "kick" => {
                let p = parse_participant(&tokens)?;
                let outcome = self.on_left(p);
                Ok(vec![format!("{} left: {:?}", p, outcome)])
            }
            "start" => {
                self.start_match();
                Ok(vec!["Match started".to_string()])
            }
            "quit" | "exit" => {
                info!("Server shutting down");
                self.shutdown = true;
                Ok(vec!["Shutting down".to_string()])
            }
            other => anyhow::bail!("unknown command: {other}"),
        }
    }

    fn drain_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                SessionEvent::Joined(p) => self.on_joined(p),
                SessionEvent::Left(p) => {
                    self.on_left(p);
                }
                SessionEvent::Input {
                    participant,
                    snapshot,
                } => self.on_input(participant, snapshot),
            }
        }
    }

    /// Handles a participant joining the session.
    pub fn on_joined(&mut self, participant: ParticipantId) {
        if !self.runtime.add_participant(participant) {
            debug!(participant = %participant, "duplicate join ignored");
            return;
        }
        info!(participant = %participant, phase = ?self.phase, "Participant joined");
        self.spawn_player(participant);
    }

    /// Handles a participant leaving: authority handover, then despawn.
    pub fn on_left(&mut self, participant: ParticipantId) -> HandoverOutcome {
        if !self.runtime.is_participant(participant) {
            warn!(participant = %participant, "leave for unknown participant");
            return HandoverOutcome::NoEntity;
        }

        self.runtime.set_acting(HOST_ID);
        let outcome = handle_departure(&mut self.runtime, participant);
        if let Some(entity) = outcome.despawned() {
            self.movement.remove(entity);
        }
        self.runtime.remove_participant(participant);
        info!(participant = %participant, ?outcome, "Participant left");
        outcome
    }

    fn on_input(&mut self, participant: ParticipantId, snapshot: InputSnapshot) {
        if !self.runtime.is_participant(participant) {
            debug!(participant = %participant, "input from unknown participant dropped");
            return;
        }
        self.runtime.submit_input(participant, snapshot);
    }

    fn spawn_player(&mut self, participant: ParticipantId) {
        self.runtime.set_acting(HOST_ID);
        let already = self.runtime.player_object(participant);
        let spawned = handle_join(
            &mut self.runtime,
            self.phase,
            participant,
            &self.spawn_table,
            &self.template,
        );
        if let Some(entity) = spawned.filter(|e| Some(*e) != already) {
            self.movement
                .insert(entity, self.spawn_table.point_for(participant));
        }
    }

    fn update_gate(&mut self, dt_sec: f32) {
        let count = self.runtime.active_participants().len();
        match self.gate.update(count, dt_sec) {
            GateDecision::Start => self.start_match(),
            GateDecision::CountingDown(left) => {
                debug!(players = count, seconds_left = left, "match countdown");
            }
            GateDecision::Waiting => {}
        }
    }

    /// Moves the session into the match and spawns everyone present.
    pub fn start_match(&mut self) {
        if self.phase == SessionPhase::InMatch {
            return;
        }
        self.phase = SessionPhase::InMatch;
        info!(players = %self.gate.status_line(), "Match starting");

        for p in self.runtime.active_participants() {
            self.spawn_player(p);
        }
    }

    fn simulate(&mut self) {
        for instance in self.runtime.authority_instances() {
            self.runtime.set_acting(instance);
            self.movement.tick(&mut self.runtime);
        }
        self.runtime.set_acting(HOST_ID);
    }
}

fn parse_participant(tokens: &[&str]) -> anyhow::Result<ParticipantId> {
    let Some(raw) = tokens.get(1) else {
        anyhow::bail!("Usage: {} <participant-id>", tokens[0]);
    };
    let id: u32 = raw
        .parse()
        .map_err(|_| anyhow::anyhow!("invalid participant id: {raw}"))?;
    Ok(ParticipantId(id))
}
