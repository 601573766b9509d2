//! Standalone server binary.
//!
//! Usage:
//!   cargo run -p arena_server -- [--config arena.json] [--tick-hz 64] [--bots 3] [--shared]
//!
//! The server hosts one session, runs the fixed timestep simulation and drives
//! a number of scripted bots through the same input path real clients use.
//!
//! Console commands:
//!   status           - Show session status
//!   join <id>        - Add a participant
//!   leave <id>       - Remove a participant (authority handover + despawn)
//!   start            - Start the match now
//!   quit             - Shutdown server

use std::env;
use std::io::{BufRead, Write};
use std::time::Duration;

use anyhow::Context;
use arena_server::{bots::Bot, AuthorityMode, GameServer};
use arena_shared::{config::ArenaConfig, net::ParticipantId};
use tokio::sync::mpsc;
use tracing::{info, warn};

struct Args {
    cfg: ArenaConfig,
    bots: u32,
    mode: AuthorityMode,
}

fn parse_args(args: &[String]) -> anyhow::Result<Args> {
    // Config file first so flags can override it.
    let mut cfg = match args.iter().position(|a| a == "--config") {
        Some(i) => {
            let path = args.get(i + 1).context("--config needs a path")?;
            ArenaConfig::load(path)?
        }
        None => ArenaConfig::default(),
    };
    let mut bots = 3;
    let mut mode = AuthorityMode::Host;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--tick-hz" if i + 1 < args.len() => {
                cfg.tick_hz = args[i + 1].parse().unwrap_or(64);
                i += 2;
            }
            "--bots" if i + 1 < args.len() => {
                bots = args[i + 1].parse().unwrap_or(3);
                i += 2;
            }
            "--shared" => {
                mode = AuthorityMode::Shared;
                i += 1;
            }
            _ => i += 1,
        }
    }
    cfg.validate()?;
    Ok(Args { cfg, bots, mode })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let Args { cfg, bots, mode } = parse_args(&args)?;
    let tick_interval = Duration::from_secs_f32(cfg.tick_dt());
    let dt = cfg.tick_dt();

    let mut server = GameServer::new(cfg, mode).context("create server")?;

    // Set up console input channel.
    let (console_tx, console_rx) = mpsc::channel::<String>(32);
    server.set_console_input(console_rx);

    // Spawn stdin reader thread.
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        let mut stdout = std::io::stdout();
        loop {
            print!("] ");
            let _ = stdout.flush();
            let mut line = String::new();
            if stdin.lock().read_line(&mut line).is_err() {
                break;
            }
            let line = line.trim().to_string();
            if !line.is_empty() && console_tx.blocking_send(line).is_err() {
                break;
            }
        }
    });

    let mut crew = Vec::new();
    for id in 1..=bots {
        crew.push(Bot::join(ParticipantId(id), server.events()).await?);
    }
    info!(bots = crew.len(), "Bots joined");

    println!("Server running. Type 'status' for info, 'quit' to exit.");
    println!();

    let mut rng = rand::thread_rng();
    let mut ticker = tokio::time::interval(tick_interval);
    loop {
        ticker.tick().await;

        for bot in &mut crew {
            bot.frame(&mut rng, dt);
            if let Err(e) = bot.tick().await {
                warn!(participant = %bot.participant(), error = %e, "bot input failed");
            }
        }

        server.step(dt)?;
        if server.is_shutdown() {
            break;
        }
    }

    for bot in &mut crew {
        let _ = bot.leave().await;
    }
    Ok(())
}
