//! Helpers shared by the integration tests.

use arena_client::{input::FrameInput, GameClient};
use arena_server::GameServer;

/// Installs a test-friendly subscriber once per process.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

/// Runs `ticks` network ticks: every client samples `input` for one frame and
/// sends its snapshot, then the server steps.
pub async fn drive(
    server: &mut GameServer,
    clients: &mut [GameClient],
    input: FrameInput,
    ticks: u32,
) -> anyhow::Result<()> {
    let dt = server.cfg.tick_dt();
    for _ in 0..ticks {
        for client in clients.iter_mut() {
            client.frame(input, dt);
            client.tick().await?;
        }
        server.step(dt)?;
    }
    Ok(())
}

/// Steps the server without any client input.
pub fn idle(server: &mut GameServer, ticks: u32) -> anyhow::Result<()> {
    let dt = server.cfg.tick_dt();
    for _ in 0..ticks {
        server.step(dt)?;
    }
    Ok(())
}
