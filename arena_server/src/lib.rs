//! `arena_server`
//!
//! Server-side systems:
//! - In-process network runtime (entities, authority, inputs)
//! - Fixed timestep session loop
//! - Match gate, spawning and departure handover
//! - Scripted bots for headless sessions

pub mod bots;
pub mod runtime;
pub mod server;

pub use runtime::{AuthorityMode, HostRuntime};
pub use server::GameServer;
