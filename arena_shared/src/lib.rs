//! `arena_shared`
//!
//! Shared libraries used by both client and server.
//!
//! Design goals:
//! - Deterministic and modular where practical.
//! - The network runtime is a trait; nothing here owns a socket.
//! - State authority is a typed proof, not a flag.
//! - No `unsafe`.

pub mod authority;
pub mod config;
pub mod entity;
pub mod handover;
pub mod matchmaking;
pub mod math;
pub mod movement;
pub mod net;
pub mod physics;
pub mod runtime;
pub mod spawn;

#[cfg(test)]
mod testing;

pub mod prelude {
    //! Commonly used exports.

    pub use crate::authority::*;
    pub use crate::config::*;
    pub use crate::entity::*;
    pub use crate::math::*;
    pub use crate::net::*;
    pub use crate::runtime::*;
}
