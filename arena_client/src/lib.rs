//! `arena_client`
//!
//! Client-side systems:
//! - Session membership (join / leave)
//! - Per-frame input sampling with a buffered jump
//! - Per-tick `InputSnapshot` generation

pub mod client;
pub mod input;

pub use client::GameClient;
