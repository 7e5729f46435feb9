//! Stashbridge - Plex custom metadata provider backed by Stash servers
//!
//! This library crate exposes the core functionality for integration testing.

pub mod activity_log;
pub mod cache;
pub mod config;
pub mod error;
pub mod ids;
pub mod plex;
pub mod provider;
pub mod registry;
pub mod server;
pub mod stash;
