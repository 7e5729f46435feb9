//! Stash backend integration: GraphQL client and scene types.

pub mod client;
pub mod types;

pub use client::{PingOutcome, StashClient};
pub use types::Scene;
