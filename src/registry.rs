//! In-memory registry of configured stashes.
//!
//! Seeded from the config file at startup and editable through the admin API.
//! Edits are deliberately not persisted to disk; the config file remains the
//! single source of truth across restarts.

use parking_lot::RwLock;
use serde::Deserialize;

use crate::config::{FieldSync, StashConfig};
use crate::error::{Error, Result};

/// Partial update applied over an existing [`StashConfig`]; the id is fixed.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StashUpdate {
    pub name: Option<String>,
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub enabled: Option<bool>,
    pub priority: Option<i32>,
    pub field_sync: Option<FieldSync>,
}

/// Thread-safe stash registry handing out snapshots.
///
/// Reads clone the entry so provider operations work against a consistent
/// view even while an admin edit lands mid-request.
pub struct StashRegistry {
    stashes: RwLock<Vec<StashConfig>>,
}

impl StashRegistry {
    pub fn new(stashes: Vec<StashConfig>) -> Self {
        Self {
            stashes: RwLock::new(stashes),
        }
    }

    /// Look up one stash by id.
    pub fn get(&self, id: &str) -> Option<StashConfig> {
        self.stashes.read().iter().find(|s| s.id == id).cloned()
    }

    /// Snapshot of every configured stash, in registration order.
    pub fn list(&self) -> Vec<StashConfig> {
        self.stashes.read().clone()
    }

    /// Enabled fallback candidates: everything but `except`, enabled only,
    /// sorted by ascending priority.
    pub fn fallback_candidates(&self, except: &str) -> Vec<StashConfig> {
        let mut candidates: Vec<StashConfig> = self
            .stashes
            .read()
            .iter()
            .filter(|s| s.enabled && s.id != except)
            .cloned()
            .collect();
        candidates.sort_by_key(|s| s.priority);
        candidates
    }

    /// Register a new stash; ids must be unique.
    pub fn insert(&self, stash: StashConfig) -> Result<()> {
        let mut stashes = self.stashes.write();
        if stashes.iter().any(|s| s.id == stash.id) {
            return Err(Error::Conflict(format!(
                "stash with id \"{}\" already exists",
                stash.id
            )));
        }
        stashes.push(stash);
        Ok(())
    }

    /// Apply a partial update to an existing stash.
    pub fn update(&self, id: &str, update: StashUpdate) -> Result<StashConfig> {
        let mut stashes = self.stashes.write();
        let stash = stashes
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or_else(|| Error::not_found("stash", id))?;

        if let Some(name) = update.name {
            stash.name = name;
        }
        if let Some(endpoint) = update.endpoint {
            stash.endpoint = endpoint;
        }
        if let Some(api_key) = update.api_key {
            stash.api_key = api_key;
        }
        if let Some(enabled) = update.enabled {
            stash.enabled = enabled;
        }
        if let Some(priority) = update.priority {
            stash.priority = priority;
        }
        if let Some(field_sync) = update.field_sync {
            stash.field_sync = field_sync;
        }

        Ok(stash.clone())
    }

    /// Remove a stash; returns whether anything was removed.
    pub fn remove(&self, id: &str) -> bool {
        let mut stashes = self.stashes.write();
        let before = stashes.len();
        stashes.retain(|s| s.id != id);
        stashes.len() != before
    }
}
