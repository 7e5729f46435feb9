use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub stashes: Vec<StashConfig>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8787
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// One configured Stash backend.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StashConfig {
    /// Unique id; also embedded (sanitized) in the provider identifier.
    pub id: String,

    /// Display name reported as the provider title.
    #[serde(default)]
    pub name: String,

    /// Base URL of the Stash server, e.g. `http://localhost:9999`.
    pub endpoint: String,

    /// Stash API key; sent as the `ApiKey` header when non-empty.
    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Fallback ordering; lower values are tried first.
    #[serde(default)]
    pub priority: i32,

    #[serde(default)]
    pub field_sync: FieldSync,
}

/// Controls which metadata fields are synced from Stash to Plex.
///
/// When a field is false the corresponding attribute is omitted from provider
/// responses. Keys missing from the config default to enabled.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct FieldSync {
    #[serde(default = "default_true")]
    pub title: bool,
    #[serde(default = "default_true")]
    pub summary: bool,
    #[serde(default = "default_true")]
    pub date: bool,
    #[serde(default = "default_true")]
    pub studio: bool,
    #[serde(default = "default_true")]
    pub tags: bool,
    #[serde(default = "default_true")]
    pub performers: bool,
    #[serde(default = "default_true")]
    pub poster: bool,
    #[serde(default = "default_true")]
    pub background: bool,
}

fn default_true() -> bool {
    true
}

impl Default for FieldSync {
    fn default() -> Self {
        Self {
            title: true,
            summary: true,
            date: true,
            studio: true,
            tags: true,
            performers: true,
            poster: true,
            background: true,
        }
    }
}

impl StashConfig {
    /// The provider title: the display name, or `Stash {id}` when unnamed.
    pub fn display_name(&self) -> String {
        if self.name.is_empty() {
            format!("Stash {}", self.id)
        } else {
            self.name.clone()
        }
    }
}

impl Default for StashConfig {
    fn default() -> Self {
        Self {
            id: "default".to_string(),
            name: "Default Stash".to_string(),
            endpoint: "http://localhost:9999".to_string(),
            api_key: String::new(),
            enabled: true,
            priority: 0,
            field_sync: FieldSync::default(),
        }
    }
}
