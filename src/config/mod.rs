mod types;

pub use types::*;

use anyhow::{Context, Result};
use std::path::Path;

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;

    let config: Config = toml::from_str(&content)
        .with_context(|| format!("Failed to parse config file: {:?}", path))?;

    validate_config(&config)?;

    Ok(config)
}

/// Load config from default locations or return default config
pub fn load_config_or_default(custom_path: Option<&Path>) -> Result<Config> {
    if let Some(path) = custom_path {
        return load_config(path);
    }

    // Try default locations
    let default_paths = [
        "./config.toml",
        "./stashbridge.toml",
        "~/.config/stashbridge/config.toml",
        "/etc/stashbridge/config.toml",
    ];

    for path_str in default_paths {
        let path = shellexpand::tilde(path_str);
        let path = Path::new(path.as_ref());
        if path.exists() {
            return load_config(path);
        }
    }

    // No file found: run with a single local stash so Plex has something to
    // talk to out of the box.
    let config = Config {
        stashes: vec![StashConfig::default()],
        ..Config::default()
    };
    Ok(config)
}

/// Validate configuration
pub fn validate_config(config: &Config) -> Result<()> {
    if config.server.port == 0 {
        anyhow::bail!("Server port cannot be 0");
    }

    let mut seen = std::collections::HashSet::new();
    for stash in &config.stashes {
        if stash.id.is_empty() {
            anyhow::bail!("Stash id cannot be empty");
        }
        if !seen.insert(stash.id.as_str()) {
            anyhow::bail!("Duplicate stash id: '{}'", stash.id);
        }

        let url = url::Url::parse(&stash.endpoint)
            .with_context(|| format!("Stash '{}' has an invalid endpoint URL", stash.id))?;
        if url.scheme() != "http" && url.scheme() != "https" {
            anyhow::bail!(
                "Stash '{}' endpoint must be http or https, got '{}'",
                stash.id,
                url.scheme()
            );
        }
    }

    Ok(())
}
