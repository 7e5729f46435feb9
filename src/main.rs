mod cli;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use stashbridge::{config, server, stash::StashClient};

async fn start_server(host: String, port: u16, config_path: Option<&std::path::Path>) -> Result<()> {
    let mut config = config::load_config_or_default(config_path)?;

    // Override host/port from CLI if specified
    config.server.host = host;
    config.server.port = port;

    tracing::info!("Starting Stashbridge server");
    tracing::info!(
        "Server will listen on {}:{}",
        config.server.host,
        config.server.port
    );
    for stash in &config.stashes {
        tracing::info!(
            "Stash \"{}\" at {} (enabled: {}, priority: {})",
            stash.id,
            stash.endpoint,
            stash.enabled,
            stash.priority
        );
    }

    server::start_server(config).await
}

async fn ping_stashes(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    let client = StashClient::new();

    for stash in &config.stashes {
        let outcome = client.ping(stash).await;
        if outcome.ok {
            println!("{}: ok ({} ms)", stash.id, outcome.latency_ms);
        } else {
            println!(
                "{}: FAILED ({})",
                stash.id,
                outcome.error.unwrap_or_else(|| "unknown error".to_string())
            );
        }
    }
    Ok(())
}

fn validate_config(config_path: Option<&std::path::Path>) -> Result<()> {
    let config = config::load_config_or_default(config_path)?;
    println!(
        "Config OK: {} stash(es), server on {}:{}",
        config.stashes.len(),
        config.server.host,
        config.server.port
    );
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "stashbridge=trace,tower_http=debug".to_string()
        } else {
            "stashbridge=debug,tower_http=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .init();

    match cli.command {
        Commands::Start { host, port } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(start_server(host, port, cli.config.as_deref()))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Ping => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(ping_stashes(cli.config.as_deref()))
        }
        Commands::Version => {
            println!("stashbridge {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
