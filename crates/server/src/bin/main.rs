//! hashrush mining server.

use anyhow::Context;
use clap::Parser;
use hashrush_node::MiningNode;
use hashrush_server::{router, AppState, ServerConfig};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "hashrush-server")]
#[command(about = "Mining round server with in-memory storage")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "HASHRUSH_CONFIG")]
    config: Option<PathBuf>,

    /// Listen address (overrides the configuration file)
    #[arg(short, long, env = "HASHRUSH_LISTEN")]
    listen: Option<SocketAddr>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(listen) = args.listen {
        config.listen = listen;
    }

    let mining = config.mining_config();
    info!(
        listen = %config.listen,
        total_supply = %mining.schedule.total_supply,
        initial_reward = %mining.schedule.initial_reward,
        base_difficulty = mining.schedule.base_difficulty,
        "Starting mining server"
    );

    let node = MiningNode::in_memory(mining);
    let app = router(Arc::new(AppState::new(node)));

    let listener = tokio::net::TcpListener::bind(config.listen)
        .await
        .with_context(|| format!("failed to bind {}", config.listen))?;
    info!(addr = %config.listen, "Listening");
    axum::serve(listener, app).await?;

    Ok(())
}
