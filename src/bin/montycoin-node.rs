#![forbid(unsafe_code)]
//! Montycoin network node

use clap::Parser;
use montycoin::api::run_api_server;
use montycoin::config::{load_config, DEFAULT_CONFIG_PATH};
use montycoin::node::Node;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "montycoin-node", about = "Run a Montycoin ledger node")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Port to listen on, overriding `network.port`
    #[arg(long)]
    port: Option<u16>,

    /// Peer to register at startup; may be repeated
    #[arg(long = "peer")]
    peers: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let mut config = load_config(&args.config)?;
    if let Some(port) = args.port {
        config.network.port = port;
    }
    config.network.bootstrap_peers.extend(args.peers);

    let addr: SocketAddr = format!("{}:{}", config.network.host, config.network.port).parse()?;
    let node = Arc::new(Node::new(config)?);
    info!(node_id = %node.node_id(), %addr, "starting Montycoin node");

    let shutdown_node = node.clone();
    let shutdown = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for shutdown signal");
        }
        shutdown_node.shutdown();
    };

    run_api_server(node, addr, shutdown).await?;
    info!("node stopped");
    Ok(())
}
