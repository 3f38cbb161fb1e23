//! VeilNet CLI
//!
//! Runs an overlay node and carries the operator chores: key generation,
//! record registration, and test requests through the relay chain.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use veilnet_core::{NodeRecord, RelayRecord};
use veilnet_crypto::RsaKeypair;
use veilnet_node::NetManager;
use veilnet_settings::Settings;

/// VeilNet - onion-routed overlay network node
#[derive(Parser)]
#[command(name = "veilnet")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the settings file
    #[arg(long, default_value = "config.json")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the node until interrupted
    Run,

    /// Generate the node's RSA keypair (if absent) and print its digests
    Keygen,

    /// Register a relay (RRI) record
    AddRelay {
        #[arg(long)]
        id: String,
        #[arg(long)]
        ip: String,
        #[arg(long)]
        port: u16,
        /// Path to the relay's RSA public key PEM
        #[arg(long)]
        key_file: PathBuf,
    },

    /// Register a node (NRI) record
    AddNode {
        #[arg(long)]
        id: String,
        #[arg(long)]
        ip: String,
        #[arg(long)]
        port: u16,
    },

    /// Build and send a request through the chain (for testing)
    Request {
        /// Target URL
        target: String,
        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,
        /// Seconds to wait for the response
        #[arg(long, default_value = "15")]
        timeout: u64,
    },
}

fn init_logging(verbose: bool) {
    let default = if verbose {
        "debug,veilnet=trace"
    } else {
        "info,veilnet=debug"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let settings = Settings::load_from(&cli.config).context("loading settings")?;
    let manager = NetManager::new(settings).context("initializing net manager")?;

    match cli.command {
        Commands::Run => {
            manager.setup_upnp();
            manager.start().await.context("starting node")?;
            info!("node running, press ctrl-c to stop");
            tokio::signal::ctrl_c().await.context("waiting for signal")?;
            info!("received shutdown signal");
            manager.stop().await;
        }

        Commands::Keygen => {
            let keypair: &RsaKeypair = manager.keypair();
            println!("key id:            {}", keypair.key_id);
            println!("public key hash:   {}", keypair.public_key_hash);
            println!("private key hash:  {}", keypair.private_key_hash);
        }

        Commands::AddRelay {
            id,
            ip,
            port,
            key_file,
        } => {
            let public_key = std::fs::read_to_string(&key_file)
                .with_context(|| format!("reading {}", key_file.display()))?;
            manager
                .register_relay(RelayRecord::new(id.clone(), ip, port, public_key))
                .context("registering relay")?;
            println!("relay {id} registered");
        }

        Commands::AddNode { id, ip, port } => {
            manager
                .register_node(NodeRecord::new(id.clone(), ip, port))
                .context("registering node")?;
            println!("node {id} registered");
        }

        Commands::Request {
            target,
            method,
            timeout,
        } => {
            manager.start().await.context("starting node")?;
            let request = manager
                .request_factory(&target, "http", serde_json::json!({ "method": method }))
                .context("building request")?;
            info!(hops = request.routing_map.len(), "routing map generated");

            match manager
                .send_request(request, Some(Duration::from_secs(timeout)))
                .await
                .context("sending request")?
            {
                Some(response) => println!("{}", response.text()),
                None => println!("no response within {timeout}s"),
            }
            manager.stop().await;
        }
    }

    Ok(())
}
