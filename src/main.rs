//! Testnet faucet server.
//!
//! # Architecture Overview
//!
//! ```text
//!     POST /api/claim
//!     ──────────────▶ http server ──▶ rate limit ──▶ claim handler
//!                     (request id,    (client IP +      │
//!                      tracing)        address)         ▼
//!                                              ┌─────────────────┐
//!                                              │  TxBroadcaster  │
//!                                              │  fees · nonces  │
//!                                              │  call encoding  │
//!                                              └────────┬────────┘
//!                                                       │ signed raw tx
//!                                                       ▼
//!                                              BlockchainClient ──▶ RPC node(s)
//! ```
//!
//! The private key is read from `FAUCET_PRIVATE_KEY`.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use testnet_faucet::blockchain::units::parse_address;
use testnet_faucet::blockchain::{Account, BlockchainClient, TxBroadcaster};
use testnet_faucet::config::{load_config, FaucetConfig};
use testnet_faucet::lifecycle::signals::wait_for_signal;
use testnet_faucet::observability::{logging, metrics};
use testnet_faucet::{FaucetServer, Shutdown};

#[derive(Parser)]
#[command(name = "testnet-faucet")]
#[command(about = "Testnet faucet for native currency and ERC-20 tokens", long_about = None)]
struct Args {
    /// Path to the TOML config file; defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `blockchain.rpc_url`.
    #[arg(long)]
    rpc_url: Option<String>,

    /// Override `server.bind_address`.
    #[arg(long)]
    bind_address: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => FaucetConfig::default(),
    };
    if let Some(rpc_url) = args.rpc_url {
        config.blockchain.rpc_url = rpc_url;
    }
    if let Some(bind_address) = args.bind_address {
        config.server.bind_address = bind_address;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("testnet-faucet v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.server.bind_address,
        network = %config.faucet.network,
        rpc_url = %config.blockchain.rpc_url,
        claim_timeout_secs = config.faucet.claim_timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let client = BlockchainClient::new(config.blockchain.clone())?;
    let chain_id = client.resolve_chain_id().await?;
    let account = Account::from_env(chain_id)?;
    let token = config
        .token
        .address
        .as_deref()
        .map(parse_address)
        .transpose()?;

    let broadcaster = Arc::new(TxBroadcaster::new(Arc::new(client), account, token).await?);
    let server = FaucetServer::new(&config, broadcaster)?;

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        wait_for_signal().await;
        trigger.trigger();
    });

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
