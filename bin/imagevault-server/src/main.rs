//! ImageVault server - streaming image transfer daemon
//!
//! This binary wires the transfer service to a storage directory and a
//! metadata database and serves it over gRPC.

use anyhow::Result;
use clap::Parser;
use imagevault_common::ServerConfig;
use imagevault_proto::transfer::image_transfer_server::ImageTransferServer;
use imagevault_repo::SqlImageRepository;
use imagevault_store::DiskImageStore;
use imagevault_transfer::TransferService;
use std::net::SocketAddr;
use std::sync::Arc;
use tonic::transport::Server;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "imagevault-server")]
#[command(about = "ImageVault image transfer server")]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "/etc/imagevault/server.toml")]
    config: String,

    /// Listen address for gRPC
    #[arg(short, long)]
    listen: Option<SocketAddr>,

    /// Directory for stored images
    #[arg(long)]
    storage_dir: Option<String>,

    /// Metadata database URL
    #[arg(long)]
    database_url: Option<String>,

    /// Log level
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load config file if it exists
    let mut config: ServerConfig = if std::path::Path::new(&args.config).exists() {
        let config_str = std::fs::read_to_string(&args.config)?;
        toml::from_str(&config_str).unwrap_or_else(|e| {
            eprintln!("Warning: Failed to parse config file: {e}");
            ServerConfig::default()
        })
    } else {
        ServerConfig::default()
    };

    // CLI args take precedence over the config file
    if let Some(listen) = args.listen {
        config.network.grpc_listen = listen;
    }
    if let Some(storage_dir) = args.storage_dir {
        config.storage.storage_dir = storage_dir.into();
    }
    if let Some(database_url) = args.database_url {
        config.storage.database_url = database_url;
    }
    let log_level = if args.log_level == "info" {
        config.logging.level.clone()
    } else {
        args.log_level
    };

    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| log_level.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting ImageVault server");
    info!("Config file: {}", args.config);
    info!("Storage directory: {}", config.storage.storage_dir.display());
    info!("Database: {}", config.storage.database_url);
    info!(
        "Limits: max_image_size={} upload_slots={} inform_slots={} download_slots={}",
        config.limits.max_image_size,
        config.limits.upload_slots,
        config.limits.inform_slots,
        config.limits.download_slots
    );

    let repo = Arc::new(SqlImageRepository::connect(&config.storage.database_url).await?);
    let store = Arc::new(DiskImageStore::open(config.storage.storage_dir.clone()).await?);
    let service = TransferService::new(store, repo, &config.limits);

    let addr = config.network.grpc_listen;
    info!("Starting gRPC server on {addr}");

    Server::builder()
        .add_service(ImageTransferServer::new(service))
        .serve_with_shutdown(addr, async {
            tokio::signal::ctrl_c().await.ok();
            info!("Shutting down...");
        })
        .await?;

    info!("Server shut down gracefully");

    Ok(())
}
