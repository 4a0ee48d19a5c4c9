//! WebServer entry point
//!
//! Wires the real factory services together with dependency injection and
//! serves the HTTP API.

use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;

use factory::services::{
    FsBatchStore, FsCartStore, LockRegistry, MaterialTable, StlVolumeAnalyzer, StorageLayout,
};
use shared::logging;
use webserver::{WebServer, WebServerError, WebServerResult};

/// Fabrication job quoting and production tracking server
#[derive(Parser, Debug)]
#[command(name = "webserver")]
#[command(about = "Quotes uploaded parts and tracks production batches")]
struct Args {
    /// Port for HTTP server (browser connections)
    #[arg(long, default_value = "8080")]
    port: u16,

    /// Storage root for cart and production data
    #[arg(long, default_value = "./data")]
    data_dir: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> WebServerResult<()> {
    let args = Args::parse();
    logging::init_tracing(Some(&args.log_level));

    let addr: SocketAddr = format!("0.0.0.0:{}", args.port)
        .parse()
        .map_err(|e| WebServerError::config(format!("Invalid port: {}", e)))?;

    // One layout and one lock registry back both stores, so per-item
    // serialization holds across cart and batch mutations
    let layout = StorageLayout::new(args.data_dir.as_str());
    let locks = Arc::new(LockRegistry::new());
    let cart = FsCartStore::new(layout.clone(), locks.clone());
    let batches = FsBatchStore::new(layout, locks);

    let server = WebServer::new(cart, batches, StlVolumeAnalyzer::new(), MaterialTable::new());
    server.run(addr).await
}
