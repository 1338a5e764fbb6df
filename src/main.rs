//! Atmos signaling relay
//!
//! Run with: atmos-relay [BIND_ADDR]
//!
//! Examples:
//!   atmos-relay                    # binds to 0.0.0.0:3001 (or $PORT)
//!   atmos-relay localhost          # binds to 127.0.0.1:3001
//!   atmos-relay 0.0.0.0:8080       # binds to 0.0.0.0:8080

use atmos_relay::registry::RegistryConfig;
use atmos_relay::server::parse_bind_addr;
use atmos_relay::{ServerConfig, SignalServer};

fn print_usage() {
    eprintln!("Usage: atmos-relay [BIND_ADDR]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  BIND_ADDR  Address to bind to (default: 0.0.0.0:3001)");
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  PORT                          Listening port when no address is given");
    eprintln!("  ATMOS_BIND_ADDR               Full bind address");
    eprintln!("  ATMOS_WS_PATH                 WebSocket endpoint path (default: /ws)");
    eprintln!("  ATMOS_MAX_CONNECTIONS         Connection limit, 0 for none");
    eprintln!("  ATMOS_MAX_MESSAGE_SIZE        Largest accepted message in bytes");
    eprintln!("  ATMOS_STATIC_DIR              Directory of viewer assets");
    eprintln!("  ATMOS_RECLAIM_GRACE_SECS      Seconds a disconnected broadcaster is kept");
    eprintln!("  ATMOS_CLEANUP_INTERVAL_SECS   Seconds between reclaim passes");
    eprintln!("  RUST_LOG                      Log filter");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("atmos_relay=info".parse()?),
        )
        .init();

    let mut config = ServerConfig::from_env()?;
    if let Some(addr_str) = args.get(1) {
        match parse_bind_addr(addr_str) {
            Ok(addr) => config.bind_addr = addr,
            Err(e) => {
                eprintln!("Error: {}", e);
                eprintln!();
                print_usage();
                std::process::exit(1);
            }
        }
    }
    let registry_config = RegistryConfig::from_env()?;

    let server = SignalServer::with_registry_config(config, registry_config);

    server
        .run_until(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
        })
        .await?;

    Ok(())
}
