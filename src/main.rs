//! RAX Share Server - Entry Point

use log::{error, info};
use rax_share_server::{ServerConfig, Server, build_services};
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() {
    // Initialize the logger (env_logger picks up RUST_LOG environment variable)
    env_logger::init();

    info!("Launching share server...");

    let config = match ServerConfig::load() {
        Ok(config) => Arc::new(config),
        Err(e) => {
            error!("Invalid configuration: {}", e);
            process::exit(1);
        }
    };

    let (services, sweeper) = match build_services(&config).await {
        Ok(built) => built,
        Err(e) => {
            error!("Failed to initialize services: {}", e);
            process::exit(1);
        }
    };
    let services = Arc::new(services);

    let server = match Server::bind(Arc::clone(&config), Arc::clone(&services)).await {
        Ok(server) => server,
        Err(e) => {
            error!("Server startup failed: {}", e);
            process::exit(1);
        }
    };

    let pruner = {
        let services = Arc::clone(&services);
        let period = config.auth.otp_window();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                services.auth.prune_rate_limits();
            }
        })
    };

    tokio::select! {
        _ = server.run() => {}
        signal = tokio::signal::ctrl_c() => {
            match signal {
                Ok(()) => info!("Shutdown requested"),
                Err(e) => error!("Failed to listen for shutdown signal: {}", e),
            }
        }
    }

    pruner.abort();
    if let Some(sweeper) = sweeper {
        sweeper.stop().await;
    }
    info!("Server stopped");
}
