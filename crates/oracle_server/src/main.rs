use std::sync::Arc;

use oracle_evm::VaultReader;
use oracle_mpc::{HttpSignerGateway, MpcSigningClient};
use oracle_server::{router, AppConfig, AppState};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "oracle_server=debug,tower_http=debug,axum=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting MPC snapshot oracle...");

    // Load configuration
    tracing::info!("Loading configuration...");
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Configuration loaded successfully");

    // Signer gateway and client
    let gateway = match HttpSignerGateway::new(config.signer_config()) {
        Ok(gateway) => gateway,
        Err(e) => {
            tracing::error!("Failed to build signer gateway: {}", e);
            std::process::exit(1);
        }
    };
    let signer = Arc::new(MpcSigningClient::new(
        gateway,
        config.signer.account_id.clone(),
        config.signer.path.clone(),
        config.signer.key_version,
    ));

    // Chain collaborators
    let chains = match config.chain_configs() {
        Ok(chains) => chains,
        Err(e) => {
            tracing::error!("Invalid chain configuration: {}", e);
            std::process::exit(1);
        }
    };
    tracing::info!("Watching {} chains", chains.len());
    let vaults = match VaultReader::new(
        chains,
        config.policy.rpc_timeout_secs,
        config.policy.allow_missing_nonce,
    ) {
        Ok(vaults) => Arc::new(vaults),
        Err(e) => {
            tracing::error!("Failed to build chain clients: {}", e);
            std::process::exit(1);
        }
    };

    // Derive the agent identity up front so startup fails loudly when the
    // signer gateway is unreachable; later requests re-attempt on demand
    match signer.agent_address().await {
        Ok(address) => tracing::info!("Agent address: {}", address),
        Err(e) => tracing::warn!("Agent identity not derived yet: {}", e),
    }

    let app_state = AppState {
        signer,
        vaults,
        config: Arc::new(config.clone()),
    };

    let app = router(app_state);

    tracing::debug!("Registered routes:");
    tracing::debug!("  GET  /health");
    tracing::debug!("  POST /api/oracle/balance-snapshot");
    tracing::debug!("  GET  /api/oracle/pool-value");
    tracing::debug!("  GET  /api/oracle/agent-address");

    // Run our app with hyper
    let addr = config.socket_addr();
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!("Server listening on {}", addr);
            listener
        }
        Err(e) => {
            tracing::error!("Failed to bind to {}: {}", addr, e);
            std::process::exit(1);
        }
    };

    if let Err(e) = axum::serve(listener, app).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    };
}
