//! MPC snapshot oracle server library

pub mod api;
pub mod auth;
pub mod config;
pub mod models;

use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};

use oracle_evm::VaultReader;
use oracle_mpc::{HttpSignerGateway, MpcSigningClient};

// Re-export main types for external use
pub use api::*;
pub use config::*;
pub use models::*;

// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub signer: Arc<MpcSigningClient<HttpSignerGateway>>,
    pub vaults: Arc<VaultReader>,
    pub config: Arc<AppConfig>,
}

/// Build the application router with auth, trace and CORS layers
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/api/oracle/balance-snapshot", post(balance_snapshot))
        .route("/api/oracle/pool-value", get(pool_value))
        .route("/api/oracle/agent-address", get(agent_address))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_api_key,
        ))
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
}
