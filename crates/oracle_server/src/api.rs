use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use oracle_core::{build_snapshot, SignatureError, SignedSnapshot, SnapshotError, SnapshotParams};
use oracle_evm::PoolValue;
use oracle_mpc::SigningError;

use crate::models::{
    error_response, success_response, AgentAddressResponse, ApiResponse, HealthResponse,
    PoolValueQuery, SnapshotRequest,
};
use crate::AppState;

pub fn unix_now() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

// Basic handler that responds with a static string
pub async fn root() -> &'static str {
    "Hello, MPC Snapshot Oracle API!"
}

// Liveness probe
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        service: "mpc-snapshot-oracle",
        timestamp: unix_now(),
    })
}

// Get the agent's derived EVM address
pub async fn agent_address(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<AgentAddressResponse>>) {
    match state.signer.agent_address().await {
        Ok(address) => (
            StatusCode::OK,
            Json(success_response(AgentAddressResponse {
                agent_address: address.to_checksum_string(),
            })),
        ),
        Err(e) => {
            tracing::error!("failed to derive agent address: {e}");
            (
                StatusCode::BAD_GATEWAY,
                Json(error_response(format!("Failed to derive agent address: {e}"))),
            )
        }
    }
}

// Get aggregated pool value across all configured chains
pub async fn pool_value(
    State(state): State<AppState>,
    Query(query): Query<PoolValueQuery>,
) -> (StatusCode, Json<ApiResponse<PoolValue>>) {
    tracing::debug!(vault_chain_id = ?query.vault_chain_id, "pool value request");

    if let Some(chain_id) = query.vault_chain_id {
        if let Err(e) = state.vaults.chain(chain_id) {
            return (
                StatusCode::BAD_REQUEST,
                Json(error_response(e.to_string())),
            );
        }
    }

    let agent = match state.signer.agent_address().await {
        Ok(address) => address,
        Err(e) => {
            tracing::error!("failed to derive agent address: {e}");
            return (
                StatusCode::BAD_GATEWAY,
                Json(error_response(format!("Failed to derive agent address: {e}"))),
            );
        }
    };

    match state.vaults.aggregate(&agent).await {
        Ok(aggregated) => (
            StatusCode::OK,
            Json(success_response(
                aggregated.into_pool_value(agent, unix_now()),
            )),
        ),
        Err(e) => {
            tracing::error!("balance aggregation failed: {e}");
            (
                StatusCode::BAD_GATEWAY,
                Json(error_response(format!("Upstream data unavailable: {e}"))),
            )
        }
    }
}

// Generate a signed balance snapshot for a deposit
#[axum::debug_handler]
pub async fn balance_snapshot(
    State(state): State<AppState>,
    Json(payload): Json<SnapshotRequest>,
) -> (StatusCode, Json<ApiResponse<SignedSnapshot>>) {
    tracing::info!(
        assets = %payload.assets,
        receiver = %payload.receiver,
        chain_id = payload.vault_chain_id,
        "balance snapshot request"
    );

    let chain = match state.vaults.chain(payload.vault_chain_id) {
        Ok(chain) => chain,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(error_response(e.to_string())),
            )
        }
    };

    let Some(domain) = state.config.domain_for(chain) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(error_response(format!(
                "chain {} has no vault configured",
                payload.vault_chain_id
            ))),
        );
    };

    let validity_secs = payload
        .validity_seconds
        .unwrap_or(state.config.policy.validity_window_secs);
    if validity_secs > state.config.policy.max_validity_secs {
        return (
            StatusCode::BAD_REQUEST,
            Json(error_response(format!(
                "validity window {validity_secs}s exceeds the maximum of {}s",
                state.config.policy.max_validity_secs
            ))),
        );
    }

    let agent = match state.signer.agent_address().await {
        Ok(address) => address,
        Err(e) => {
            tracing::error!("failed to derive agent address: {e}");
            return (
                StatusCode::BAD_GATEWAY,
                Json(error_response(format!("Failed to derive agent address: {e}"))),
            );
        }
    };

    // Collaborator reads; any failure aborts before the signing call
    let vault_nonce = match state.vaults.vault_nonce(payload.vault_chain_id).await {
        Ok(nonce) => nonce,
        Err(e) => {
            let err = SnapshotError::UpstreamDataUnavailable(e.to_string());
            tracing::error!("vault nonce unavailable: {err}");
            return (StatusCode::BAD_GATEWAY, Json(error_response(err.to_string())));
        }
    };
    let aggregated = match state.vaults.aggregate(&agent).await {
        Ok(aggregated) => aggregated,
        Err(e) => {
            let err = SnapshotError::UpstreamDataUnavailable(e.to_string());
            tracing::error!("balance aggregation failed: {err}");
            return (StatusCode::BAD_GATEWAY, Json(error_response(err.to_string())));
        }
    };

    let params = SnapshotParams {
        aggregated_balance: aggregated.total_atokens,
        vault_nonce,
        assets: payload.assets,
        receiver: payload.receiver,
        validity_secs,
    };
    let snapshot = match build_snapshot(params, unix_now()) {
        Ok(snapshot) => snapshot,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(error_response(e.to_string())),
            )
        }
    };

    match state.signer.sign_snapshot(&domain, snapshot).await {
        Ok(signed) => {
            tracing::info!(signer = %signed.agent_address, "balance snapshot generated");
            (StatusCode::OK, Json(success_response(signed)))
        }
        Err(SigningError::Signature(e @ SignatureError::VerificationFailed { .. })) => {
            // Integrity fault: the signer is not who the derivation says it is
            tracing::error!("snapshot failed self-verification: {e}");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(error_response(e.to_string())),
            )
        }
        Err(e) => {
            tracing::error!("remote signing failed: {e}");
            (StatusCode::BAD_GATEWAY, Json(error_response(e.to_string())))
        }
    }
}
