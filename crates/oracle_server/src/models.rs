use serde::{Deserialize, Serialize};

// Response structure for API responses
#[derive(Debug, Serialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
}

// Success response helper
pub fn success_response<T>(data: T) -> ApiResponse<T> {
    ApiResponse {
        success: true,
        data: Some(data),
        error: None,
    }
}

// Error response helper
pub fn error_response<T>(message: String) -> ApiResponse<T> {
    ApiResponse {
        success: false,
        data: None,
        error: Some(message),
    }
}

// Request structure for signed balance snapshots
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotRequest {
    pub assets: String,
    pub receiver: String,
    pub vault_chain_id: u64,
    pub validity_seconds: Option<u64>,
}

// Query parameters for pool value
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolValueQuery {
    pub vault_chain_id: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub timestamp: u64,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentAddressResponse {
    pub agent_address: String,
}
