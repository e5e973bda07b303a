//! Request/response gateway to the remote threshold-signing network
//!
//! The network's internal consensus, fee handling and transaction plumbing
//! sit behind a gateway endpoint; the oracle sees exactly two operations,
//! each a single HTTP round trip.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error types for remote signing
#[derive(Error, Debug)]
pub enum SignerError {
    #[error("remote signing failed: {0}")]
    RemoteSigningFailed(String),
    #[error("remote signer rejected the request: {0}")]
    RemoteSigningRejected(String),
    #[error("malformed signer response: {0}")]
    MalformedSignerResponse(String),
}

/// Signing request forwarded to the signer network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignRequest {
    pub payload: [u8; 32],
    pub path: String,
    pub key_version: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BigR {
    pub affine_point: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct S {
    pub scalar: String,
}

/// Split signature as the signer network serializes it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureResponse {
    pub big_r: BigR,
    pub s: S,
    pub recovery_id: u8,
}

#[derive(Debug, Deserialize)]
struct PublicKeyResponse {
    pub public_key: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: Option<ErrorMessage>,
}

#[derive(Deserialize)]
struct ErrorMessage {
    code: String,
    message: String,
}

/// The two operations the signer network exposes
#[async_trait]
pub trait SignerGateway: Send + Sync {
    /// Root public key, wire form "secp256k1:<base58 of 64-byte point>"
    async fn root_public_key(&self) -> Result<String, SignerError>;

    /// One signing call; either returns a usable split signature or fails.
    /// No partial signatures, no internal retries.
    async fn sign(&self, request: &SignRequest) -> Result<SignatureResponse, SignerError>;
}

/// Configuration for the HTTP signer gateway
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
}

/// Signer gateway over HTTP
pub struct HttpSignerGateway {
    client: reqwest::Client,
    config: SignerConfig,
}

impl HttpSignerGateway {
    pub fn new(config: SignerConfig) -> Result<Self, SignerError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| SignerError::RemoteSigningFailed(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.api_key {
            Some(key) => builder.header("api_key", key),
            None => builder,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.config.base_url.trim_end_matches('/'))
    }

    /// Decode an error body of the form {"error": {"code", "message"}},
    /// falling back to the raw text
    fn rejection_detail(status: reqwest::StatusCode, body: &str) -> String {
        match serde_json::from_str::<ErrorResponse>(body) {
            Ok(ErrorResponse { error: Some(err) }) => {
                format!("{} ({}): {}", status.as_u16(), err.code, err.message)
            }
            _ => format!("{}: {}", status.as_u16(), body.trim()),
        }
    }
}

#[async_trait]
impl SignerGateway for HttpSignerGateway {
    async fn root_public_key(&self) -> Result<String, SignerError> {
        let response = self
            .with_auth(self.client.get(self.endpoint("public-key")))
            .send()
            .await
            .map_err(|e| SignerError::RemoteSigningFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SignerError::RemoteSigningFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(SignerError::RemoteSigningRejected(Self::rejection_detail(
                status, &body,
            )));
        }

        let parsed: PublicKeyResponse = serde_json::from_str(&body)
            .map_err(|e| SignerError::MalformedSignerResponse(e.to_string()))?;
        Ok(parsed.public_key)
    }

    async fn sign(&self, request: &SignRequest) -> Result<SignatureResponse, SignerError> {
        tracing::debug!(path = %request.path, "requesting signature from remote signer");

        let response = self
            .with_auth(self.client.post(self.endpoint("sign")))
            .json(request)
            .send()
            .await
            .map_err(|e| SignerError::RemoteSigningFailed(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| SignerError::RemoteSigningFailed(e.to_string()))?;

        if !status.is_success() {
            return Err(SignerError::RemoteSigningRejected(Self::rejection_detail(
                status, &body,
            )));
        }

        serde_json::from_str(&body).map_err(|e| SignerError::MalformedSignerResponse(e.to_string()))
    }
}
