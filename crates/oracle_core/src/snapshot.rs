//! Balance snapshot construction and validation

use num_bigint::BigUint;
use thiserror::Error;

use crate::types::{fits_uint256, BalanceSnapshot, EvmAddress};

/// Default attestation validity window in seconds
pub const DEFAULT_VALIDITY_SECS: u64 = 3600;

/// Error types for snapshot construction
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("invalid receiver address: {0}")]
    InvalidReceiver(String),
    #[error("invalid amount for {field}: {reason}")]
    InvalidAmount {
        field: &'static str,
        reason: String,
    },
    #[error("validity window of {0} seconds does not produce a future deadline")]
    InvalidValidityWindow(u64),
    #[error("upstream data unavailable: {0}")]
    UpstreamDataUnavailable(String),
}

/// Inputs for one attestation: collaborator-supplied balance and nonce plus
/// the caller-requested deposit parameters
#[derive(Debug, Clone)]
pub struct SnapshotParams {
    pub aggregated_balance: BigUint,
    pub vault_nonce: BigUint,
    pub assets: String,
    pub receiver: String,
    pub validity_secs: u64,
}

fn check_uint256(field: &'static str, value: &BigUint) -> Result<(), SnapshotError> {
    if !fits_uint256(value) {
        return Err(SnapshotError::InvalidAmount {
            field,
            reason: "exceeds 256 bits".to_string(),
        });
    }
    Ok(())
}

/// Build the attestation payload with deadline = now + validity window.
/// All failures here abort the request before any signing call is made.
pub fn build_snapshot(params: SnapshotParams, now: u64) -> Result<BalanceSnapshot, SnapshotError> {
    if params.validity_secs == 0 {
        return Err(SnapshotError::InvalidValidityWindow(0));
    }
    let deadline = now
        .checked_add(params.validity_secs)
        .ok_or(SnapshotError::InvalidValidityWindow(params.validity_secs))?;

    let receiver: EvmAddress = params
        .receiver
        .parse()
        .map_err(|e| SnapshotError::InvalidReceiver(format!("{}: {e}", params.receiver)))?;

    let assets: BigUint = params.assets.parse().map_err(|_| SnapshotError::InvalidAmount {
        field: "assets",
        reason: format!("not a non-negative integer: {}", params.assets),
    })?;
    check_uint256("assets", &assets)?;
    check_uint256("balance", &params.aggregated_balance)?;
    check_uint256("nonce", &params.vault_nonce)?;

    Ok(BalanceSnapshot {
        balance: params.aggregated_balance,
        nonce: params.vault_nonce,
        deadline: BigUint::from(deadline),
        assets,
        receiver,
    })
}
