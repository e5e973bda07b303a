//! Non-interactive key derivation against the remote MPC root key
//!
//! The signer network holds one root key; per-account child keys are derived
//! additively: child = root + epsilon·G, with epsilon hashed from the caller
//! identity and derivation path. Both sides must compute the same epsilon or
//! the derived address diverges without any error being raised.

use secp256k1::{PublicKey, Secp256k1, SecretKey};
use sha3::{Digest, Sha3_256};
use thiserror::Error;

use crate::eip712::keccak256;
use crate::types::{EvmAddress, UncompressedPoint};

/// Protocol constant fixed by the signer network
pub const EPSILON_DERIVATION_PREFIX: &str = "near-mpc-recovery v0.1.0 epsilon derivation:";

/// Error types for key derivation
#[derive(Error, Debug)]
pub enum KdfError {
    #[error("invalid point format: {0}")]
    InvalidPointFormat(String),
    #[error("epsilon does not encode a valid curve scalar")]
    InvalidEpsilon,
}

/// epsilon = SHA3-256(prefix ‖ account_id ‖ "," ‖ path)
///
/// FIPS SHA3-256, not Keccak-256 — the signer network derives with the
/// padded variant and an address derived with the wrong hash still looks
/// valid while verifying against nothing.
pub fn derive_epsilon(account_id: &str, path: &str) -> [u8; 32] {
    let mut hasher = Sha3_256::new();
    hasher.update(EPSILON_DERIVATION_PREFIX.as_bytes());
    hasher.update(account_id.as_bytes());
    hasher.update(b",");
    hasher.update(path.as_bytes());
    hasher.finalize().into()
}

/// Normalize a root public key to uncompressed 65-byte form.
/// Accepts 65-byte uncompressed, 64-byte unprefixed (the signer wire form)
/// and 33-byte compressed encodings.
pub fn normalize_public_key(bytes: &[u8]) -> Result<UncompressedPoint, KdfError> {
    let point = match bytes.len() {
        65 | 33 => PublicKey::from_slice(bytes),
        64 => {
            let mut prefixed = [0u8; 65];
            prefixed[0] = 0x04;
            prefixed[1..].copy_from_slice(bytes);
            PublicKey::from_slice(&prefixed)
        }
        other => {
            return Err(KdfError::InvalidPointFormat(format!(
                "expected 33, 64 or 65 bytes, got {other}"
            )))
        }
    };
    point
        .map(|p| p.serialize_uncompressed())
        .map_err(|_| KdfError::InvalidPointFormat("not a valid secp256k1 point".to_string()))
}

/// child = root + epsilon·G (elliptic-curve point addition)
pub fn derive_child_public_key(
    root_key: &[u8],
    epsilon: &[u8; 32],
) -> Result<UncompressedPoint, KdfError> {
    let secp = Secp256k1::new();
    let normalized = normalize_public_key(root_key)?;
    let root = PublicKey::from_slice(&normalized)
        .map_err(|_| KdfError::InvalidPointFormat("not a valid secp256k1 point".to_string()))?;
    let epsilon_scalar = SecretKey::from_slice(epsilon).map_err(|_| KdfError::InvalidEpsilon)?;
    let epsilon_point = PublicKey::from_secret_key(&secp, &epsilon_scalar);
    let child = root.combine(&epsilon_point).map_err(|_| {
        KdfError::InvalidPointFormat("point addition yielded the point at infinity".to_string())
    })?;
    Ok(child.serialize_uncompressed())
}

/// EVM address of an uncompressed public key:
/// keccak256(point without the 0x04 marker)[12..]
pub fn evm_address(public_key: &UncompressedPoint) -> EvmAddress {
    let hash = keccak256(&public_key[1..]);
    let mut address = [0u8; 20];
    address.copy_from_slice(&hash[12..]);
    EvmAddress(address)
}

/// Full derivation: (root key, account, path) -> child EVM address.
/// Pure; the same inputs always produce the same address.
pub fn derive_agent_address(
    root_key: &[u8],
    account_id: &str,
    path: &str,
) -> Result<EvmAddress, KdfError> {
    let epsilon = derive_epsilon(account_id, path);
    let child = derive_child_public_key(root_key, &epsilon)?;
    Ok(evm_address(&child))
}
