//! Assembly and verification of signatures returned by the remote signer
//!
//! The signer returns its signature split into the ephemeral curve point,
//! the s scalar and a recovery indicator. Assembly packs them into the
//! fixed-width r ‖ s ‖ v layout the verifying chain accepts; verification
//! recovers the signer address and is the trust gate for every attestation.

use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, Secp256k1};
use thiserror::Error;

use crate::kdf::evm_address;
use crate::types::{EvmAddress, RsvSignature};

/// Signature as returned by the threshold signer, still in wire encoding
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitSignature {
    /// Hex-encoded curve point; byte 0 is the format marker
    pub big_r_hex: String,
    /// Hex-encoded s scalar, at most 32 bytes
    pub s_hex: String,
    /// 0 or 1
    pub recovery_id: u8,
}

/// Error types for signature handling
#[derive(Error, Debug)]
pub enum SignatureError {
    #[error("invalid signature length: {component} must resolve to 32 bytes, got {actual}")]
    InvalidSignatureLength {
        component: &'static str,
        actual: usize,
    },
    #[error("signature component is not valid hex: {0}")]
    InvalidHex(String),
    #[error("invalid recovery indicator: {0}")]
    InvalidRecoveryId(u8),
    #[error("signature rejected by curve arithmetic: {0}")]
    Malformed(#[from] secp256k1::Error),
    #[error("signature verification failed: recovered {recovered}, expected {expected}")]
    VerificationFailed {
        recovered: EvmAddress,
        expected: EvmAddress,
    },
}

/// Pack a split signature into r(32) ‖ s(32) ‖ v(1).
///
/// r is read out of the curve point (skip the format marker, take the next
/// 32 bytes); s is left-zero-padded to 32 bytes; v = recovery_id + 27.
pub fn assemble_signature(split: &SplitSignature) -> Result<RsvSignature, SignatureError> {
    let big_r =
        hex::decode(&split.big_r_hex).map_err(|e| SignatureError::InvalidHex(e.to_string()))?;
    if big_r.len() < 33 {
        return Err(SignatureError::InvalidSignatureLength {
            component: "big_r",
            actual: big_r.len().saturating_sub(1),
        });
    }

    let s = hex::decode(&split.s_hex).map_err(|e| SignatureError::InvalidHex(e.to_string()))?;
    if s.len() > 32 {
        return Err(SignatureError::InvalidSignatureLength {
            component: "s",
            actual: s.len(),
        });
    }

    if split.recovery_id > 1 {
        return Err(SignatureError::InvalidRecoveryId(split.recovery_id));
    }

    let mut signature = [0u8; 65];
    signature[..32].copy_from_slice(&big_r[1..33]);
    signature[64 - s.len()..64].copy_from_slice(&s);
    signature[64] = split.recovery_id + 27;
    Ok(signature)
}

/// Recover the signer address from (digest, signature) and require it to be
/// the expected one. A mismatch is a hard integrity fault: either the key
/// derivation disagrees with the signer or the signer is misconfigured.
pub fn verify_signature(
    digest: &[u8; 32],
    signature: &RsvSignature,
    expected: &EvmAddress,
) -> Result<(), SignatureError> {
    let v = signature[64];
    if v != 27 && v != 28 {
        return Err(SignatureError::InvalidRecoveryId(v));
    }
    let secp = Secp256k1::new();
    let recovery_id = RecoveryId::from_i32(i32::from(v) - 27)?;
    let recoverable = RecoverableSignature::from_compact(&signature[..64], recovery_id)?;
    let message = Message::from_slice(digest)?;
    let recovered_key = secp.recover_ecdsa(&message, &recoverable)?;
    let recovered = evm_address(&recovered_key.serialize_uncompressed());
    if recovered != *expected {
        return Err(SignatureError::VerificationFailed {
            recovered,
            expected: *expected,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secp256k1::{PublicKey, SecretKey};

    /// Split a locally produced recoverable signature the way the remote
    /// signer splits its own
    fn split_local_signature(
        secp: &Secp256k1<secp256k1::All>,
        secret: &SecretKey,
        digest: &[u8; 32],
    ) -> SplitSignature {
        let message = Message::from_slice(digest).unwrap();
        let recoverable = secp.sign_ecdsa_recoverable(&message, secret);
        let (recovery_id, compact) = recoverable.serialize_compact();
        SplitSignature {
            big_r_hex: format!("02{}", hex::encode(&compact[..32])),
            s_hex: hex::encode(&compact[32..]),
            recovery_id: recovery_id.to_i32() as u8,
        }
    }

    #[test]
    fn test_assemble_layout_and_v() {
        let split = SplitSignature {
            big_r_hex: format!("03{}", "11".repeat(32)),
            s_hex: "22".repeat(32),
            recovery_id: 1,
        };
        let signature = assemble_signature(&split).unwrap();
        assert_eq!(signature.len(), 65);
        assert_eq!(&signature[..32], &[0x11u8; 32]);
        assert_eq!(&signature[32..64], &[0x22u8; 32]);
        assert_eq!(signature[64], 28);
    }

    #[test]
    fn test_assemble_pads_short_scalar() {
        let split = SplitSignature {
            big_r_hex: format!("02{}", "11".repeat(32)),
            s_hex: "ff".to_string(),
            recovery_id: 0,
        };
        let signature = assemble_signature(&split).unwrap();
        assert!(signature[32..63].iter().all(|&b| b == 0));
        assert_eq!(signature[63], 0xff);
        assert_eq!(signature[64], 27);
    }

    #[test]
    fn test_assemble_accepts_uncompressed_point() {
        // 65-byte point encoding; r is still bytes [1..33]
        let split = SplitSignature {
            big_r_hex: format!("04{}{}", "11".repeat(32), "33".repeat(32)),
            s_hex: "22".repeat(32),
            recovery_id: 0,
        };
        let signature = assemble_signature(&split).unwrap();
        assert_eq!(&signature[..32], &[0x11u8; 32]);
    }

    #[test]
    fn test_assemble_rejects_bad_components() {
        let short_point = SplitSignature {
            big_r_hex: "02aabb".to_string(),
            s_hex: "22".repeat(32),
            recovery_id: 0,
        };
        assert!(matches!(
            assemble_signature(&short_point),
            Err(SignatureError::InvalidSignatureLength { component: "big_r", .. })
        ));

        let long_scalar = SplitSignature {
            big_r_hex: format!("02{}", "11".repeat(32)),
            s_hex: "22".repeat(33),
            recovery_id: 0,
        };
        assert!(matches!(
            assemble_signature(&long_scalar),
            Err(SignatureError::InvalidSignatureLength { component: "s", .. })
        ));

        let not_hex = SplitSignature {
            big_r_hex: "zz".to_string(),
            s_hex: "22".repeat(32),
            recovery_id: 0,
        };
        assert!(matches!(
            assemble_signature(&not_hex),
            Err(SignatureError::InvalidHex(_))
        ));

        let bad_recovery = SplitSignature {
            big_r_hex: format!("02{}", "11".repeat(32)),
            s_hex: "22".repeat(32),
            recovery_id: 2,
        };
        assert!(matches!(
            assemble_signature(&bad_recovery),
            Err(SignatureError::InvalidRecoveryId(2))
        ));
    }

    #[test]
    fn test_verify_roundtrip() {
        let secp = Secp256k1::new();
        let secret = SecretKey::new(&mut secp256k1::rand::thread_rng());
        let public = PublicKey::from_secret_key(&secp, &secret);
        let signer = evm_address(&public.serialize_uncompressed());

        let digest = [0x42u8; 32];
        let split = split_local_signature(&secp, &secret, &digest);
        let signature = assemble_signature(&split).unwrap();
        assert!(signature[64] == 27 || signature[64] == 28);

        verify_signature(&digest, &signature, &signer).unwrap();
    }

    #[test]
    fn test_verify_rejects_flipped_digest_bit() {
        let secp = Secp256k1::new();
        let secret = SecretKey::new(&mut secp256k1::rand::thread_rng());
        let public = PublicKey::from_secret_key(&secp, &secret);
        let signer = evm_address(&public.serialize_uncompressed());

        let digest = [0x42u8; 32];
        let split = split_local_signature(&secp, &secret, &digest);
        let signature = assemble_signature(&split).unwrap();

        let mut tampered = digest;
        tampered[0] ^= 0x01;
        let result = verify_signature(&tampered, &signature, &signer);
        assert!(result.is_err());
    }

    #[test]
    fn test_verify_reports_both_addresses_on_mismatch() {
        let secp = Secp256k1::new();
        let secret = SecretKey::new(&mut secp256k1::rand::thread_rng());
        let digest = [0x42u8; 32];
        let split = split_local_signature(&secp, &secret, &digest);
        let signature = assemble_signature(&split).unwrap();

        let stranger = EvmAddress([0xabu8; 20]);
        match verify_signature(&digest, &signature, &stranger) {
            Err(SignatureError::VerificationFailed { recovered, expected }) => {
                assert_eq!(expected, stranger);
                assert_ne!(recovered, stranger);
            }
            other => panic!("expected VerificationFailed, got {other:?}"),
        }
    }
}
