//! Signing client: agent identity cache and the per-request signing pipeline

use thiserror::Error;
use tokio::sync::OnceCell;

use oracle_core::{
    assemble_signature, derive_agent_address, normalize_public_key, snapshot_digest,
    verify_signature, BalanceSnapshot, Eip712Domain, EvmAddress, KdfError, SignatureError,
    SignedSnapshot, SplitSignature, UncompressedPoint,
};

use crate::gateway::{SignRequest, SignerError, SignerGateway};

/// Error types for the signing pipeline
#[derive(Error, Debug)]
pub enum SigningError {
    #[error(transparent)]
    Signer(#[from] SignerError),
    #[error(transparent)]
    Kdf(#[from] KdfError),
    #[error(transparent)]
    Signature(#[from] SignatureError),
}

/// Root public key and the address derived from it, computed once per
/// process and treated as read-only afterwards
#[derive(Debug, Clone)]
pub struct SigningIdentity {
    pub root_public_key: UncompressedPoint,
    pub address: EvmAddress,
}

/// Client for the remote threshold signer. Holds the fixed derivation
/// identity (account, path, key version) and caches the derived address.
pub struct MpcSigningClient<G> {
    gateway: G,
    account_id: String,
    path: String,
    key_version: u32,
    identity: OnceCell<SigningIdentity>,
}

/// Strip the curve tag and decode the base58 body of a wire-form root key
pub fn decode_root_public_key(wire: &str) -> Result<Vec<u8>, SignerError> {
    let stripped = wire.strip_prefix("secp256k1:").unwrap_or(wire);
    bs58::decode(stripped)
        .into_vec()
        .map_err(|e| SignerError::MalformedSignerResponse(format!("root key is not base58: {e}")))
}

impl<G: SignerGateway> MpcSigningClient<G> {
    pub fn new(gateway: G, account_id: String, path: String, key_version: u32) -> Self {
        Self {
            gateway,
            account_id,
            path,
            key_version,
            identity: OnceCell::new(),
        }
    }

    /// Root key + derived agent address. Fetched and derived exactly once;
    /// concurrent first calls are serialized by the cell.
    pub async fn identity(&self) -> Result<&SigningIdentity, SigningError> {
        self.identity
            .get_or_try_init(|| async {
                let wire = self.gateway.root_public_key().await?;
                let raw = decode_root_public_key(&wire)?;
                let root_public_key = normalize_public_key(&raw)?;
                let address = derive_agent_address(&root_public_key, &self.account_id, &self.path)?;
                tracing::info!(address = %address, path = %self.path, "derived agent address from signer root key");
                Ok(SigningIdentity {
                    root_public_key,
                    address,
                })
            })
            .await
    }

    /// Derived agent EVM address
    pub async fn agent_address(&self) -> Result<EvmAddress, SigningError> {
        Ok(self.identity().await?.address)
    }

    /// One signing call against the remote network
    pub async fn sign_digest(&self, digest: [u8; 32]) -> Result<SplitSignature, SigningError> {
        let request = SignRequest {
            payload: digest,
            path: self.path.clone(),
            key_version: self.key_version,
        };
        let response = self.gateway.sign(&request).await?;
        Ok(SplitSignature {
            big_r_hex: response.big_r.affine_point,
            s_hex: response.s.scalar,
            recovery_id: response.recovery_id,
        })
    }

    /// Full pipeline for one attestation: hash the payload, obtain the split
    /// signature, assemble it, and prove the signer is the derived agent
    /// before anything is returned. Every failure is terminal for the
    /// request; a snapshot that fails self-verification is never returned.
    pub async fn sign_snapshot(
        &self,
        domain: &Eip712Domain,
        snapshot: BalanceSnapshot,
    ) -> Result<SignedSnapshot, SigningError> {
        let identity = self.identity().await?.clone();
        let digest = snapshot_digest(domain, &snapshot);
        tracing::debug!(digest = %hex::encode(digest), chain_id = domain.chain_id, "signing snapshot digest");

        let split = self.sign_digest(digest).await?;
        let signature = assemble_signature(&split)?;
        verify_signature(&digest, &signature, &identity.address)?;

        tracing::info!(
            signer = %identity.address,
            chain_id = domain.chain_id,
            "snapshot signed and self-verified"
        );
        Ok(SignedSnapshot {
            snapshot,
            signature,
            agent_address: identity.address,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{BigR, SignatureResponse, S};
    use async_trait::async_trait;
    use num_bigint::BigUint;
    use oracle_core::derive_epsilon;
    use secp256k1::{All, Message, PublicKey, Scalar, Secp256k1, SecretKey};
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Signer double that holds a local root secret and answers both gateway
    /// operations the way the real network does: the root key in wire form,
    /// signatures under root + epsilon
    struct MockSigner {
        secp: Secp256k1<All>,
        root_secret: SecretKey,
        account_id: String,
        sign_with_root: bool,
        key_queries: AtomicUsize,
    }

    impl MockSigner {
        fn new(account_id: &str) -> Self {
            Self {
                secp: Secp256k1::new(),
                root_secret: SecretKey::new(&mut secp256k1::rand::thread_rng()),
                account_id: account_id.to_string(),
                sign_with_root: false,
                key_queries: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl SignerGateway for MockSigner {
        async fn root_public_key(&self) -> Result<String, SignerError> {
            self.key_queries.fetch_add(1, Ordering::SeqCst);
            let public = PublicKey::from_secret_key(&self.secp, &self.root_secret);
            let uncompressed = public.serialize_uncompressed();
            Ok(format!(
                "secp256k1:{}",
                bs58::encode(&uncompressed[1..]).into_string()
            ))
        }

        async fn sign(&self, request: &SignRequest) -> Result<SignatureResponse, SignerError> {
            let secret = if self.sign_with_root {
                self.root_secret
            } else {
                let epsilon = derive_epsilon(&self.account_id, &request.path);
                let tweak = Scalar::from_be_bytes(epsilon).unwrap();
                self.root_secret.add_tweak(&tweak).unwrap()
            };
            let message = Message::from_slice(&request.payload).unwrap();
            let recoverable = self.secp.sign_ecdsa_recoverable(&message, &secret);
            let (recovery_id, compact) = recoverable.serialize_compact();
            Ok(SignatureResponse {
                big_r: BigR {
                    affine_point: format!("02{}", hex::encode(&compact[..32])),
                },
                s: S {
                    scalar: hex::encode(&compact[32..]),
                },
                recovery_id: recovery_id.to_i32() as u8,
            })
        }
    }

    struct RejectingSigner;

    #[async_trait]
    impl SignerGateway for RejectingSigner {
        async fn root_public_key(&self) -> Result<String, SignerError> {
            Err(SignerError::RemoteSigningFailed("connection refused".into()))
        }

        async fn sign(&self, _request: &SignRequest) -> Result<SignatureResponse, SignerError> {
            Err(SignerError::RemoteSigningRejected("no success value".into()))
        }
    }

    fn test_client(signer: MockSigner) -> MpcSigningClient<MockSigner> {
        MpcSigningClient::new(
            signer,
            "oracle.testnet".to_string(),
            "ethereum-1".to_string(),
            0,
        )
    }

    fn test_domain() -> Eip712Domain {
        Eip712Domain {
            name: "AaveVault".to_string(),
            version: "1".to_string(),
            chain_id: 84532,
            verifying_contract: "0xB57D1241fb45B83E10039e9c2EaaB348628f2e03"
                .parse()
                .unwrap(),
        }
    }

    fn test_snapshot() -> BalanceSnapshot {
        BalanceSnapshot {
            balance: BigUint::from(1000000000u64),
            nonce: BigUint::from(0u32),
            deadline: BigUint::from(1700604800u64),
            assets: BigUint::from(1000000u64),
            receiver: "0x1234567890123456789012345678901234567890"
                .parse()
                .unwrap(),
        }
    }

    #[test]
    fn test_decode_root_public_key_strips_curve_tag() {
        let bytes = [7u8; 64];
        let wire = format!("secp256k1:{}", bs58::encode(&bytes).into_string());
        assert_eq!(decode_root_public_key(&wire).unwrap(), bytes);

        let untagged = bs58::encode(&bytes).into_string();
        assert_eq!(decode_root_public_key(&untagged).unwrap(), bytes);

        assert!(matches!(
            decode_root_public_key("secp256k1:0OIl"),
            Err(SignerError::MalformedSignerResponse(_))
        ));
    }

    #[tokio::test]
    async fn test_identity_is_cached_after_first_fetch() {
        let client = test_client(MockSigner::new("oracle.testnet"));

        let first = client.agent_address().await.unwrap();
        let second = client.agent_address().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(client.gateway.key_queries.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_sign_snapshot_pipeline_verifies_against_derived_address() {
        let client = test_client(MockSigner::new("oracle.testnet"));
        let domain = test_domain();

        let signed = client
            .sign_snapshot(&domain, test_snapshot())
            .await
            .unwrap();

        assert!(signed.signature[64] == 27 || signed.signature[64] == 28);
        assert_eq!(signed.agent_address, client.agent_address().await.unwrap());

        // Independently re-verifiable given the domain parameters
        let digest = snapshot_digest(&domain, &signed.snapshot);
        verify_signature(&digest, &signed.signature, &signed.agent_address).unwrap();
    }

    #[tokio::test]
    async fn test_sign_snapshot_rejects_wrong_signer_key() {
        // A signer that ignores the derivation path must fail the trust gate
        let mut signer = MockSigner::new("oracle.testnet");
        signer.sign_with_root = true;
        let client = test_client(signer);

        let result = client.sign_snapshot(&test_domain(), test_snapshot()).await;
        assert!(matches!(
            result,
            Err(SigningError::Signature(
                SignatureError::VerificationFailed { .. }
            ))
        ));
    }

    #[tokio::test]
    async fn test_signer_account_changes_derived_address() {
        let one = test_client(MockSigner::new("oracle.testnet"));
        let root = one.gateway.root_secret;

        let mut other_signer = MockSigner::new("other.testnet");
        other_signer.root_secret = root;
        let two = MpcSigningClient::new(
            other_signer,
            "other.testnet".to_string(),
            "ethereum-1".to_string(),
            0,
        );

        assert_ne!(
            one.agent_address().await.unwrap(),
            two.agent_address().await.unwrap()
        );
    }

    #[tokio::test]
    async fn test_gateway_errors_propagate_unretried() {
        let client = MpcSigningClient::new(
            RejectingSigner,
            "oracle.testnet".to_string(),
            "ethereum-1".to_string(),
            0,
        );

        let result = client.agent_address().await;
        assert!(matches!(
            result,
            Err(SigningError::Signer(SignerError::RemoteSigningFailed(_)))
        ));
    }
}
