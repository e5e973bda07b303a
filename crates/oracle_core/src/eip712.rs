//! EIP-712 structured-data hashing for balance snapshots
//!
//! Reproduces byte-for-byte the digest the verifying vault contract computes
//! on-chain. Any drift in field order, type tags or domain values makes the
//! resulting signature unverifiable.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

use crate::types::{u256_word, BalanceSnapshot, EvmAddress};

/// keccak256 convenience wrapper
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// keccak256("EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)")
pub const DOMAIN_TYPE: &str =
    "EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";

/// Payload type string; field order matches the vault contract declaration
pub const SNAPSHOT_TYPE: &str = "CrossChainBalanceSnapshot(uint256 balance,uint256 nonce,uint256 deadline,uint256 assets,address receiver)";

/// Identifies which verifying contract and chain a signature is valid for.
/// Changing any field changes the digest, which is what prevents replay
/// across chains and contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Eip712Domain {
    pub name: String,
    pub version: String,
    #[serde(rename = "chainId")]
    pub chain_id: u64,
    #[serde(rename = "verifyingContract")]
    pub verifying_contract: EvmAddress,
}

impl Eip712Domain {
    /// domainSeparator = keccak256(typeHash ‖ keccak(name) ‖ keccak(version)
    /// ‖ uint256(chainId) ‖ address)
    pub fn separator(&self) -> [u8; 32] {
        let mut buf = Vec::with_capacity(5 * 32);
        buf.extend_from_slice(&keccak256(DOMAIN_TYPE.as_bytes()));
        buf.extend_from_slice(&keccak256(self.name.as_bytes()));
        buf.extend_from_slice(&keccak256(self.version.as_bytes()));
        buf.extend_from_slice(&u256_word(&BigUint::from(self.chain_id)));
        buf.extend_from_slice(&address_word(&self.verifying_contract));
        keccak256(&buf)
    }
}

fn address_word(address: &EvmAddress) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Hash of the typed payload struct
pub fn struct_hash(snapshot: &BalanceSnapshot) -> [u8; 32] {
    let mut buf = Vec::with_capacity(6 * 32);
    buf.extend_from_slice(&keccak256(SNAPSHOT_TYPE.as_bytes()));
    buf.extend_from_slice(&u256_word(&snapshot.balance));
    buf.extend_from_slice(&u256_word(&snapshot.nonce));
    buf.extend_from_slice(&u256_word(&snapshot.deadline));
    buf.extend_from_slice(&u256_word(&snapshot.assets));
    buf.extend_from_slice(&address_word(&snapshot.receiver));
    keccak256(&buf)
}

/// Final signing digest: keccak256(0x19 ‖ 0x01 ‖ domainSeparator ‖ structHash)
pub fn snapshot_digest(domain: &Eip712Domain, snapshot: &BalanceSnapshot) -> [u8; 32] {
    let mut buf = Vec::with_capacity(2 + 2 * 32);
    buf.extend_from_slice(b"\x19\x01");
    buf.extend_from_slice(&domain.separator());
    buf.extend_from_slice(&struct_hash(snapshot));
    keccak256(&buf)
}
