//! Shared types for the snapshot oracle

use std::fmt;
use std::str::FromStr;

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::eip712::keccak256;

/// Uncompressed secp256k1 public key (0x04-prefixed, 65 bytes)
pub type UncompressedPoint = [u8; 65];

/// Recoverable ECDSA signature in r(32) ‖ s(32) ‖ v(1) layout
pub type RsvSignature = [u8; 65];

/// Error types for address parsing
#[derive(Error, Debug)]
pub enum AddressError {
    #[error("address is not valid hex: {0}")]
    InvalidHex(String),
    #[error("address must decode to exactly 20 bytes, got {0}")]
    InvalidLength(usize),
}

/// 20-byte EVM account address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EvmAddress(pub [u8; 20]);

impl EvmAddress {
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn from_slice(bytes: &[u8]) -> Result<Self, AddressError> {
        if bytes.len() != 20 {
            return Err(AddressError::InvalidLength(bytes.len()));
        }
        let mut address = [0u8; 20];
        address.copy_from_slice(bytes);
        Ok(EvmAddress(address))
    }

    /// EIP-55 mixed-case checksum rendering
    pub fn to_checksum_string(&self) -> String {
        let hex_addr = hex::encode(self.0);
        let hash = keccak256(hex_addr.as_bytes());
        let mut out = String::with_capacity(42);
        out.push_str("0x");
        for (i, c) in hex_addr.chars().enumerate() {
            let nibble = (hash[i / 2] >> (4 * (1 - i % 2))) & 0x0f;
            if c.is_ascii_alphabetic() && nibble >= 8 {
                out.push(c.to_ascii_uppercase());
            } else {
                out.push(c);
            }
        }
        out
    }
}

impl FromStr for EvmAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        EvmAddress::from_slice(&bytes)
    }
}

impl fmt::Display for EvmAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_checksum_string())
    }
}

impl Serialize for EvmAddress {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_checksum_string())
    }
}

impl<'de> Deserialize<'de> for EvmAddress {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Whether a value is representable as a Solidity uint256
pub fn fits_uint256(value: &BigUint) -> bool {
    value.bits() <= 256
}

/// Left-pad a big-endian integer into a 32-byte ABI word.
/// Callers validate the 256-bit range before encoding.
pub fn u256_word(value: &BigUint) -> [u8; 32] {
    let bytes = value.to_bytes_be();
    let mut word = [0u8; 32];
    if bytes.len() > 32 {
        word.copy_from_slice(&bytes[bytes.len() - 32..]);
    } else {
        word[32 - bytes.len()..].copy_from_slice(&bytes);
    }
    word
}

/// Decimal-string serde for uint256 fields, matching the wire format the
/// vault contracts and downstream tooling expect
pub mod u256_string {
    use num_bigint::BigUint;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &BigUint, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(10))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        let value: BigUint = s
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("not a decimal integer: {s}")))?;
        if !super::fits_uint256(&value) {
            return Err(serde::de::Error::custom("value exceeds 256 bits"));
        }
        Ok(value)
    }
}

/// 0x-prefixed hex serde for 65-byte signatures
pub mod signature_hex {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::RsvSignature;

    pub fn serialize<S: Serializer>(sig: &RsvSignature, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("0x{}", hex::encode(sig)))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<RsvSignature, D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = hex::decode(s.strip_prefix("0x").unwrap_or(&s))
            .map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|v: Vec<u8>| {
                serde::de::Error::custom(format!("signature must be 65 bytes, got {}", v.len()))
            })
    }
}

/// Attestation payload signed by the oracle: the off-chain aggregated
/// balance plus the deposit the receiver is asking the vault to accept
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceSnapshot {
    #[serde(with = "u256_string")]
    pub balance: BigUint,
    #[serde(with = "u256_string")]
    pub nonce: BigUint,
    #[serde(with = "u256_string")]
    pub deadline: BigUint,
    #[serde(with = "u256_string")]
    pub assets: BigUint,
    pub receiver: EvmAddress,
}

/// Final artifact returned to callers; immutable once constructed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedSnapshot {
    #[serde(flatten)]
    pub snapshot: BalanceSnapshot,
    #[serde(with = "signature_hex")]
    pub signature: RsvSignature,
    #[serde(rename = "agentAddress")]
    pub agent_address: EvmAddress,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_roundtrip_and_checksum() {
        // Checksum vector from EIP-55
        let addr: EvmAddress = "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
            .parse()
            .expect("valid address");
        assert_eq!(
            addr.to_checksum_string(),
            "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"
        );

        // Parsing is case-insensitive
        let upper: EvmAddress = "0x5AAEB6053F3E94C9B9A09F33669435E7EF1BEAED"
            .parse()
            .expect("valid address");
        assert_eq!(addr, upper);
    }

    #[test]
    fn test_address_rejects_wrong_length() {
        let short = "0x1234".parse::<EvmAddress>();
        assert!(matches!(short, Err(AddressError::InvalidLength(2))));

        let garbage = "0xzz34567890123456789012345678901234567890".parse::<EvmAddress>();
        assert!(matches!(garbage, Err(AddressError::InvalidHex(_))));
    }

    #[test]
    fn test_u256_word_padding() {
        let one = BigUint::from(1u32);
        let word = u256_word(&one);
        assert_eq!(word[31], 1);
        assert!(word[..31].iter().all(|&b| b == 0));

        let max = (BigUint::from(1u32) << 256u32) - 1u32;
        assert!(fits_uint256(&max));
        assert!(!fits_uint256(&(max + 1u32)));
    }

    #[test]
    fn test_snapshot_serializes_as_decimal_strings() {
        let snapshot = BalanceSnapshot {
            balance: BigUint::from(1000000000u64),
            nonce: BigUint::from(0u32),
            deadline: BigUint::from(1700000000u64),
            assets: BigUint::from(1000000u64),
            receiver: "0x1234567890123456789012345678901234567890"
                .parse()
                .unwrap(),
        };

        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["balance"], "1000000000");
        assert_eq!(json["nonce"], "0");
        assert_eq!(json["assets"], "1000000");

        let back: BalanceSnapshot = serde_json::from_value(json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn test_signed_snapshot_flattens_payload() {
        let signed = SignedSnapshot {
            snapshot: BalanceSnapshot {
                balance: BigUint::from(1u32),
                nonce: BigUint::from(2u32),
                deadline: BigUint::from(3u32),
                assets: BigUint::from(4u32),
                receiver: "0x1234567890123456789012345678901234567890"
                    .parse()
                    .unwrap(),
            },
            signature: [0x11u8; 65],
            agent_address: "0x5aaeb6053f3e94c9b9a09f33669435e7ef1beaed"
                .parse()
                .unwrap(),
        };

        let json = serde_json::to_value(&signed).unwrap();
        assert_eq!(json["balance"], "1");
        assert_eq!(json["receiver"], "0x1234567890123456789012345678901234567890");
        let sig = json["signature"].as_str().unwrap();
        assert!(sig.starts_with("0x"));
        assert_eq!(sig.len(), 132);
        assert!(json["agentAddress"].is_string());
    }
}
