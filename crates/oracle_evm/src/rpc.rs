//! Minimal JSON-RPC client for EVM chain reads

use std::time::Duration;

use num_bigint::BigUint;
use serde_json::{json, Value};
use thiserror::Error;

use oracle_core::{keccak256, EvmAddress};

/// Error types for EVM RPC reads
#[derive(Error, Debug)]
pub enum EvmRpcError {
    #[error("rpc transport error: {0}")]
    Transport(String),
    #[error("rpc error {code}: {message}")]
    Node { code: i64, message: String },
    #[error("call reverted: {0}")]
    Reverted(String),
    #[error("unexpected rpc response: {0}")]
    UnexpectedResponse(String),
}

/// First four bytes of keccak256 of the canonical function signature
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// ABI-encode a call: selector followed by 32-byte argument words
pub fn encode_call(signature: &str, args: &[[u8; 32]]) -> Vec<u8> {
    let mut data = Vec::with_capacity(4 + args.len() * 32);
    data.extend_from_slice(&selector(signature));
    for arg in args {
        data.extend_from_slice(arg);
    }
    data
}

/// Left-pad an address into an ABI argument word
pub fn address_arg(address: &EvmAddress) -> [u8; 32] {
    let mut word = [0u8; 32];
    word[12..].copy_from_slice(address.as_bytes());
    word
}

/// Decode a single uint256 return word
pub fn decode_uint(output: &[u8]) -> Result<BigUint, EvmRpcError> {
    if output.len() < 32 {
        return Err(EvmRpcError::UnexpectedResponse(format!(
            "expected a 32-byte return word, got {} bytes",
            output.len()
        )));
    }
    Ok(BigUint::from_bytes_be(&output[..32]))
}

/// JSON-RPC client bound to one chain's node endpoint
pub struct EvmRpcClient {
    client: reqwest::Client,
    url: String,
}

impl EvmRpcClient {
    pub fn new(url: String, timeout_secs: u64) -> Result<Self, EvmRpcError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| EvmRpcError::Transport(e.to_string()))?;
        Ok(Self { client, url })
    }

    /// eth_call against the latest block, returning the raw output bytes
    pub async fn eth_call(&self, to: &EvmAddress, data: &[u8]) -> Result<Vec<u8>, EvmRpcError> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": "eth_call",
            "params": [
                {
                    "to": format!("0x{}", hex::encode(to.as_bytes())),
                    "data": format!("0x{}", hex::encode(data)),
                },
                "latest",
            ],
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| EvmRpcError::Transport(e.to_string()))?;

        let envelope: Value = response
            .json()
            .await
            .map_err(|e| EvmRpcError::Transport(e.to_string()))?;

        if let Some(error) = envelope.get("error") {
            let code = error["code"].as_i64().unwrap_or(0);
            let message = error["message"].as_str().unwrap_or("").to_string();
            if message.to_lowercase().contains("revert") {
                return Err(EvmRpcError::Reverted(message));
            }
            return Err(EvmRpcError::Node { code, message });
        }

        let result = envelope["result"].as_str().ok_or_else(|| {
            EvmRpcError::UnexpectedResponse("result field missing or not a string".to_string())
        })?;
        hex::decode(result.strip_prefix("0x").unwrap_or(result))
            .map_err(|e| EvmRpcError::UnexpectedResponse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_core::u256_word;

    #[test]
    fn test_selector_known_vectors() {
        // Canonical ERC-20 selectors
        assert_eq!(selector("balanceOf(address)"), [0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(
            selector("transfer(address,uint256)"),
            [0xa9, 0x05, 0x9c, 0xbb]
        );
    }

    #[test]
    fn test_encode_call_layout() {
        let holder: EvmAddress = "0x1234567890123456789012345678901234567890"
            .parse()
            .unwrap();
        let data = encode_call("balanceOf(address)", &[address_arg(&holder)]);
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(&data[..4], &[0x70, 0xa0, 0x82, 0x31]);
        assert!(data[4..16].iter().all(|&b| b == 0));
        assert_eq!(&data[16..36], holder.as_bytes());
    }

    #[test]
    fn test_decode_uint() {
        let word = u256_word(&BigUint::from(123456u64));
        assert_eq!(decode_uint(&word).unwrap(), BigUint::from(123456u64));

        assert!(matches!(
            decode_uint(&[0u8; 4]),
            Err(EvmRpcError::UnexpectedResponse(_))
        ));

        // Empty return data (e.g. call to an address without code)
        assert!(decode_uint(&[]).is_err());
    }
}
