use anyhow::{anyhow, Result};
use serde_json::Value;

use oracle_core::{snapshot_digest, verify_signature, Eip712Domain, EvmAddress, SignedSnapshot};

pub struct OracleClient {
    base_url: String,
    api_key: Option<String>,
}

impl OracleClient {
    pub fn new(base_url: String, api_key: Option<String>) -> Self {
        Self { base_url, api_key }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    fn authorize(&self, request: ureq::Request) -> ureq::Request {
        match &self.api_key {
            Some(key) => request.set("Authorization", &format!("Bearer {key}")),
            None => request,
        }
    }

    fn read_response(result: std::result::Result<ureq::Response, ureq::Error>) -> Result<Value> {
        match result {
            Ok(response) => Ok(response.into_json()?),
            Err(ureq::Error::Status(code, response)) => {
                let body = response.into_string().unwrap_or_default();
                Err(anyhow!("server returned {code}: {body}"))
            }
            Err(e) => Err(anyhow!("request failed: {e}")),
        }
    }

    pub fn agent_address(&self) -> Result<Value> {
        let request = self.authorize(ureq::get(&self.endpoint("/api/oracle/agent-address")));
        Self::read_response(request.call())
    }

    pub fn pool_value(&self, chain: Option<u64>) -> Result<Value> {
        let mut request = self.authorize(ureq::get(&self.endpoint("/api/oracle/pool-value")));
        if let Some(chain_id) = chain {
            request = request.query("vaultChainId", &chain_id.to_string());
        }
        Self::read_response(request.call())
    }

    pub fn balance_snapshot(
        &self,
        assets: &str,
        receiver: &str,
        chain: u64,
        validity: Option<u64>,
    ) -> Result<Value> {
        let mut body = serde_json::json!({
            "assets": assets,
            "receiver": receiver,
            "vaultChainId": chain,
        });
        if let Some(validity_secs) = validity {
            body["validitySeconds"] = validity_secs.into();
        }
        let request = self.authorize(ureq::post(&self.endpoint("/api/oracle/balance-snapshot")));
        Self::read_response(request.send_json(body))
    }
}

/// Re-verify a stored snapshot against its domain parameters; proves the
/// artifact is checkable without talking to the oracle
pub fn verify_snapshot_file(path: &str, chain_id: u64, vault: &str) -> Result<String> {
    let text = std::fs::read_to_string(path)?;
    let signed: SignedSnapshot = serde_json::from_str(&text)?;

    let verifying_contract: EvmAddress = vault.parse()?;
    let domain = Eip712Domain {
        name: "AaveVault".to_string(),
        version: "1".to_string(),
        chain_id,
        verifying_contract,
    };

    let digest = snapshot_digest(&domain, &signed.snapshot);
    verify_signature(&digest, &signed.signature, &signed.agent_address)?;
    Ok(format!("OK: snapshot signed by {}", signed.agent_address))
}
