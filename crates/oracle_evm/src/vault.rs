//! Vault and balance collaborators
//!
//! Supplies the aggregated aToken balance and the vault nonce a snapshot is
//! built from. Any failure here must surface before a signing call is made;
//! a snapshot is never built from partial data.

use num_bigint::BigUint;
use serde::Serialize;
use thiserror::Error;

use oracle_core::EvmAddress;

use crate::rpc::{address_arg, decode_uint, encode_call, EvmRpcClient, EvmRpcError};

/// Error types for vault and balance reads
#[derive(Error, Debug)]
pub enum VaultError {
    #[error("chain {0} is not configured")]
    UnknownChain(u64),
    #[error("chain {0} has no vault configured")]
    NoVault(u64),
    #[error(transparent)]
    Rpc(#[from] EvmRpcError),
}

/// Per-chain addresses the oracle reads from
#[derive(Debug, Clone)]
pub struct ChainConfig {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub atoken: EvmAddress,
    pub usdc: EvmAddress,
    pub vault: Option<EvmAddress>,
}

/// Balances observed on one chain
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainBalance {
    pub chain_id: u64,
    pub chain_name: String,
    pub a_token_balance: String,
    pub usdc_balance: String,
}

/// Aggregated holdings across every configured chain
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolValue {
    pub total_a_tokens: String,
    pub total_usdc: String,
    pub total_value: String,
    pub agent_address: EvmAddress,
    pub chain_balances: Vec<ChainBalance>,
    pub timestamp: u64,
}

/// Aggregated balance plus the per-chain breakdown it was computed from
#[derive(Debug, Clone)]
pub struct AggregatedBalances {
    pub total_atokens: BigUint,
    pub total_usdc: BigUint,
    pub chain_balances: Vec<ChainBalance>,
}

/// Reads vault state and token balances across the configured chains
pub struct VaultReader {
    chains: Vec<(ChainConfig, EvmRpcClient)>,
    allow_missing_nonce: bool,
}

impl VaultReader {
    pub fn new(
        chains: Vec<ChainConfig>,
        timeout_secs: u64,
        allow_missing_nonce: bool,
    ) -> Result<Self, VaultError> {
        let mut bound = Vec::with_capacity(chains.len());
        for chain in chains {
            let client = EvmRpcClient::new(chain.rpc_url.clone(), timeout_secs)?;
            bound.push((chain, client));
        }
        Ok(Self {
            chains: bound,
            allow_missing_nonce,
        })
    }

    pub fn chain(&self, chain_id: u64) -> Result<&ChainConfig, VaultError> {
        self.chains
            .iter()
            .map(|(chain, _)| chain)
            .find(|chain| chain.chain_id == chain_id)
            .ok_or(VaultError::UnknownChain(chain_id))
    }

    fn client(&self, chain_id: u64) -> Result<&EvmRpcClient, VaultError> {
        self.chains
            .iter()
            .find(|(chain, _)| chain.chain_id == chain_id)
            .map(|(_, client)| client)
            .ok_or(VaultError::UnknownChain(chain_id))
    }

    /// Current replay nonce of the vault on the given chain.
    ///
    /// Vaults that predate the nonce-reporting method revert the call; that
    /// is only tolerated when `allow_missing_nonce` is set, and logged loudly.
    pub async fn vault_nonce(&self, chain_id: u64) -> Result<BigUint, VaultError> {
        let chain = self.chain(chain_id)?;
        let vault = chain.vault.ok_or(VaultError::NoVault(chain_id))?;
        let client = self.client(chain_id)?;

        let data = encode_call("crossChainBalanceNonce()", &[]);
        match client.eth_call(&vault, &data).await {
            Ok(output) => Ok(decode_uint(&output)?),
            Err(EvmRpcError::Reverted(detail)) if self.allow_missing_nonce => {
                tracing::warn!(
                    chain_id,
                    vault = %vault,
                    detail,
                    "vault does not report a nonce, falling back to 0"
                );
                Ok(BigUint::from(0u32))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// ERC-20 balanceOf read
    pub async fn token_balance(
        &self,
        chain_id: u64,
        token: &EvmAddress,
        holder: &EvmAddress,
    ) -> Result<BigUint, VaultError> {
        let client = self.client(chain_id)?;
        let data = encode_call("balanceOf(address)", &[address_arg(holder)]);
        let output = client.eth_call(token, &data).await?;
        Ok(decode_uint(&output)?)
    }

    /// Sum the agent's aToken holdings (and the vaults' USDC buffers) across
    /// every configured chain. The aToken total is the `balance` field of
    /// every snapshot.
    pub async fn aggregate(&self, agent: &EvmAddress) -> Result<AggregatedBalances, VaultError> {
        let mut total_atokens = BigUint::from(0u32);
        let mut total_usdc = BigUint::from(0u32);
        let mut chain_balances = Vec::with_capacity(self.chains.len());

        for (chain, _) in &self.chains {
            let atoken_balance = self
                .token_balance(chain.chain_id, &chain.atoken, agent)
                .await?;
            let usdc_balance = match &chain.vault {
                Some(vault) => self.token_balance(chain.chain_id, &chain.usdc, vault).await?,
                None => BigUint::from(0u32),
            };

            tracing::debug!(
                chain_id = chain.chain_id,
                atokens = %atoken_balance,
                usdc = %usdc_balance,
                "chain balances fetched"
            );

            total_atokens += &atoken_balance;
            total_usdc += &usdc_balance;
            chain_balances.push(ChainBalance {
                chain_id: chain.chain_id,
                chain_name: chain.name.clone(),
                a_token_balance: atoken_balance.to_str_radix(10),
                usdc_balance: usdc_balance.to_str_radix(10),
            });
        }

        Ok(AggregatedBalances {
            total_atokens,
            total_usdc,
            chain_balances,
        })
    }
}

impl AggregatedBalances {
    pub fn into_pool_value(self, agent: EvmAddress, timestamp: u64) -> PoolValue {
        let total_value = &self.total_atokens + &self.total_usdc;
        PoolValue {
            total_a_tokens: self.total_atokens.to_str_radix(10),
            total_usdc: self.total_usdc.to_str_radix(10),
            total_value: total_value.to_str_radix(10),
            agent_address: agent,
            chain_balances: self.chain_balances,
            timestamp,
        }
    }
}
