//! Configuration management for the oracle server

use serde::{Deserialize, Serialize};
use std::path::Path;

use oracle_core::{AddressError, Eip712Domain};
use oracle_evm::ChainConfig;
use oracle_mpc::SignerConfig;

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Server configuration
    pub server: ServerConfig,
    /// Remote signer gateway configuration
    pub signer: SignerSettings,
    /// Attestation policy
    pub policy: PolicyConfig,
    /// Supported chains
    #[serde(default)]
    pub chains: Vec<ChainSettings>,
}

/// Server-specific configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// Bearer token required on every non-health route
    pub api_key: Option<String>,
}

/// Remote signer settings: gateway endpoint plus the fixed derivation identity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignerSettings {
    pub base_url: String,
    pub api_key: Option<String>,
    /// Account the signer network derives child keys for
    pub account_id: String,
    /// Derivation path, e.g. "ethereum-1"
    pub path: String,
    pub key_version: u32,
    pub timeout_secs: u64,
}

/// Attestation policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyConfig {
    /// EIP-712 domain name shared by every supported vault
    pub domain_name: String,
    /// EIP-712 domain version
    pub domain_version: String,
    /// Default attestation validity window in seconds
    pub validity_window_secs: u64,
    /// Upper bound on caller-requested validity windows
    pub max_validity_secs: u64,
    /// Tolerate vaults that do not yet report a replay nonce (falls back
    /// to nonce 0, logged at WARN). Known-temporary; off by default.
    pub allow_missing_nonce: bool,
    /// Timeout for chain RPC reads
    pub rpc_timeout_secs: u64,
}

/// Per-chain addresses, hex-encoded as they appear in configuration files
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChainSettings {
    pub chain_id: u64,
    pub name: String,
    pub rpc_url: String,
    pub atoken: String,
    pub usdc: String,
    pub vault: Option<String>,
}

impl ChainSettings {
    pub fn to_chain_config(&self) -> Result<ChainConfig, AddressError> {
        Ok(ChainConfig {
            chain_id: self.chain_id,
            name: self.name.clone(),
            rpc_url: self.rpc_url.clone(),
            atoken: self.atoken.parse()?,
            usdc: self.usdc.parse()?,
            vault: self.vault.as_deref().map(str::parse).transpose()?,
        })
    }
}

impl AppConfig {
    /// Load configuration from file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::from(path.as_ref()))
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from default locations
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            // Default configuration
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 3001)?
            .set_default("signer.base_url", "http://127.0.0.1:3030")?
            .set_default("signer.account_id", "oracle.testnet")?
            .set_default("signer.path", "ethereum-1")?
            .set_default("signer.key_version", 0)?
            .set_default("signer.timeout_secs", 60)?
            .set_default("policy.domain_name", "AaveVault")?
            .set_default("policy.domain_version", "1")?
            .set_default("policy.validity_window_secs", 3600)?
            .set_default("policy.max_validity_secs", 604800)?
            .set_default("policy.allow_missing_nonce", false)?
            .set_default("policy.rpc_timeout_secs", 30)?
            // Environment variables
            .add_source(config::Environment::with_prefix("ORACLE").separator("__"))
            // Configuration file
            .add_source(config::File::with_name("config/oracle").required(false))
            .build()?;

        let mut app: AppConfig = config.try_deserialize()?;
        if app.chains.is_empty() {
            app.chains = Self::default_chains();
        }
        Ok(app)
    }

    /// Get the socket address for the server
    pub fn socket_addr(&self) -> std::net::SocketAddr {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .expect("Invalid socket address")
    }

    /// Get the signer gateway configuration
    pub fn signer_config(&self) -> SignerConfig {
        SignerConfig {
            base_url: self.signer.base_url.clone(),
            api_key: self.signer.api_key.clone(),
            timeout_secs: self.signer.timeout_secs,
        }
    }

    /// Parse the configured chains into typed form
    pub fn chain_configs(&self) -> Result<Vec<ChainConfig>, AddressError> {
        self.chains.iter().map(ChainSettings::to_chain_config).collect()
    }

    /// EIP-712 domain for a chain's vault
    pub fn domain_for(&self, chain: &ChainConfig) -> Option<Eip712Domain> {
        chain.vault.map(|vault| Eip712Domain {
            name: self.policy.domain_name.clone(),
            version: self.policy.domain_version.clone(),
            chain_id: chain.chain_id,
            verifying_contract: vault,
        })
    }

    /// Testnet chains the original deployment watches; used when no chains
    /// are configured
    pub fn default_chains() -> Vec<ChainSettings> {
        vec![
            ChainSettings {
                chain_id: 11155111,
                name: "Ethereum Sepolia".to_string(),
                rpc_url: "https://ethereum-sepolia-rpc.publicnode.com".to_string(),
                atoken: "0x6Ae43d3271ff6888e7Fc43Fd7321a503ff738951".to_string(),
                usdc: "0xaA8E23Fb1079EA71e0a56F48a2aA51851D8433D0".to_string(),
                vault: None,
            },
            ChainSettings {
                chain_id: 84532,
                name: "Base Sepolia".to_string(),
                rpc_url: "https://sepolia.base.org".to_string(),
                atoken: "0x6a9d64f93db660eacb2b6e9424792c630cda87d8".to_string(),
                usdc: "0x036CbD53842c5426634e7929541eC2318f3dCF7e".to_string(),
                vault: Some("0xB57D1241fb45B83E10039e9c2EaaB348628f2e03".to_string()),
            },
            ChainSettings {
                chain_id: 421614,
                name: "Arbitrum Sepolia".to_string(),
                rpc_url: "https://sepolia-rollup.arbitrum.io/rpc".to_string(),
                atoken: "0xBfC91D59fdAA134A4ED45f7B584cAf96D7792Eff".to_string(),
                usdc: "0x75faf114eafb1BDbe2F0316DF893fd58CE46AA4d".to_string(),
                vault: Some("0xd8a3fec99a7ed4ead5effb00c3017603cdca03c9".to_string()),
            },
            ChainSettings {
                chain_id: 11155420,
                name: "Optimism Sepolia".to_string(),
                rpc_url: "https://sepolia.optimism.io".to_string(),
                atoken: "0xb50201558B00496A145fE76f7424749556E326D8".to_string(),
                usdc: "0x5fd84259d66Cd46123540766Be93DFE6D43130D7".to_string(),
                vault: None,
            },
        ]
    }
}
