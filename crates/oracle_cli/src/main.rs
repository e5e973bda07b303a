mod api;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "oracle-cli")]
#[command(about = "MPC Snapshot Oracle CLI Client")]
#[command(version = "0.1.0")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, default_value = "http://127.0.0.1:3001")]
    server_url: String,

    #[arg(long, env = "ORACLE_API_KEY")]
    api_key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Derived agent EVM address
    AgentAddress,
    /// Aggregated pool value across all configured chains
    PoolValue {
        #[arg(long)]
        chain: Option<u64>,
    },
    /// Request a signed balance snapshot
    Snapshot {
        /// Deposit amount in the vault asset's smallest unit
        #[arg(long)]
        assets: String,
        /// Receiver of the vault shares
        #[arg(long)]
        receiver: String,
        /// Chain id of the verifying vault
        #[arg(long)]
        chain: u64,
        /// Attestation validity window in seconds
        #[arg(long)]
        validity: Option<u64>,
    },
    /// Verify a previously returned snapshot against its domain parameters
    Verify {
        /// Path to a JSON file holding the signed snapshot
        #[arg(long)]
        file: String,
        /// Chain id of the verifying vault
        #[arg(long)]
        chain: u64,
        /// Vault contract address
        #[arg(long)]
        vault: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = api::OracleClient::new(cli.server_url, cli.api_key);

    match cli.command {
        Commands::AgentAddress => {
            let response = client.agent_address()?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::PoolValue { chain } => {
            let response = client.pool_value(chain)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Snapshot {
            assets,
            receiver,
            chain,
            validity,
        } => {
            let response = client.balance_snapshot(&assets, &receiver, chain, validity)?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Verify { file, chain, vault } => {
            let outcome = api::verify_snapshot_file(&file, chain, &vault)?;
            println!("{outcome}");
        }
    }

    Ok(())
}
