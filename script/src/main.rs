//! Shielded account CLI.
//!
//! Subcommands:
//!   address       - Encode a 0zk address from public keys
//!   decode        - Decode a 0zk address
//!   sync          - Pull protocol receipts into the JSON cache file
//!   shield-key    - Derive the shield private key from PRIVATE_KEY
//!   unshield-fee  - Show the relay fee split for a native unshield
//!   adapt-params  - Ask the relay adapter for a native unshield's adapt params
//!
//! Env vars (from .env):
//!   RPC_URL               - JSON-RPC endpoint (sync, adapt-params)
//!   PRIVATE_KEY           - Signer key (shield-key)
//!   RAILGUN_ADDRESS       - Protocol contract (default: Sepolia deployment)
//!   START_BLOCK           - Deployment block (default: 4495479)
//!   CHAIN_ID              - Chain id (default: 11155111)
//!   RELAY_ADAPT_ADDRESS   - Relay adapter contract (adapt-params)
//!   WRAPPED_NATIVE_TOKEN  - Wrapped native token
//!   LOG_BATCH_SIZE        - Blocks per eth_getLogs request (default: 500)
//!   CACHE_FILE            - Sync cache path (default: cache.json)

use alloy::primitives::{Address, FixedBytes, B256, U256};
use alloy::providers::ProviderBuilder;
use alloy::rpc::types::TransactionReceipt;
use alloy::signers::local::PrivateKeySigner;
use anyhow::{ensure, Context, Result};
use clap::{Parser, Subcommand};
use shielded_account_client::abi::native_unshield_action_data;
use shielded_account_client::builder::adapt_params;
use shielded_account_client::collaborators::ShieldKeySigner;
use shielded_account_client::{AccountConfig, AlloyLedger, Cache, ChainSynchronizer};
use shielded_account_lib::address::ADDRESS_VERSION;
use shielded_account_lib::{
    decode_address, encode_address, shield_private_key_from_signature, unshield_fee,
    value_after_unshield_fee, AddressData, Chain, SHIELD_SIGNATURE_MESSAGE,
};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::info;

#[derive(Parser)]
#[command(name = "shielded-account")]
#[command(about = "Private account tooling for the shielded-value protocol")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a 0zk address
    Address {
        /// Master public key (decimal or 0x-hex)
        #[arg(long)]
        master_public_key: String,
        /// Viewing public key (hex, 32 bytes)
        #[arg(long)]
        viewing_public_key: String,
        /// Restrict the address to one EVM chain
        #[arg(long)]
        chain_id: Option<u64>,
    },
    /// Decode a 0zk address
    Decode { address: String },
    /// Fetch protocol receipts since the cached end block
    Sync {
        /// Start block when no cache exists yet
        #[arg(long)]
        start_block: Option<u64>,
    },
    /// Derive the shield private key from PRIVATE_KEY
    ShieldKey,
    /// Fee split of a native unshield
    UnshieldFee {
        /// Note value in base units
        value: u128,
    },
    /// Compute adapt params for a native unshield
    AdaptParams {
        /// Native currency receiver
        #[arg(long)]
        receiver: Address,
        /// Note value in base units
        #[arg(long)]
        value: u128,
        /// Nullifiers of the notes being spent (hex, repeatable)
        #[arg(long = "nullifier")]
        nullifiers: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config()?;

    match cli.command {
        Commands::Address {
            master_public_key,
            viewing_public_key,
            chain_id,
        } => {
            let data = AddressData {
                master_public_key: U256::from_str(&master_public_key)
                    .context("invalid master public key")?,
                viewing_public_key: decode_hex_32(&viewing_public_key)?,
                chain: chain_id.map(Chain::evm),
                version: ADDRESS_VERSION,
            };
            println!("{}", encode_address(&data)?);
        }
        Commands::Decode { address } => {
            let data = decode_address(&address)?;
            println!("Version:             {}", data.version);
            println!("Master public key:   {:#x}", data.master_public_key);
            println!("Viewing public key:  0x{}", hex::encode(data.viewing_public_key));
            match data.chain {
                Some(chain) => println!("Chain:               {:?} {}", chain.chain_type, chain.id),
                None => println!("Chain:               all"),
            }
        }
        Commands::Sync { start_block } => {
            let cache_path = cache_path();
            let prior = load_cache(&cache_path)?;
            let ledger = connect()?;

            let synchronizer = ChainSynchronizer::from_config(&config);
            let cache = synchronizer.update_cache(&ledger, prior, start_block).await?;

            std::fs::write(&cache_path, serde_json::to_string_pretty(&cache)?)
                .with_context(|| format!("failed to write {}", cache_path.display()))?;
            println!("Receipts:   {}", cache.receipts.len());
            println!("End block:  {}", cache.end_block);
            println!("Cache:      {}", cache_path.display());
        }
        Commands::ShieldKey => {
            let private_key = std::env::var("PRIVATE_KEY").context("PRIVATE_KEY not set")?;
            let signer: PrivateKeySigner = private_key.parse()?;
            let signature = ShieldKeySigner::sign_message(&signer, SHIELD_SIGNATURE_MESSAGE.as_bytes()).await?;
            println!("Signer:      {}", signer.address());
            println!("Shield key:  0x{}", hex::encode(shield_private_key_from_signature(&signature)));
        }
        Commands::UnshieldFee { value } => {
            let bps = config.unshield_fee_basis_points;
            println!("Value:     {value}");
            println!("Fee:       {} ({bps} bps)", unshield_fee(value, bps));
            println!("Received:  {}", value_after_unshield_fee(value, bps));
        }
        Commands::AdaptParams {
            receiver,
            value,
            nullifiers,
        } => {
            ensure!(!nullifiers.is_empty(), "at least one --nullifier is required");
            let relay_adapt = config
                .relay_adapt_address
                .context("RELAY_ADAPT_ADDRESS not set")?;
            let nullifiers = nullifiers
                .iter()
                .map(|n| decode_hex_32(n).map(B256::from))
                .collect::<Result<Vec<_>>>()?;

            let reduced = value_after_unshield_fee(value, config.unshield_fee_basis_points);
            let random: [u8; 31] = rand::random();
            let action_data = native_unshield_action_data(
                relay_adapt,
                receiver,
                U256::from(reduced),
                FixedBytes(random),
                U256::from(config.relay_min_gas_limit),
            );

            let ledger = connect()?;
            let params = adapt_params(&ledger, relay_adapt, nullifiers, &action_data).await?;
            println!("Relay adapt:   {relay_adapt}");
            println!("Unwrap amount: {reduced}");
            println!("Random:        {}", action_data.random);
            println!("Adapt params:  {params}");
        }
    }

    Ok(())
}

/// Defaults overridden from the environment.
fn load_config() -> Result<AccountConfig> {
    let mut config = AccountConfig::default();
    if let Some(address) = env_parse("RAILGUN_ADDRESS")? {
        config.railgun_address = address;
    }
    if let Some(block) = env_parse("START_BLOCK")? {
        config.start_block = block;
    }
    if let Some(chain_id) = env_parse("CHAIN_ID")? {
        config.chain_id = chain_id;
    }
    if let Some(batch) = env_parse("LOG_BATCH_SIZE")? {
        config.log_batch_size = batch;
    }
    config.relay_adapt_address = env_parse("RELAY_ADAPT_ADDRESS")?.or(config.relay_adapt_address);
    config.wrapped_native_token = env_parse("WRAPPED_NATIVE_TOKEN")?.or(config.wrapped_native_token);
    Ok(config)
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => Ok(Some(
            value
                .parse()
                .with_context(|| format!("{name} is not valid: {value}"))?,
        )),
        Err(_) => Ok(None),
    }
}

fn connect() -> Result<AlloyLedger<impl alloy::providers::Provider>> {
    let rpc_url = std::env::var("RPC_URL").context("RPC_URL not set")?;
    let provider = ProviderBuilder::new().connect_http(rpc_url.parse()?);
    Ok(AlloyLedger::new(provider))
}

fn cache_path() -> PathBuf {
    std::env::var("CACHE_FILE")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("cache.json"))
}

fn load_cache(path: &Path) -> Result<Option<Cache<TransactionReceipt>>> {
    if !path.exists() {
        return Ok(None);
    }
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read cache file: {}", path.display()))?;
    let cache: Cache<TransactionReceipt> = serde_json::from_str(&json)?;
    info!(receipts = cache.receipts.len(), end_block = cache.end_block, "loaded cache");
    Ok(Some(cache))
}

/// Decode a 32-byte hex string (with or without 0x prefix) into [u8; 32].
fn decode_hex_32(s: &str) -> Result<[u8; 32]> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).context("invalid hex")?;
    ensure!(bytes.len() == 32, "expected 32 bytes, got {}", bytes.len());
    let mut arr = [0u8; 32];
    arr.copy_from_slice(&bytes);
    Ok(arr)
}
