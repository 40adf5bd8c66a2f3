use alloy::primitives::{address, Address};
use serde::{Deserialize, Serialize};
use shielded_account_lib::UNSHIELD_FEE_BASIS_POINTS;

/// Sepolia deployment of the protocol contract.
pub const SEPOLIA_RAILGUN_ADDRESS: Address = address!("942D5026b421cf2705363A525897576cFAdA5964");
/// Block the Sepolia contract was deployed at.
pub const SEPOLIA_START_BLOCK: u64 = 4_495_479;
pub const SEPOLIA_CHAIN_ID: u64 = 11_155_111;

/// Maximum block span per `eth_getLogs` request.
pub const DEFAULT_LOG_BATCH_SIZE: u64 = 500;

/// Static parameters of one protocol deployment.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AccountConfig {
    /// Protocol contract whose events are scanned and which receives shields.
    pub railgun_address: Address,
    /// Deployment block; syncing never starts before it.
    pub start_block: u64,
    pub chain_id: u64,
    /// Relay adapter used for native-asset unshields.
    pub relay_adapt_address: Option<Address>,
    /// Wrapped native token (e.g. WETH) the relay adapter unwraps.
    pub wrapped_native_token: Option<Address>,
    pub log_batch_size: u64,
    pub unshield_fee_basis_points: u128,
    /// `minGasLimit` placed in relay action data.
    pub relay_min_gas_limit: u64,
    pub min_gas_price: u128,
}

impl Default for AccountConfig {
    fn default() -> Self {
        AccountConfig {
            railgun_address: SEPOLIA_RAILGUN_ADDRESS,
            start_block: SEPOLIA_START_BLOCK,
            chain_id: SEPOLIA_CHAIN_ID,
            relay_adapt_address: None,
            wrapped_native_token: None,
            log_batch_size: DEFAULT_LOG_BATCH_SIZE,
            unshield_fee_basis_points: UNSHIELD_FEE_BASIS_POINTS,
            relay_min_gas_limit: 0,
            min_gas_price: 0,
        }
    }
}
