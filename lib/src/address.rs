//! `0zk` account address codec.
//!
//! Payload layout (73 bytes):
//!   version (1) || master_public_key (32, BE) || network_id (8) || viewing_public_key (32)
//!
//! The network id is `chain_type (1) || chain_id (7, BE)`, or all ones when the
//! address is valid on every chain, XORed positionally with the ASCII bytes of
//! `"railgun"`. The payload is bech32m encoded under the `0zk` prefix.

use alloc::string::{String, ToString};
use alloc::vec::Vec;
use alloy_primitives::U256;
use bech32::primitives::decode::{CheckedHrpstring, CheckedHrpstringError};
use bech32::{Checksum, Hrp};
use serde::{Deserialize, Serialize};

/// Human-readable prefix of every account address.
pub const ADDRESS_PREFIX: &str = "0zk";
/// Longest encoded address accepted or produced.
pub const ADDRESS_LENGTH_LIMIT: usize = 127;
/// The only supported address version.
pub const ADDRESS_VERSION: u8 = 1;
/// Network id meaning "no chain restriction".
pub const ALL_CHAINS_NETWORK_ID: [u8; 8] = [0xff; 8];
/// Largest chain id representable in the 7-byte chain id field.
pub const MAX_CHAIN_ID: u64 = (1 << 56) - 1;

const PAYLOAD_LENGTH: usize = 73;
const NETWORK_ID_XOR_KEY: &[u8; 7] = b"railgun";

/// Bech32m with the code length raised to fit a 73-byte payload.
#[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Bech32mLong {}

impl Checksum for Bech32mLong {
    type MidstateRepr = u32;
    const CODE_LENGTH: usize = ADDRESS_LENGTH_LIMIT;
    const CHECKSUM_LENGTH: usize = 6;
    const GENERATOR_SH: [u32; 5] = [0x3b6a57b2, 0x26508e6d, 0x1ea119fa, 0x3d4233dd, 0x2a1462b3];
    const TARGET_RESIDUE: u32 = 0x2bc830a3;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("no address to decode")]
    Empty,
    #[error("invalid checksum")]
    InvalidChecksum,
    #[error("failed to decode bech32 address: {0}")]
    Malformed(String),
    #[error("invalid address prefix: {0}")]
    InvalidPrefix(String),
    #[error("unsupported address version: {0}")]
    UnsupportedVersion(u8),
    #[error("chain id {0} does not fit in 7 bytes")]
    ChainIdOutOfRange(u64),
    #[error("encoded address is {0} characters, limit is 127")]
    TooLong(usize),
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ChainType {
    Evm = 0,
}

impl TryFrom<u8> for ChainType {
    type Error = AddressError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(ChainType::Evm),
            other => Err(AddressError::Malformed(alloc::format!(
                "unknown chain type {other}"
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Chain {
    pub chain_type: ChainType,
    pub id: u64,
}

impl Chain {
    pub fn evm(id: u64) -> Self {
        Chain {
            chain_type: ChainType::Evm,
            id,
        }
    }
}

/// Decoded contents of an account address.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AddressData {
    pub master_public_key: U256,
    pub viewing_public_key: [u8; 32],
    /// `None` means the address is valid on all chains.
    pub chain: Option<Chain>,
    pub version: u8,
}

fn chain_to_network_id(chain: Option<&Chain>) -> Result<[u8; 8], AddressError> {
    let Some(chain) = chain else {
        return Ok(ALL_CHAINS_NETWORK_ID);
    };
    if chain.id > MAX_CHAIN_ID {
        return Err(AddressError::ChainIdOutOfRange(chain.id));
    }
    let mut network_id = chain.id.to_be_bytes();
    network_id[0] = chain.chain_type as u8;
    Ok(network_id)
}

fn network_id_to_chain(network_id: [u8; 8]) -> Result<Option<Chain>, AddressError> {
    if network_id == ALL_CHAINS_NETWORK_ID {
        return Ok(None);
    }
    let chain_type = ChainType::try_from(network_id[0])?;
    let mut id_bytes = network_id;
    id_bytes[0] = 0;
    Ok(Some(Chain {
        chain_type,
        id: u64::from_be_bytes(id_bytes),
    }))
}

/// XOR the first 7 bytes with "railgun"; the 8th byte is left untouched.
/// Applying it twice is the identity.
fn xor_network_id(mut network_id: [u8; 8]) -> [u8; 8] {
    for (byte, key) in network_id.iter_mut().zip(NETWORK_ID_XOR_KEY) {
        *byte ^= key;
    }
    network_id
}

fn prefix() -> Result<Hrp, AddressError> {
    Hrp::parse(ADDRESS_PREFIX).map_err(|e| AddressError::Malformed(e.to_string()))
}

/// Bech32m-encode an address.
pub fn encode_address(data: &AddressData) -> Result<String, AddressError> {
    if data.version != ADDRESS_VERSION {
        return Err(AddressError::UnsupportedVersion(data.version));
    }
    let network_id = xor_network_id(chain_to_network_id(data.chain.as_ref())?);

    let mut payload = Vec::with_capacity(PAYLOAD_LENGTH);
    payload.push(ADDRESS_VERSION);
    payload.extend_from_slice(&data.master_public_key.to_be_bytes::<32>());
    payload.extend_from_slice(&network_id);
    payload.extend_from_slice(&data.viewing_public_key);

    let address = bech32::encode::<Bech32mLong>(prefix()?, &payload)
        .map_err(|e| AddressError::Malformed(e.to_string()))?;
    if address.len() > ADDRESS_LENGTH_LIMIT {
        return Err(AddressError::TooLong(address.len()));
    }
    Ok(address)
}

/// Decode an address produced by [`encode_address`].
pub fn decode_address(address: &str) -> Result<AddressData, AddressError> {
    let address = address.trim();
    if address.is_empty() {
        return Err(AddressError::Empty);
    }
    if address.len() > ADDRESS_LENGTH_LIMIT {
        return Err(AddressError::Malformed(alloc::format!(
            "address is {} characters, limit is {ADDRESS_LENGTH_LIMIT}",
            address.len()
        )));
    }

    let checked = CheckedHrpstring::new::<Bech32mLong>(address).map_err(|e| match e {
        CheckedHrpstringError::Checksum(_) => AddressError::InvalidChecksum,
        other => AddressError::Malformed(other.to_string()),
    })?;

    let hrp = checked.hrp().as_str().to_ascii_lowercase();
    if hrp != ADDRESS_PREFIX {
        return Err(AddressError::InvalidPrefix(hrp));
    }

    let payload: Vec<u8> = checked.byte_iter().collect();
    if payload.len() != PAYLOAD_LENGTH {
        return Err(AddressError::Malformed(alloc::format!(
            "expected {PAYLOAD_LENGTH} payload bytes, got {}",
            payload.len()
        )));
    }

    let version = payload[0];
    if version != ADDRESS_VERSION {
        return Err(AddressError::UnsupportedVersion(version));
    }

    let master_public_key = U256::from_be_slice(&payload[1..33]);
    let mut network_id = [0u8; 8];
    network_id.copy_from_slice(&payload[33..41]);
    let chain = network_id_to_chain(xor_network_id(network_id))?;
    let mut viewing_public_key = [0u8; 32];
    viewing_public_key.copy_from_slice(&payload[41..73]);

    Ok(AddressData {
        master_public_key,
        viewing_public_key,
        chain,
        version,
    })
}
