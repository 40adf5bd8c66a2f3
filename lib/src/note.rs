use alloc::string::String;
use alloy_primitives::{Address, U256};
use serde::{Deserialize, Serialize};

// =============================================================================
//                              TOKEN DATA
// =============================================================================

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TokenType {
    #[default]
    Erc20 = 0,
    Erc721 = 1,
    Erc1155 = 2,
}

/// Identifies the asset a note carries. Two tokens are the same iff all
/// three fields match.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TokenData {
    pub token_type: TokenType,
    pub token_address: Address,
    pub token_sub_id: U256,
}

impl TokenData {
    /// ERC20 token data (sub id 0).
    pub fn erc20(token_address: Address) -> Self {
        TokenData {
            token_type: TokenType::Erc20,
            token_address,
            token_sub_id: U256::ZERO,
        }
    }
}

// =============================================================================
//                                 NOTES
// =============================================================================

/// A private note owned by the account, as tracked by the note ledger.
///
/// The core only reads `value`; everything else is carried through to the
/// proof collaborator untouched.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Note {
    /// Note public key: poseidon(master_public_key, random)
    pub npk: U256,
    pub value: u128,
    pub token: TokenData,
    pub random: [u8; 16],
    #[serde(default)]
    pub memo: String,
}

/// Private change output returned to the account's own keys.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeOutput {
    pub master_public_key: U256,
    pub viewing_public_key: [u8; 32],
    pub value: u128,
    pub token: TokenData,
    pub random: [u8; 16],
}

/// Public output paying `value` of `token` to `to`.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct UnshieldOutput {
    pub to: Address,
    pub value: u128,
    pub token: TokenData,
}

/// One output of a private transaction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutputNote {
    Change(ChangeOutput),
    Unshield(UnshieldOutput),
}

impl OutputNote {
    pub fn value(&self) -> u128 {
        match self {
            OutputNote::Change(change) => change.value,
            OutputNote::Unshield(unshield) => unshield.value,
        }
    }
}
