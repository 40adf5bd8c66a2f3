#![cfg_attr(not(test), no_std)]
extern crate alloc;

pub mod address;
pub mod note;
pub mod relay;
pub mod selection;

pub use address::{decode_address, encode_address, AddressData, AddressError, Chain, ChainType};
pub use note::{ChangeOutput, Note, OutputNote, TokenData, TokenType, UnshieldOutput};
pub use relay::{unshield_fee, value_after_unshield_fee, BASIS_POINTS, UNSHIELD_FEE_BASIS_POINTS};
pub use selection::{compute_change, select_spendable_notes, Selection, SelectionError};

use tiny_keccak::{Hasher, Keccak};

// =============================================================================
//                          KECCAK256 HELPERS
// =============================================================================

/// Compute keccak256 hash. This matches Solidity's keccak256() opcode.
/// Note: tiny_keccak::Keccak is the original Keccak-256 (NOT SHA3-256).
pub fn keccak256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Keccak::v256();
    hasher.update(data);
    let mut output = [0u8; 32];
    hasher.finalize(&mut output);
    output
}

// =============================================================================
//                          SHIELD KEY DERIVATION
// =============================================================================

/// Message the account's signer signs to derive the shield private key.
pub const SHIELD_SIGNATURE_MESSAGE: &str = "RAILGUN_SHIELD";

/// Derive the shield private key from a signature over
/// [`SHIELD_SIGNATURE_MESSAGE`].
///
/// shield_private_key = keccak256(signature_bytes)
pub fn shield_private_key_from_signature(signature: &[u8]) -> [u8; 32] {
    keccak256(signature)
}
