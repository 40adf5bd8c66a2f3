//! Interfaces of the external collaborators the account drives.
//!
//! Note decryption and ownership tracking, the commitment merkle tree, proof
//! generation, key derivation and note encryption all live behind these
//! traits. Implementations own their hashing and curve arithmetic.

use crate::abi::{ActionData, ShieldCiphertext, ShieldRequest, Transaction, UnshieldType};
use alloy::primitives::{Address, B256, U256};
use alloy::signers::local::PrivateKeySigner;
use alloy::signers::Signer;
use async_trait::async_trait;
use shielded_account_lib::{Note, OutputNote, TokenData};

/// Tracks which notes the account owns. Fed one receipt at a time.
#[async_trait]
pub trait NoteLedger<R: Send + Sync>: Send + Sync {
    async fn scan_receipt(&mut self, receipt: &R, contract: Address) -> anyhow::Result<()>;

    /// Unspent notes of `token` in the ledger's canonical order.
    fn unspent_notes(&self, token: &TokenData) -> Vec<Note>;

    /// Every note ever received. A note's position here is its
    /// nullifier-derivation index.
    fn all_notes(&self) -> Vec<Note>;

    fn balance(&self, token: &TokenData) -> u128;

    /// Tokens the account has received notes for.
    fn tokens(&self) -> Vec<TokenData>;

    /// Nullifier of the note at `position` in [`NoteLedger::all_notes`].
    fn nullifier(&self, position: usize) -> anyhow::Result<B256>;
}

/// Local mirror of the on-chain commitment tree.
#[async_trait]
pub trait MerkleTree<R: Send + Sync>: Send + Sync {
    async fn scan_receipt(&mut self, receipt: &R, contract: Address) -> anyhow::Result<()>;

    fn root(&self) -> B256;
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewingKeyPair {
    pub private_key: [u8; 32],
    pub public_key: [u8; 32],
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpendingKeyPair {
    pub private_key: [u8; 32],
    /// Baby Jubjub point (x, y)
    pub public_key: [U256; 2],
}

/// Key material the prover needs to authorize spends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SpendingKeys {
    pub spending: SpendingKeyPair,
    pub nullifying_key: U256,
}

#[async_trait]
pub trait KeyDerivation: Send + Sync {
    async fn master_public_key(&self) -> anyhow::Result<U256>;
    async fn viewing_key_pair(&self) -> anyhow::Result<ViewingKeyPair>;
    async fn spending_key_pair(&self) -> anyhow::Result<SpendingKeyPair>;
    async fn nullifying_key(&self) -> anyhow::Result<U256>;
}

/// Protocol parameters bound into a transaction proof.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransactParams {
    pub min_gas_price: u128,
    pub unshield: UnshieldType,
    pub chain_id: u64,
    pub adapt_contract: Address,
    pub adapt_params: B256,
}

/// Proves and assembles a private transaction.
#[async_trait]
pub trait ProofTransact<R: Send + Sync>: Send + Sync {
    async fn build_transaction(
        &self,
        tree: &dyn MerkleTree<R>,
        keys: &SpendingKeys,
        params: &TransactParams,
        inputs: &[Note],
        outputs: &[OutputNote],
    ) -> anyhow::Result<Transaction>;
}

/// Shield note encryption.
#[async_trait]
pub trait ShieldNoteEncryptor: Send + Sync {
    /// npk = poseidon(master_public_key, random)
    fn note_public_key(&self, master_public_key: U256, random: &[u8; 16]) -> anyhow::Result<B256>;

    /// Encrypt `random` for the holder of `receiver_viewing_public_key`.
    async fn encrypt(
        &self,
        random: &[u8; 16],
        shield_private_key: &[u8; 32],
        receiver_viewing_public_key: &[u8; 32],
    ) -> anyhow::Result<ShieldCiphertext>;

    /// Recover the random of a shield addressed to `viewing_private_key`.
    async fn decrypt_random(
        &self,
        ciphertext: &ShieldCiphertext,
        viewing_private_key: &[u8; 32],
    ) -> anyhow::Result<[u8; 16]>;
}

/// Message signer used to derive the shield private key.
#[async_trait]
pub trait ShieldKeySigner: Send + Sync {
    /// EIP-191 personal-sign signature bytes (r || s || v).
    async fn sign_message(&self, message: &[u8]) -> anyhow::Result<Vec<u8>>;
}

#[async_trait]
impl ShieldKeySigner for PrivateKeySigner {
    async fn sign_message(&self, message: &[u8]) -> anyhow::Result<Vec<u8>> {
        let signature = Signer::sign_message(self, message).await?;
        Ok(signature.as_bytes().to_vec())
    }
}

/// Sends signed transactions to the protocol contracts.
#[async_trait]
pub trait TransactionSubmitter: Send + Sync {
    async fn shield(&self, contract: Address, requests: Vec<ShieldRequest>) -> anyhow::Result<B256>;

    async fn transact(&self, contract: Address, transactions: Vec<Transaction>) -> anyhow::Result<B256>;

    async fn relay(
        &self,
        relay_adapt: Address,
        transactions: Vec<Transaction>,
        action: ActionData,
    ) -> anyhow::Result<B256>;
}
