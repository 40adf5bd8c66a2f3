//! The shielded account facade.
//!
//! Key material and collaborators are read-only after construction. The
//! scanning state (note ledger and merkle tree) sits behind one async mutex,
//! so sync and request building against the same account never interleave.

use crate::abi::{ActionData, ShieldRequest, Transaction};
use crate::builder::{NativeUnshieldRequest, TransactionRequestBuilder};
use crate::collaborators::{
    KeyDerivation, MerkleTree, NoteLedger, ProofTransact, ShieldKeySigner, ShieldNoteEncryptor,
    TransactionSubmitter,
};
use crate::config::AccountConfig;
use crate::ledger::{LedgerQuery, ReceiptLike};
use crate::sync::{Cache, ChainSynchronizer, ScanState};
use crate::{Error, Result};
use alloy::primitives::{Address, B256};
use shielded_account_lib::address::ADDRESS_VERSION;
use shielded_account_lib::{encode_address, AddressData, Note, TokenData};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

pub struct ShieldedAccount<R: Send + Sync> {
    config: AccountConfig,
    keys: Arc<dyn KeyDerivation>,
    prover: Arc<dyn ProofTransact<R>>,
    encryptor: Arc<dyn ShieldNoteEncryptor>,
    shield_signer: Option<Arc<dyn ShieldKeySigner>>,
    submitter: Option<Arc<dyn TransactionSubmitter>>,
    state: Mutex<Option<ScanState<R>>>,
}

impl<R: ReceiptLike + Send + Sync> ShieldedAccount<R> {
    pub fn new(
        config: AccountConfig,
        keys: Arc<dyn KeyDerivation>,
        prover: Arc<dyn ProofTransact<R>>,
        encryptor: Arc<dyn ShieldNoteEncryptor>,
    ) -> Self {
        Self {
            config,
            keys,
            prover,
            encryptor,
            shield_signer: None,
            submitter: None,
            state: Mutex::new(None),
        }
    }

    pub fn with_shield_signer(mut self, signer: Arc<dyn ShieldKeySigner>) -> Self {
        self.shield_signer = Some(signer);
        self
    }

    pub fn with_submitter(mut self, submitter: Arc<dyn TransactionSubmitter>) -> Self {
        self.submitter = Some(submitter);
        self
    }

    /// Replace (or clear) the signer used to derive the shield key.
    pub fn set_shield_signer(&mut self, signer: Option<Arc<dyn ShieldKeySigner>>) {
        self.shield_signer = signer;
    }

    pub fn config(&self) -> &AccountConfig {
        &self.config
    }

    /// One-time setup. Installs the scanning collaborators; calling it again
    /// replaces them and starts a fresh scan session.
    pub async fn init(&self, notes: Box<dyn NoteLedger<R>>, tree: Box<dyn MerkleTree<R>>) {
        *self.state.lock().await = Some(ScanState::new(notes, tree));
        info!("account initialized");
    }

    pub async fn is_initialized(&self) -> bool {
        self.state.lock().await.is_some()
    }

    /// Scan everything since `prior` and return the cursor to persist.
    ///
    /// A failed scan ends the session: later calls return `NotInitialized`
    /// until `init` installs fresh scanners.
    pub async fn sync<L>(
        &self,
        ledger: &L,
        prior: Option<Cache<R>>,
        start_override: Option<u64>,
    ) -> Result<Cache<R>>
    where
        L: LedgerQuery<Receipt = R> + ?Sized,
    {
        let mut guard = self.state.lock().await;
        let state = guard.as_mut().ok_or(Error::NotInitialized)?;
        let synchronizer = ChainSynchronizer::from_config(&self.config);
        let cache = synchronizer.update_cache(ledger, prior, start_override).await?;

        let scanned = synchronizer.scan_receipts(state, &cache.receipts).await;
        match scanned {
            Ok(scanned) => {
                info!(
                    receipts = cache.receipts.len(),
                    scanned,
                    end_block = cache.end_block,
                    "sync complete"
                );
                Ok(cache)
            }
            Err(err) => {
                // The note ledger and tree may now disagree; force a fresh init.
                *guard = None;
                warn!(%err, "scan failed, account needs init");
                Err(err)
            }
        }
    }

    /// The account's `0zk` address, valid on all chains.
    pub async fn address(&self) -> Result<String> {
        let data = AddressData {
            master_public_key: self.keys.master_public_key().await?,
            viewing_public_key: self.keys.viewing_key_pair().await?.public_key,
            chain: None,
            version: ADDRESS_VERSION,
        };
        Ok(encode_address(&data)?)
    }

    pub async fn shield_private_key(&self) -> Result<[u8; 32]> {
        self.builder().shield_private_key().await
    }

    /// Recover the random of a shield request addressed to this account.
    pub async fn decrypt_shield_note_randomness(&self, request: &ShieldRequest) -> Result<[u8; 16]> {
        let viewing = self.keys.viewing_key_pair().await?;
        Ok(self
            .encryptor
            .decrypt_random(&request.ciphertext, &viewing.private_key)
            .await?)
    }

    pub fn erc20_token_data(token_address: Address) -> TokenData {
        TokenData::erc20(token_address)
    }

    pub async fn balance(&self, token: &TokenData) -> Result<u128> {
        self.read(|state| state.notes.balance(token)).await
    }

    pub async fn all_notes(&self) -> Result<Vec<Note>> {
        self.read(|state| state.notes.all_notes()).await
    }

    pub async fn unspent_notes(&self, token: &TokenData) -> Result<Vec<Note>> {
        self.read(|state| state.notes.unspent_notes(token)).await
    }

    pub async fn tokens(&self) -> Result<Vec<TokenData>> {
        self.read(|state| state.notes.tokens()).await
    }

    pub async fn merkle_root(&self) -> Result<B256> {
        self.read(|state| state.tree.root()).await
    }

    pub async fn build_shield_request(&self, token_address: Address, value: u128) -> Result<ShieldRequest> {
        self.builder().build_shield_request(token_address, value).await
    }

    /// `min_gas_price` falls back to the configured default.
    pub async fn build_unshield_request(
        &self,
        token: &TokenData,
        value: u128,
        receiver: Address,
        min_gas_price: Option<u128>,
    ) -> Result<Transaction> {
        let guard = self.state.lock().await;
        let state = guard.as_ref().ok_or(Error::NotInitialized)?;
        self.builder()
            .build_unshield_request(
                state,
                token,
                value,
                receiver,
                min_gas_price.unwrap_or(self.config.min_gas_price),
            )
            .await
    }

    pub async fn build_native_unshield_request<L>(
        &self,
        ledger: &L,
        value: u128,
        receiver: Address,
        min_gas_price: Option<u128>,
    ) -> Result<NativeUnshieldRequest>
    where
        L: LedgerQuery<Receipt = R> + ?Sized,
    {
        let guard = self.state.lock().await;
        let state = guard.as_ref().ok_or(Error::NotInitialized)?;
        self.builder()
            .build_native_unshield_request(
                state,
                ledger,
                value,
                receiver,
                min_gas_price.unwrap_or(self.config.min_gas_price),
            )
            .await
    }

    pub async fn submit_shield(&self, requests: Vec<ShieldRequest>) -> Result<B256> {
        let submitter = self.submitter()?;
        Ok(submitter.shield(self.config.railgun_address, requests).await?)
    }

    pub async fn submit_transact(&self, transactions: Vec<Transaction>) -> Result<B256> {
        let submitter = self.submitter()?;
        Ok(submitter.transact(self.config.railgun_address, transactions).await?)
    }

    pub async fn submit_relay(&self, transactions: Vec<Transaction>, action_data: ActionData) -> Result<B256> {
        let submitter = self.submitter()?;
        let relay_adapt = self
            .config
            .relay_adapt_address
            .ok_or_else(|| Error::Config("relay adapt address not set".into()))?;
        Ok(submitter.relay(relay_adapt, transactions, action_data).await?)
    }

    /// Build and submit a self-shield.
    pub async fn shield(&self, token_address: Address, value: u128) -> Result<B256> {
        self.submitter()?;
        let request = self.build_shield_request(token_address, value).await?;
        self.submit_shield(vec![request]).await
    }

    /// Build and submit a direct unshield.
    pub async fn unshield(
        &self,
        token: &TokenData,
        value: u128,
        receiver: Address,
        min_gas_price: Option<u128>,
    ) -> Result<B256> {
        self.submitter()?;
        let transaction = self
            .build_unshield_request(token, value, receiver, min_gas_price)
            .await?;
        self.submit_transact(vec![transaction]).await
    }

    /// Build and submit a relayed native-asset unshield.
    pub async fn unshield_native<L>(
        &self,
        ledger: &L,
        value: u128,
        receiver: Address,
        min_gas_price: Option<u128>,
    ) -> Result<B256>
    where
        L: LedgerQuery<Receipt = R> + ?Sized,
    {
        self.submitter()?;
        let request = self
            .build_native_unshield_request(ledger, value, receiver, min_gas_price)
            .await?;
        self.submit_relay(vec![request.transaction], request.action_data)
            .await
    }

    fn builder(&self) -> TransactionRequestBuilder<'_, R> {
        TransactionRequestBuilder {
            config: &self.config,
            keys: self.keys.as_ref(),
            prover: self.prover.as_ref(),
            encryptor: self.encryptor.as_ref(),
            shield_signer: self.shield_signer.as_deref(),
        }
    }

    fn submitter(&self) -> Result<&dyn TransactionSubmitter> {
        self.submitter
            .as_deref()
            .ok_or(Error::TransactionSignerNotSet)
    }

    async fn read<T>(&self, f: impl FnOnce(&ScanState<R>) -> T) -> Result<T> {
        let guard = self.state.lock().await;
        let state = guard.as_ref().ok_or(Error::NotInitialized)?;
        Ok(f(state))
    }
}
