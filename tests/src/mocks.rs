//! In-memory collaborators that record how the client drives them.

use alloy::primitives::{address, Address, Bytes, B256, U256};
use alloy::rpc::types::Log;
use anyhow::{anyhow, bail};
use async_trait::async_trait;
use shielded_account_client::abi::{self, ActionData, ShieldCiphertext, ShieldRequest, Transaction};
use shielded_account_client::collaborators::{
    KeyDerivation, MerkleTree, NoteLedger, ProofTransact, ShieldKeySigner, ShieldNoteEncryptor,
    SpendingKeyPair, SpendingKeys, TransactParams, TransactionSubmitter, ViewingKeyPair,
};
use shielded_account_client::{AccountConfig, LedgerQuery, ReceiptLike, ShieldedAccount};
use shielded_account_lib::{keccak256, Note, OutputNote, TokenData};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

pub const RAILGUN: Address = address!("00000000000000000000000000000000000000a1");
pub const RELAY_ADAPT: Address = address!("00000000000000000000000000000000000000a2");
pub const WETH: Address = address!("00000000000000000000000000000000000000e1");
pub const USDC: Address = address!("00000000000000000000000000000000000000e2");
pub const RECEIVER: Address = address!("00000000000000000000000000000000000000b0");

pub const MASTER_PUBLIC_KEY: u64 = 0x1234_5678;
pub const VIEWING_PRIVATE_KEY: [u8; 32] = [0x07; 32];
pub const VIEWING_PUBLIC_KEY: [u8; 32] = [0x08; 32];
pub const NULLIFYING_KEY: u64 = 42;

/// Scan calls in the order they happened: ("notes" | "tree", tx hash).
pub type Events = Arc<Mutex<Vec<(&'static str, B256)>>>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MockReceipt {
    pub hash: B256,
}

impl ReceiptLike for MockReceipt {
    fn transaction_hash(&self) -> B256 {
        self.hash
    }
}

pub fn tx_hash(byte: u8) -> B256 {
    B256::repeat_byte(byte)
}

pub fn hashes(receipts: &[MockReceipt]) -> Vec<B256> {
    receipts.iter().map(|r| r.hash).collect()
}

// =============================================================================
//                                LEDGER QUERY
// =============================================================================

#[derive(Default)]
pub struct MockLedger {
    pub tip: u64,
    /// (block, tx hash) in raw emission order
    pub logs: Vec<(u64, B256)>,
    pub receipts: HashMap<B256, MockReceipt>,
    pub adapt_params: B256,
    /// Raw `eth_call` return data, replacing the encoded `adapt_params`.
    pub call_output: Option<Bytes>,
    pub fail_block_number: bool,
    pub log_requests: Mutex<Vec<(u64, u64)>>,
    pub calls: Mutex<Vec<(Address, Bytes)>>,
}

impl MockLedger {
    pub fn new(tip: u64) -> Self {
        Self {
            tip,
            adapt_params: B256::repeat_byte(0xad),
            ..Default::default()
        }
    }

    pub fn emit(&mut self, block: u64, byte: u8) {
        let hash = tx_hash(byte);
        self.logs.push((block, hash));
        self.receipts.insert(hash, MockReceipt { hash });
    }

    pub fn emit_without_receipt(&mut self, block: u64, byte: u8) {
        self.logs.push((block, tx_hash(byte)));
    }

    pub fn log_requests(&self) -> Vec<(u64, u64)> {
        self.log_requests.lock().unwrap().clone()
    }

    pub fn calls(&self) -> Vec<(Address, Bytes)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl LedgerQuery for MockLedger {
    type Receipt = MockReceipt;

    async fn get_logs(&self, _address: Address, from_block: u64, to_block: u64) -> anyhow::Result<Vec<Log>> {
        self.log_requests.lock().unwrap().push((from_block, to_block));
        Ok(self
            .logs
            .iter()
            .filter(|(block, _)| (from_block..=to_block).contains(block))
            .map(|(block, hash)| Log {
                block_number: Some(*block),
                transaction_hash: Some(*hash),
                ..Default::default()
            })
            .collect())
    }

    async fn get_transaction_receipt(&self, hash: B256) -> anyhow::Result<Option<MockReceipt>> {
        Ok(self.receipts.get(&hash).cloned())
    }

    async fn get_block_number(&self) -> anyhow::Result<u64> {
        if self.fail_block_number {
            bail!("connection refused");
        }
        Ok(self.tip)
    }

    async fn call(&self, to: Address, data: Bytes) -> anyhow::Result<Bytes> {
        self.calls.lock().unwrap().push((to, data));
        match &self.call_output {
            Some(output) => Ok(output.clone()),
            None => Ok(Bytes::copy_from_slice(self.adapt_params.as_slice())),
        }
    }
}

// =============================================================================
//                          NOTE LEDGER / MERKLE TREE
// =============================================================================

pub fn note(value: u128, token: Address, tag: u8) -> Note {
    Note {
        npk: U256::from(tag),
        value,
        token: TokenData::erc20(token),
        random: [tag; 16],
        memo: String::new(),
    }
}

/// Nullifier the mock ledger derives for the note at `position`.
pub fn nullifier_at(position: usize) -> B256 {
    B256::from(U256::from(1_000 + position as u64))
}

pub struct MockNoteLedger {
    pub notes: Vec<Note>,
    pub events: Events,
}

#[async_trait]
impl NoteLedger<MockReceipt> for MockNoteLedger {
    async fn scan_receipt(&mut self, receipt: &MockReceipt, contract: Address) -> anyhow::Result<()> {
        assert_eq!(contract, RAILGUN);
        self.events.lock().unwrap().push(("notes", receipt.hash));
        Ok(())
    }

    fn unspent_notes(&self, token: &TokenData) -> Vec<Note> {
        self.notes.iter().filter(|n| &n.token == token).cloned().collect()
    }

    fn all_notes(&self) -> Vec<Note> {
        self.notes.clone()
    }

    fn balance(&self, token: &TokenData) -> u128 {
        self.unspent_notes(token).iter().map(|n| n.value).sum()
    }

    fn tokens(&self) -> Vec<TokenData> {
        let mut tokens: Vec<TokenData> = Vec::new();
        for note in &self.notes {
            if !tokens.contains(&note.token) {
                tokens.push(note.token.clone());
            }
        }
        tokens
    }

    fn nullifier(&self, position: usize) -> anyhow::Result<B256> {
        if position >= self.notes.len() {
            return Err(anyhow!("no note at position {position}"));
        }
        Ok(nullifier_at(position))
    }
}

pub const MERKLE_ROOT: B256 = B256::repeat_byte(0x5e);

pub struct MockTree {
    pub events: Events,
    /// Fail the next `scan_receipt` call.
    pub fail_next: bool,
}

#[async_trait]
impl MerkleTree<MockReceipt> for MockTree {
    async fn scan_receipt(&mut self, receipt: &MockReceipt, contract: Address) -> anyhow::Result<()> {
        assert_eq!(contract, RAILGUN);
        if std::mem::take(&mut self.fail_next) {
            return Err(anyhow!("tree storage unavailable"));
        }
        self.events.lock().unwrap().push(("tree", receipt.hash));
        Ok(())
    }

    fn root(&self) -> B256 {
        MERKLE_ROOT
    }
}

// =============================================================================
//                        KEYS / PROVER / ENCRYPTION
// =============================================================================

pub struct MockKeys;

#[async_trait]
impl KeyDerivation for MockKeys {
    async fn master_public_key(&self) -> anyhow::Result<U256> {
        Ok(U256::from(MASTER_PUBLIC_KEY))
    }

    async fn viewing_key_pair(&self) -> anyhow::Result<ViewingKeyPair> {
        Ok(ViewingKeyPair {
            private_key: VIEWING_PRIVATE_KEY,
            public_key: VIEWING_PUBLIC_KEY,
        })
    }

    async fn spending_key_pair(&self) -> anyhow::Result<SpendingKeyPair> {
        Ok(SpendingKeyPair {
            private_key: [0x09; 32],
            public_key: [U256::from(1), U256::from(2)],
        })
    }

    async fn nullifying_key(&self) -> anyhow::Result<U256> {
        Ok(U256::from(NULLIFYING_KEY))
    }
}

#[derive(Clone, Debug)]
pub struct ProverCall {
    pub merkle_root: B256,
    pub keys: SpendingKeys,
    pub params: TransactParams,
    pub inputs: Vec<Note>,
    pub outputs: Vec<OutputNote>,
}

#[derive(Clone, Default)]
pub struct MockProver {
    pub calls: Arc<Mutex<Vec<ProverCall>>>,
}

#[async_trait]
impl ProofTransact<MockReceipt> for MockProver {
    async fn build_transaction(
        &self,
        tree: &dyn MerkleTree<MockReceipt>,
        keys: &SpendingKeys,
        params: &TransactParams,
        inputs: &[Note],
        outputs: &[OutputNote],
    ) -> anyhow::Result<Transaction> {
        self.calls.lock().unwrap().push(ProverCall {
            merkle_root: tree.root(),
            keys: keys.clone(),
            params: params.clone(),
            inputs: inputs.to_vec(),
            outputs: outputs.to_vec(),
        });
        let mut transaction = abi::dummy_transaction(vec![B256::repeat_byte(0x01)]);
        transaction.merkleRoot = tree.root();
        transaction.boundParams.adaptContract = params.adapt_contract;
        transaction.boundParams.adaptParams = params.adapt_params;
        transaction.boundParams.chainID = params.chain_id;
        Ok(transaction)
    }
}

/// npk = keccak(mpk || random) stands in for the real hash.
pub fn mock_npk(master_public_key: U256, random: &[u8; 16]) -> B256 {
    let mut preimage = master_public_key.to_be_bytes::<32>().to_vec();
    preimage.extend_from_slice(random);
    B256::from(keccak256(&preimage))
}

pub struct MockEncryptor;

#[async_trait]
impl ShieldNoteEncryptor for MockEncryptor {
    fn note_public_key(&self, master_public_key: U256, random: &[u8; 16]) -> anyhow::Result<B256> {
        Ok(mock_npk(master_public_key, random))
    }

    async fn encrypt(
        &self,
        random: &[u8; 16],
        shield_private_key: &[u8; 32],
        receiver_viewing_public_key: &[u8; 32],
    ) -> anyhow::Result<ShieldCiphertext> {
        let mut bundle = [0u8; 32];
        bundle[..16].copy_from_slice(random);
        Ok(ShieldCiphertext {
            encryptedBundle: [
                B256::from(bundle),
                B256::from(*receiver_viewing_public_key),
                B256::ZERO,
            ],
            shieldKey: B256::from(*shield_private_key),
        })
    }

    async fn decrypt_random(
        &self,
        ciphertext: &ShieldCiphertext,
        viewing_private_key: &[u8; 32],
    ) -> anyhow::Result<[u8; 16]> {
        if *viewing_private_key != VIEWING_PRIVATE_KEY
            || ciphertext.encryptedBundle[1] != B256::from(VIEWING_PUBLIC_KEY)
        {
            bail!("ciphertext not addressed to this viewing key");
        }
        let mut random = [0u8; 16];
        random.copy_from_slice(&ciphertext.encryptedBundle[0][..16]);
        Ok(random)
    }
}

pub const SIGNATURE: [u8; 65] = [0x11; 65];

pub struct MockSigner;

#[async_trait]
impl ShieldKeySigner for MockSigner {
    async fn sign_message(&self, message: &[u8]) -> anyhow::Result<Vec<u8>> {
        assert_eq!(message, b"RAILGUN_SHIELD");
        Ok(SIGNATURE.to_vec())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum Submission {
    Shield(Address, Vec<ShieldRequest>),
    Transact(Address, Vec<Transaction>),
    Relay(Address, Vec<Transaction>, ActionData),
}

pub const SUBMITTED: B256 = B256::repeat_byte(0xee);

#[derive(Clone, Default)]
pub struct MockSubmitter {
    pub submissions: Arc<Mutex<Vec<Submission>>>,
}

#[async_trait]
impl TransactionSubmitter for MockSubmitter {
    async fn shield(&self, contract: Address, requests: Vec<ShieldRequest>) -> anyhow::Result<B256> {
        self.submissions
            .lock()
            .unwrap()
            .push(Submission::Shield(contract, requests));
        Ok(SUBMITTED)
    }

    async fn transact(&self, contract: Address, transactions: Vec<Transaction>) -> anyhow::Result<B256> {
        self.submissions
            .lock()
            .unwrap()
            .push(Submission::Transact(contract, transactions));
        Ok(SUBMITTED)
    }

    async fn relay(
        &self,
        relay_adapt: Address,
        transactions: Vec<Transaction>,
        action: ActionData,
    ) -> anyhow::Result<B256> {
        self.submissions
            .lock()
            .unwrap()
            .push(Submission::Relay(relay_adapt, transactions, action));
        Ok(SUBMITTED)
    }
}

// =============================================================================
//                                  HARNESS
// =============================================================================

pub fn test_config() -> AccountConfig {
    AccountConfig {
        railgun_address: RAILGUN,
        start_block: 1_000,
        chain_id: 11_155_111,
        relay_adapt_address: Some(RELAY_ADAPT),
        wrapped_native_token: Some(WETH),
        ..Default::default()
    }
}

pub struct Harness {
    pub account: ShieldedAccount<MockReceipt>,
    pub prover: MockProver,
    pub submitter: MockSubmitter,
    pub events: Events,
}

impl Harness {
    /// Account with every collaborator except a submitter, not yet initialized.
    pub fn new(config: AccountConfig) -> Self {
        let prover = MockProver::default();
        let account = ShieldedAccount::new(
            config,
            Arc::new(MockKeys),
            Arc::new(prover.clone()),
            Arc::new(MockEncryptor),
        )
        .with_shield_signer(Arc::new(MockSigner));
        Self {
            account,
            prover,
            submitter: MockSubmitter::default(),
            events: Events::default(),
        }
    }

    pub fn with_submitter(mut self) -> Self {
        self.account = self
            .account
            .with_submitter(Arc::new(self.submitter.clone()));
        self
    }

    pub async fn init(&self, notes: Vec<Note>) {
        self.init_with_tree(notes, false).await;
    }

    /// Like `init`, but the tree rejects the first receipt it is given.
    pub async fn init_with_failing_tree(&self, notes: Vec<Note>) {
        self.init_with_tree(notes, true).await;
    }

    async fn init_with_tree(&self, notes: Vec<Note>, fail_next: bool) {
        self.account
            .init(
                Box::new(MockNoteLedger {
                    notes,
                    events: self.events.clone(),
                }),
                Box::new(MockTree {
                    events: self.events.clone(),
                    fail_next,
                }),
            )
            .await;
    }

    pub fn events(&self) -> Vec<(&'static str, B256)> {
        self.events.lock().unwrap().clone()
    }

    pub fn prover_calls(&self) -> Vec<ProverCall> {
        self.prover.calls.lock().unwrap().clone()
    }

    pub fn submissions(&self) -> Vec<Submission> {
        self.submitter.submissions.lock().unwrap().clone()
    }
}
