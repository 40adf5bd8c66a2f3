//! Ledger query interface and its JSON-RPC implementation.

use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::Provider;
use alloy::rpc::types::{Filter, Log, TransactionInput, TransactionReceipt, TransactionRequest};
use async_trait::async_trait;

/// Anything the synchronizer can deduplicate by transaction hash.
pub trait ReceiptLike {
    fn transaction_hash(&self) -> B256;
}

impl ReceiptLike for TransactionReceipt {
    fn transaction_hash(&self) -> B256 {
        self.transaction_hash
    }
}

/// Read-only view of the ledger. Retry and backoff are the transport's job.
#[async_trait]
pub trait LedgerQuery: Send + Sync {
    type Receipt: ReceiptLike + Clone + Send + Sync;

    /// Event logs emitted by `address` in `[from_block, to_block]`.
    async fn get_logs(&self, address: Address, from_block: u64, to_block: u64) -> anyhow::Result<Vec<Log>>;

    async fn get_transaction_receipt(&self, hash: B256) -> anyhow::Result<Option<Self::Receipt>>;

    async fn get_block_number(&self) -> anyhow::Result<u64>;

    /// `eth_call` against the latest block.
    async fn call(&self, to: Address, data: Bytes) -> anyhow::Result<Bytes>;
}

/// [`LedgerQuery`] over any alloy provider.
#[derive(Clone, Debug)]
pub struct AlloyLedger<P> {
    provider: P,
}

impl<P> AlloyLedger<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: Provider + Send + Sync> LedgerQuery for AlloyLedger<P> {
    type Receipt = TransactionReceipt;

    async fn get_logs(&self, address: Address, from_block: u64, to_block: u64) -> anyhow::Result<Vec<Log>> {
        let filter = Filter::new()
            .address(address)
            .from_block(from_block)
            .to_block(to_block);
        Ok(self.provider.get_logs(&filter).await?)
    }

    async fn get_transaction_receipt(&self, hash: B256) -> anyhow::Result<Option<TransactionReceipt>> {
        Ok(self.provider.get_transaction_receipt(hash).await?)
    }

    async fn get_block_number(&self) -> anyhow::Result<u64> {
        Ok(self.provider.get_block_number().await?)
    }

    async fn call(&self, to: Address, data: Bytes) -> anyhow::Result<Bytes> {
        let request = TransactionRequest::default()
            .to(to)
            .input(TransactionInput::new(data));
        Ok(self.provider.call(request).await?)
    }
}
