//! Transaction submission through a wallet-backed alloy provider.

use crate::abi::{ActionData, RailgunSmartWallet, RelayAdapt, ShieldRequest, Transaction};
use crate::collaborators::TransactionSubmitter;
use alloy::primitives::{Address, B256};
use alloy::providers::Provider;
use async_trait::async_trait;
use tracing::info;

/// Sends protocol calls with the provider's wallet and waits for inclusion.
#[derive(Clone, Debug)]
pub struct AlloySubmitter<P> {
    provider: P,
}

impl<P> AlloySubmitter<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: Provider + Send + Sync> TransactionSubmitter for AlloySubmitter<P> {
    async fn shield(&self, contract: Address, requests: Vec<ShieldRequest>) -> anyhow::Result<B256> {
        let wallet = RailgunSmartWallet::new(contract, &self.provider);
        let tx = wallet.shield(requests).send().await?;
        let receipt = tx.get_receipt().await?;
        info!(tx = %receipt.transaction_hash, block = ?receipt.block_number, "shield included");
        Ok(receipt.transaction_hash)
    }

    async fn transact(&self, contract: Address, transactions: Vec<Transaction>) -> anyhow::Result<B256> {
        let wallet = RailgunSmartWallet::new(contract, &self.provider);
        let tx = wallet.transact(transactions).send().await?;
        let receipt = tx.get_receipt().await?;
        info!(tx = %receipt.transaction_hash, block = ?receipt.block_number, "transact included");
        Ok(receipt.transaction_hash)
    }

    async fn relay(
        &self,
        relay_adapt: Address,
        transactions: Vec<Transaction>,
        action: ActionData,
    ) -> anyhow::Result<B256> {
        let adapter = RelayAdapt::new(relay_adapt, &self.provider);
        let tx = adapter.relay(transactions, action).send().await?;
        let receipt = tx.get_receipt().await?;
        info!(tx = %receipt.transaction_hash, block = ?receipt.block_number, "relay included");
        Ok(receipt.transaction_hash)
    }
}
