//! Incremental chain synchronization.
//!
//! Logs are pulled in fixed-size block batches, reduced to the distinct set of
//! transaction hashes in first-seen order, and resolved to receipts. Receipts
//! are then fed to the note ledger and the merkle tree one at a time; both
//! must finish a receipt before the next one starts so that commitment
//! insertion order matches ownership tracking order.

use crate::collaborators::{MerkleTree, NoteLedger};
use crate::config::AccountConfig;
use crate::ledger::{LedgerQuery, ReceiptLike};
use crate::Result;
use alloy::primitives::{Address, B256};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Resumable sync cursor, persisted by the caller after every sync.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Cache<R> {
    /// Every receipt seen so far, deduplicated by transaction hash.
    pub receipts: Vec<R>,
    /// Last block covered.
    pub end_block: u64,
}

impl<R> Default for Cache<R> {
    fn default() -> Self {
        Cache {
            receipts: Vec::new(),
            end_block: 0,
        }
    }
}

impl<R: ReceiptLike> Cache<R> {
    /// Union of `self.receipts` and `new`, keeping the first occurrence of
    /// each transaction hash. `end_block` never moves backwards.
    pub fn merge(self, new: Vec<R>, end_block: u64) -> Cache<R> {
        let mut seen = HashSet::with_capacity(self.receipts.len() + new.len());
        let receipts = self
            .receipts
            .into_iter()
            .chain(new)
            .filter(|receipt| seen.insert(receipt.transaction_hash()))
            .collect();
        Cache {
            receipts,
            end_block: self.end_block.max(end_block),
        }
    }
}

/// Scanning collaborators installed by account initialization.
pub struct ScanState<R: Send + Sync> {
    pub notes: Box<dyn NoteLedger<R>>,
    pub tree: Box<dyn MerkleTree<R>>,
    /// Receipts already handed to both scanners in this session.
    scanned: HashSet<B256>,
}

impl<R: ReceiptLike + Send + Sync> ScanState<R> {
    pub fn new(notes: Box<dyn NoteLedger<R>>, tree: Box<dyn MerkleTree<R>>) -> Self {
        Self {
            notes,
            tree,
            scanned: HashSet::new(),
        }
    }

    /// Hand `receipt` to the note ledger, then the merkle tree.
    /// A receipt already scanned in this session is skipped.
    async fn scan(&mut self, receipt: &R, contract: Address) -> Result<bool> {
        let hash = receipt.transaction_hash();
        if self.scanned.contains(&hash) {
            return Ok(false);
        }
        self.notes.scan_receipt(receipt, contract).await?;
        self.tree.scan_receipt(receipt, contract).await?;
        self.scanned.insert(hash);
        Ok(true)
    }
}

#[derive(Clone, Debug)]
pub struct ChainSynchronizer {
    contract: Address,
    start_block: u64,
    batch_size: u64,
}

impl ChainSynchronizer {
    pub fn new(contract: Address, start_block: u64, batch_size: u64) -> Self {
        Self {
            contract,
            start_block,
            batch_size: batch_size.max(1),
        }
    }

    pub fn from_config(config: &AccountConfig) -> Self {
        Self::new(
            config.railgun_address,
            config.start_block,
            config.log_batch_size,
        )
    }

    pub fn contract(&self) -> Address {
        self.contract
    }

    /// Receipts of every transaction that emitted a log from the contract in
    /// `[start_block, end_block]`, in first-seen order.
    ///
    /// A hash whose receipt the ledger does not return is skipped.
    pub async fn fetch_receipts<L: LedgerQuery + ?Sized>(
        &self,
        ledger: &L,
        start_block: u64,
        end_block: u64,
    ) -> Result<Vec<L::Receipt>> {
        let mut logs = Vec::new();
        let mut from = start_block;
        while from <= end_block {
            let to = from.saturating_add(self.batch_size - 1).min(end_block);
            let batch = ledger.get_logs(self.contract, from, to).await?;
            debug!(from, to, logs = batch.len(), "fetched log batch");
            logs.extend(batch);
            if to == u64::MAX {
                break;
            }
            from = to + 1;
        }

        let mut seen = HashSet::new();
        let hashes: Vec<B256> = logs
            .iter()
            .filter_map(|log| log.transaction_hash)
            .filter(|hash| seen.insert(*hash))
            .collect();

        let mut receipts = Vec::with_capacity(hashes.len());
        for hash in hashes {
            match ledger.get_transaction_receipt(hash).await? {
                Some(receipt) => receipts.push(receipt),
                None => warn!(%hash, "no receipt for logged transaction, skipping"),
            }
        }
        Ok(receipts)
    }

    /// First block to fetch. A prior cache resumes at its `end_block`;
    /// otherwise the deployment block or `start_override`, whichever is later.
    pub fn resolve_start_block<R>(&self, prior: Option<&Cache<R>>, start_override: Option<u64>) -> u64 {
        match prior {
            Some(cache) => cache.end_block.max(self.start_block),
            None => start_override.unwrap_or(0).max(self.start_block),
        }
    }

    /// Fetch everything between the prior cursor and the current tip and
    /// merge it into the cache, without scanning.
    pub async fn update_cache<L: LedgerQuery + ?Sized>(
        &self,
        ledger: &L,
        prior: Option<Cache<L::Receipt>>,
        start_override: Option<u64>,
    ) -> Result<Cache<L::Receipt>> {
        let start_block = self.resolve_start_block(prior.as_ref(), start_override);
        let tip = ledger.get_block_number().await?;

        let new_receipts = self.fetch_receipts(ledger, start_block, tip).await?;
        debug!(start_block, tip, receipts = new_receipts.len(), "fetched receipts");

        Ok(prior.unwrap_or_default().merge(new_receipts, tip))
    }

    /// Hand each receipt to `state` in order and return how many were new.
    ///
    /// On error the note ledger may hold a receipt the tree has not seen, so
    /// `state` must be discarded rather than scanned again.
    pub async fn scan_receipts<R: ReceiptLike + Send + Sync>(
        &self,
        state: &mut ScanState<R>,
        receipts: &[R],
    ) -> Result<usize> {
        let mut scanned = 0usize;
        for receipt in receipts {
            if state.scan(receipt, self.contract).await? {
                scanned += 1;
            }
        }
        Ok(scanned)
    }

    /// Pull everything since the prior cursor, scan it, and return the merged cache.
    pub async fn sync<L: LedgerQuery + ?Sized>(
        &self,
        ledger: &L,
        state: &mut ScanState<L::Receipt>,
        prior: Option<Cache<L::Receipt>>,
        start_override: Option<u64>,
    ) -> Result<Cache<L::Receipt>> {
        let cache = self.update_cache(ledger, prior, start_override).await?;
        let scanned = self.scan_receipts(state, &cache.receipts).await?;

        info!(
            receipts = cache.receipts.len(),
            scanned,
            end_block = cache.end_block,
            "sync complete"
        );
        Ok(cache)
    }
}
