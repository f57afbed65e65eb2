//! Data model and the service boundaries the locator consumes.
//!
//! The locator never talks to the network directly. It is handed a
//! [`ChainSource`] for height/hash resolution and, optionally, a
//! [`TransactionIndex`] for keyed lookups. Both are read-only.

use crate::{
    error::SourceError,
    key::canonical_hex,
};
use async_trait::async_trait;
use serde::{
    Deserialize,
    Serialize,
};

/// A block as returned by the upstream, reduced to what the locator needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    /// Transactions in block order.
    pub transactions: Vec<Transaction>,
}

/// A single transaction inside a block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Extrinsic index reported by the upstream. Usually the position in
    /// the block, but an indexer may report a sparse set.
    pub index: u32,
    pub hash: String,
    /// Encoded payload as hex.
    pub raw: String,
}

impl Block {
    /// Returns the position of the transaction whose hash equals `key`.
    ///
    /// `key` must already be canonical (lower-case, no prefix).
    pub fn position_of(&self, key: &str) -> Option<usize> {
        self.transactions
            .iter()
            .position(|tx| canonical_hex(&tx.hash) == key)
    }

    /// Builds the located-transaction record for the transaction at
    /// `position` in [`Block::transactions`].
    pub fn locate(&self, position: usize) -> Option<TransactionSearchResult> {
        let tx = self.transactions.get(position)?;
        Some(TransactionSearchResult {
            block_hash: self.hash.clone(),
            block_number: self.number,
            extrinsic_index: tx.index,
            hash: tx.hash.clone(),
            raw_transaction: tx.raw.clone(),
        })
    }

    /// All transactions of the block as located records, in block order.
    pub fn located_transactions(&self) -> Vec<TransactionSearchResult> {
        (0..self.transactions.len())
            .filter_map(|position| self.locate(position))
            .collect()
    }

    pub fn summary(&self) -> BlockSummary {
        BlockSummary {
            number: self.number,
            hash: self.hash.clone(),
            parent_hash: self.parent_hash.clone(),
            transaction_count: self.transactions.len(),
        }
    }
}

/// Exactly one located transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSearchResult {
    pub block_hash: String,
    pub block_number: u64,
    pub extrinsic_index: u32,
    pub hash: String,
    pub raw_transaction: String,
}

/// Row of a "latest blocks" page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockSummary {
    pub number: u64,
    pub hash: String,
    pub parent_hash: String,
    pub transaction_count: usize,
}

/// Offset object accepted by the indexer's transaction query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TxOffset {
    Hash(String),
    Identifier(String),
}

/// Height and hash resolution against the chain.
///
/// `Ok(None)` means the upstream answered but has nothing at that position
/// (pruned, not yet produced, unknown hash). Transport problems are `Err`.
#[async_trait]
pub trait ChainSource: Send + Sync {
    /// Height of the finalized head.
    async fn latest_height(&self) -> Result<u64, SourceError>;

    async fn block_by_height(&self, height: u64) -> Result<Option<Block>, SourceError>;

    async fn block_by_hash(&self, hash: &str) -> Result<Option<Block>, SourceError>;
}

/// Keyed transaction lookups served by an indexing service.
///
/// An empty result is "not found", not an error.
#[async_trait]
pub trait TransactionIndex: Send + Sync {
    async fn transactions_by_offset(
        &self,
        offset: &TxOffset,
    ) -> Result<Vec<TransactionSearchResult>, SourceError>;
}
