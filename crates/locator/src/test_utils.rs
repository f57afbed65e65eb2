//! In-memory chain and index fixtures.
//!
//! [`MockChain`] records every height it is asked for so tests can assert on
//! traversal order and visit counts, and can be told to report heights as
//! missing or failing.
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::unwrap_used)]

use crate::{
    error::SourceError,
    key::canonical_hex,
    source::{
        Block,
        ChainSource,
        Transaction,
        TransactionIndex,
        TransactionSearchResult,
        TxOffset,
    },
};
use async_trait::async_trait;
use std::{
    collections::{
        BTreeMap,
        HashMap,
        HashSet,
    },
    sync::{
        Mutex,
        atomic::{
            AtomicUsize,
            Ordering,
        },
    },
};

/// Deterministic block hash for a height.
pub fn block_hash(height: u64) -> String {
    format!("0x{height:064x}")
}

/// Deterministic 64 character transaction hash for a seed.
pub fn tx_hash(seed: u64) -> String {
    format!("{:064x}", u128::from(seed) | (0xabcd << 64))
}

#[derive(Debug, Default)]
pub struct MockChain {
    latest: u64,
    blocks: BTreeMap<u64, Block>,
    missing: HashSet<u64>,
    failing: HashSet<u64>,
    head_error: Option<SourceError>,
    visits: Mutex<Vec<u64>>,
}

impl MockChain {
    /// A chain of empty blocks `0..=latest`.
    pub fn with_height(latest: u64) -> Self {
        let blocks = (0..=latest)
            .map(|height| {
                let block = Block {
                    number: height,
                    hash: block_hash(height),
                    parent_hash: block_hash(height.saturating_sub(1)),
                    transactions: Vec::new(),
                };
                (height, block)
            })
            .collect();
        Self {
            latest,
            blocks,
            ..Self::default()
        }
    }

    /// Appends a transaction with an empty payload.
    pub fn with_transaction(self, height: u64, hash: impl Into<String>) -> Self {
        self.with_raw_transaction(height, hash, "")
    }

    pub fn with_raw_transaction(
        mut self,
        height: u64,
        hash: impl Into<String>,
        raw: impl Into<String>,
    ) -> Self {
        let block = self.blocks.get_mut(&height).unwrap();
        let index = u32::try_from(block.transactions.len()).unwrap_or(u32::MAX);
        block.transactions.push(Transaction {
            index,
            hash: hash.into(),
            raw: raw.into(),
        });
        self
    }

    /// Pads `height` with `count` unrelated transactions.
    pub fn with_filler(mut self, height: u64, count: usize) -> Self {
        for i in 0..count {
            let seed = height * 1_000 + i as u64;
            self = self.with_transaction(height, tx_hash(seed));
        }
        self
    }

    /// The height answers "not present".
    pub fn with_missing(mut self, height: u64) -> Self {
        self.missing.insert(height);
        self
    }

    /// The height fails with a transport error.
    pub fn with_failing(mut self, height: u64) -> Self {
        self.failing.insert(height);
        self
    }

    /// Head resolution fails with `error`.
    pub fn with_head_error(mut self, error: SourceError) -> Self {
        self.head_error = Some(error);
        self
    }

    /// Heights requested through `block_by_height`, in request order.
    pub fn visits(&self) -> Vec<u64> {
        self.visits.lock().unwrap().clone()
    }

    pub fn visit_count(&self) -> usize {
        self.visits.lock().unwrap().len()
    }
}

#[async_trait]
impl ChainSource for MockChain {
    async fn latest_height(&self) -> Result<u64, SourceError> {
        match &self.head_error {
            Some(error) => Err(error.clone()),
            None => Ok(self.latest),
        }
    }

    async fn block_by_height(&self, height: u64) -> Result<Option<Block>, SourceError> {
        self.visits.lock().unwrap().push(height);
        if self.failing.contains(&height) {
            return Err(SourceError::Request(format!(
                "simulated failure at height {height}"
            )));
        }
        if self.missing.contains(&height) {
            return Ok(None);
        }
        Ok(self.blocks.get(&height).cloned())
    }

    async fn block_by_hash(&self, hash: &str) -> Result<Option<Block>, SourceError> {
        let wanted = canonical_hex(hash);
        Ok(self
            .blocks
            .values()
            .find(|block| canonical_hex(&block.hash) == wanted)
            .cloned())
    }
}

/// Indexer fixture keyed by canonical hash and identifier.
#[derive(Debug, Default)]
pub struct MockIndex {
    by_hash: HashMap<String, TransactionSearchResult>,
    by_identifier: HashMap<String, TransactionSearchResult>,
    error: Option<SourceError>,
    calls: AtomicUsize,
}

impl MockIndex {
    pub fn with_hash(mut self, result: TransactionSearchResult) -> Self {
        self.by_hash.insert(canonical_hex(&result.hash), result);
        self
    }

    pub fn with_identifier(
        mut self,
        identifier: impl AsRef<str>,
        result: TransactionSearchResult,
    ) -> Self {
        self.by_identifier
            .insert(canonical_hex(identifier.as_ref()), result);
        self
    }

    pub fn failing(error: SourceError) -> Self {
        Self {
            error: Some(error),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransactionIndex for MockIndex {
    async fn transactions_by_offset(
        &self,
        offset: &TxOffset,
    ) -> Result<Vec<TransactionSearchResult>, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        let found = match offset {
            TxOffset::Hash(hash) => self.by_hash.get(&canonical_hex(hash)),
            TxOffset::Identifier(id) => self.by_identifier.get(&canonical_hex(id)),
        };
        Ok(found.cloned().into_iter().collect())
    }
}
