//! Tuning knobs for searching, scanning and paging.

use crate::error::{
    LocateError,
    Result,
};
use serde::{
    Deserialize,
    Serialize,
};

/// Heights fetched concurrently per batch when paging.
pub const DEFAULT_BATCH_SIZE: usize = 20;
/// Windows narrower than this are scanned linearly instead of bisected.
pub const DEFAULT_SMALL_WINDOW_THRESHOLD: u64 = 10;
/// Default window depth for a single-hash search.
pub const DEFAULT_MAX_SEARCH_BLOCKS: u64 = 1000;
/// Default window depth for an account scan.
pub const DEFAULT_MAX_SCAN_BLOCKS: u64 = 100;
/// Blocks examined per requested transaction when paging transactions.
pub const DEFAULT_TX_RANGE_MULTIPLIER: u64 = 3;
/// Upper bound on blocks examined when paging transactions.
pub const DEFAULT_MAX_TX_RANGE: u64 = 1000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LocatorConfig {
    pub batch_size: usize,
    pub small_window_threshold: u64,
    pub max_search_blocks: u64,
    pub max_scan_blocks: u64,
    /// Transaction density is assumed sparse (roughly one every three blocks).
    pub tx_range_multiplier: u64,
    pub max_tx_range: u64,
}

impl Default for LocatorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            small_window_threshold: DEFAULT_SMALL_WINDOW_THRESHOLD,
            max_search_blocks: DEFAULT_MAX_SEARCH_BLOCKS,
            max_scan_blocks: DEFAULT_MAX_SCAN_BLOCKS,
            tx_range_multiplier: DEFAULT_TX_RANGE_MULTIPLIER,
            max_tx_range: DEFAULT_MAX_TX_RANGE,
        }
    }
}

impl LocatorConfig {
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size;
        self
    }

    pub fn with_small_window_threshold(mut self, threshold: u64) -> Self {
        self.small_window_threshold = threshold;
        self
    }

    pub fn with_max_search_blocks(mut self, blocks: u64) -> Self {
        self.max_search_blocks = blocks;
        self
    }

    pub fn with_max_scan_blocks(mut self, blocks: u64) -> Self {
        self.max_scan_blocks = blocks;
        self
    }

    pub fn with_tx_range(mut self, multiplier: u64, max: u64) -> Self {
        self.tx_range_multiplier = multiplier;
        self.max_tx_range = max;
        self
    }

    /// Number of blocks to examine when paging `limit` transactions.
    pub fn tx_block_range(&self, limit: usize) -> u64 {
        let limit = u64::try_from(limit).unwrap_or(u64::MAX);
        limit
            .saturating_mul(self.tx_range_multiplier)
            .min(self.max_tx_range)
    }

    pub fn validate(&self) -> Result<()> {
        if self.batch_size == 0 {
            return Err(LocateError::InvalidConfig(
                "batch size must be at least 1".to_string(),
            ));
        }
        if self.small_window_threshold == 0 {
            return Err(LocateError::InvalidConfig(
                "small window threshold must be at least 1".to_string(),
            ));
        }
        if self.tx_range_multiplier == 0 || self.max_tx_range == 0 {
            return Err(LocateError::InvalidConfig(
                "transaction paging range must be at least 1 block".to_string(),
            ));
        }
        Ok(())
    }
}
