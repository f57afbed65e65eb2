//! Account activity scanning.
//!
//! Without an account index the only option is to read every block in a
//! window and test each transaction. The scan is strictly sequential and always
//! completes its window; it accumulates matches instead of stopping at a count.

use crate::{
    key::canonical_hex,
    search::SearchWindow,
    source::{
        Block,
        ChainSource,
        Transaction,
        TransactionSearchResult,
    },
};
use tracing::debug;

/// Decides whether a transaction involves an account.
pub trait AccountMatcher: Send + Sync {
    fn contains_account_marker(&self, tx: &Transaction, marker: &str) -> bool;
}

/// Case-insensitive textual inclusion of the marker in the encoded payload.
///
/// This is a coarse heuristic: it does not decode the transaction, so a marker
/// that happens to appear in unrelated call data also matches. Swap in a
/// decoding [`AccountMatcher`] to get structural matching.
///
/// Payloads are hex, so the marker must be the hex public key. A marker
/// with non-hex characters, such as an SS58 address, never matches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawPayloadMatcher;

impl AccountMatcher for RawPayloadMatcher {
    fn contains_account_marker(&self, tx: &Transaction, marker: &str) -> bool {
        let marker = canonical_hex(marker);
        !marker.is_empty() && canonical_hex(&tx.raw).contains(&marker)
    }
}

pub struct AccountScanner<'a, S: ?Sized, M: ?Sized> {
    source: &'a S,
    matcher: &'a M,
}

impl<'a, S, M> AccountScanner<'a, S, M>
where
    S: ChainSource + ?Sized,
    M: AccountMatcher + ?Sized,
{
    pub fn new(source: &'a S, matcher: &'a M) -> Self {
        Self { source, matcher }
    }

    /// Returns every matching transaction in `window`, newest block first and
    /// block order within a block.
    #[tracing::instrument(skip(self), fields(start = window.start(), end = window.end()))]
    pub async fn scan(&self, marker: &str, window: SearchWindow) -> Vec<TransactionSearchResult> {
        let mut matches = Vec::new();

        for height in window.heights_desc() {
            match self.source.block_by_height(height).await {
                Ok(Some(block)) => matches.extend(self.matching(&block, marker)),
                Ok(None) => debug!(height, "no block at height"),
                Err(error) => debug!(height, %error, "skipping height after fetch failure"),
            }
        }

        matches
    }

    fn matching(&self, block: &Block, marker: &str) -> Vec<TransactionSearchResult> {
        block
            .transactions
            .iter()
            .enumerate()
            .filter(|(_, tx)| self.matcher.contains_account_marker(tx, marker))
            .filter_map(|(position, _)| block.locate(position))
            .collect()
    }
}
