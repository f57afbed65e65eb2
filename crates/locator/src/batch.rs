//! Batched retrieval of the most recent blocks or transactions.
//!
//! Heights are walked downwards from the top of a range in fixed-size batches.
//! Every fetch in a batch runs concurrently and the batch is joined before the
//! next one starts. A failed fetch contributes nothing and never aborts the
//! page, so a page can come back short when too many fetches fail.

use crate::{
    error::SourceError,
    search::SearchWindow,
    source::{
        BlockSummary,
        TransactionSearchResult,
    },
};
use futures::future::join_all;
use std::{
    cmp::Ordering,
    future::Future,
};
use tracing::debug;

/// Position of a page item, used for the final deterministic ordering.
pub trait Paged {
    fn height(&self) -> u64;

    /// Tie-break inside one block; lower indexes come first.
    fn index_in_block(&self) -> u32 {
        0
    }
}

impl Paged for BlockSummary {
    fn height(&self) -> u64 {
        self.number
    }
}

impl Paged for TransactionSearchResult {
    fn height(&self) -> u64 {
        self.block_number
    }

    fn index_in_block(&self) -> u32 {
        self.extrinsic_index
    }
}

fn newest_first<T: Paged>(a: &T, b: &T) -> Ordering {
    b.height()
        .cmp(&a.height())
        .then_with(|| a.index_in_block().cmp(&b.index_in_block()))
}

#[derive(Debug, Clone, Copy)]
pub struct BatchRetriever {
    batch_size: usize,
}

impl BatchRetriever {
    pub fn new(batch_size: usize) -> Self {
        Self {
            batch_size: batch_size.max(1),
        }
    }

    /// Collects up to `limit` items from `range`, newest first.
    ///
    /// `fetch` yields the items found at one height (none, one block, or the
    /// transactions of a block). Stops issuing batches once `limit` items are
    /// in hand or the range is exhausted.
    #[tracing::instrument(skip(self, fetch), fields(start = range.start(), end = range.end()))]
    pub async fn fetch_page<T, F, Fut>(
        &self,
        range: SearchWindow,
        limit: usize,
        fetch: F,
    ) -> Vec<T>
    where
        T: Paged,
        F: Fn(u64) -> Fut,
        Fut: Future<Output = Result<Vec<T>, SourceError>>,
    {
        let mut items = Vec::new();
        if limit == 0 {
            return items;
        }

        let span = u64::try_from(self.batch_size - 1).unwrap_or(u64::MAX);
        let mut cursor = Some(range.end());

        while let Some(top) = cursor {
            if items.len() >= limit {
                break;
            }
            let bottom = top.saturating_sub(span).max(range.start());

            let batch = (bottom..=top).rev().map(|height| {
                let pending = fetch(height);
                async move { (height, pending.await) }
            });
            for (height, result) in join_all(batch).await {
                match result {
                    Ok(found) => items.extend(found),
                    Err(error) => debug!(height, %error, "dropping height from page"),
                }
            }

            cursor = bottom
                .checked_sub(1)
                .filter(|next| *next >= range.start());
        }

        // Completion order within a batch says nothing about height order.
        items.sort_by(newest_first);
        items.truncate(limit);
        items
    }
}
