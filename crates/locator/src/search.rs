//! Block range search for a single transaction hash.
//!
//! "Block at height h contains hash X" is not monotonic in `h`, so bisection
//! cannot prove absence. The searcher uses it as a recency-biased traversal
//! order instead: probe the midpoint, fully search the newer half, then the
//! older half, and fall back to a newest-first linear scan once a window gets
//! small. Absent transport failures every height is visited at most once, and
//! a hash inside the window is always found.

use crate::{
    error::{
        LocateError,
        Result,
    },
    source::{
        ChainSource,
        TransactionSearchResult,
    },
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    trace,
};

/// Closed, non-empty interval of block heights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchWindow {
    start: u64,
    end: u64,
}

impl SearchWindow {
    pub fn new(start: u64, end: u64) -> Result<Self> {
        if start > end {
            return Err(LocateError::InvalidWindow { start, end });
        }
        Ok(Self { start, end })
    }

    /// The window `[end - depth, end]`, clamped at genesis.
    pub fn ending_at(end: u64, depth: u64) -> Self {
        Self {
            start: end.saturating_sub(depth),
            end,
        }
    }

    pub fn start(&self) -> u64 {
        self.start
    }

    pub fn end(&self) -> u64 {
        self.end
    }

    /// Number of heights in the window.
    pub fn len(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    pub fn contains(&self, height: u64) -> bool {
        (self.start..=self.end).contains(&height)
    }

    /// Heights from `end` down to `start`.
    pub fn heights_desc(&self) -> impl Iterator<Item = u64> {
        (self.start..=self.end).rev()
    }
}

enum Probe {
    Found(TransactionSearchResult),
    /// The upstream has no block at this height.
    Missing,
    /// A block resolved without the hash, or the fetch failed.
    NoMatch,
}

/// Searches a window of blocks for a transaction hash.
pub struct RangeSearcher<'a, S: ?Sized> {
    source: &'a S,
    small_window_threshold: u64,
}

impl<'a, S> RangeSearcher<'a, S>
where
    S: ChainSource + ?Sized,
{
    pub fn new(source: &'a S, small_window_threshold: u64) -> Self {
        Self {
            source,
            small_window_threshold: small_window_threshold.max(1),
        }
    }

    /// Finds the block and index of the transaction whose hash is `key`.
    ///
    /// `key` must be a canonical 64 character hash. Returns `None` once the
    /// window is exhausted; per-height fetch errors are skipped.
    #[tracing::instrument(skip(self), fields(start = window.start, end = window.end))]
    pub async fn search(
        &self,
        key: &str,
        window: SearchWindow,
    ) -> Option<TransactionSearchResult> {
        // Depth-first over sub-windows. The right (newer) half is pushed last so
        // it is popped, and fully resolved, before the left half.
        let mut pending = vec![window];

        while let Some(window) = pending.pop() {
            if window.end - window.start < self.small_window_threshold {
                if let Some(found) = self.linear_scan(key, window).await {
                    return Some(found);
                }
                continue;
            }

            let mid = window.start + (window.end - window.start) / 2;
            // mid < end holds because the window spans at least the threshold.
            let right = SearchWindow {
                start: mid + 1,
                end: window.end,
            };
            let left = (mid > window.start).then(|| {
                SearchWindow {
                    start: window.start,
                    end: mid - 1,
                }
            });

            match self.probe(key, mid).await {
                Probe::Found(found) => return Some(found),
                Probe::Missing => {
                    trace!(height = mid, "no block at midpoint, searching later heights only");
                    pending.push(right);
                }
                Probe::NoMatch => {
                    pending.extend(left);
                    pending.push(right);
                }
            }
        }

        None
    }

    async fn linear_scan(
        &self,
        key: &str,
        window: SearchWindow,
    ) -> Option<TransactionSearchResult> {
        for height in window.heights_desc() {
            if let Probe::Found(found) = self.probe(key, height).await {
                return Some(found);
            }
        }
        None
    }

    async fn probe(&self, key: &str, height: u64) -> Probe {
        match self.source.block_by_height(height).await {
            Ok(Some(block)) => {
                match block.position_of(key).and_then(|position| block.locate(position)) {
                    Some(found) => Probe::Found(found),
                    None => Probe::NoMatch,
                }
            }
            Ok(None) => Probe::Missing,
            Err(error) => {
                debug!(height, %error, "skipping height after fetch failure");
                Probe::NoMatch
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        SourceError,
        test_utils::{
            MockChain,
            tx_hash,
        },
    };
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use std::collections::HashSet;

    const THRESHOLD: u64 = 10;

    fn window(start: u64, end: u64) -> SearchWindow {
        SearchWindow::new(start, end).unwrap()
    }

    fn assert_no_revisits(chain: &MockChain) {
        let visits = chain.visits();
        let unique: HashSet<_> = visits.iter().collect();
        assert_eq!(unique.len(), visits.len(), "revisited heights: {visits:?}");
    }

    #[test]
    fn window_rejects_inverted_bounds() {
        assert_matches!(
            SearchWindow::new(5, 4),
            Err(LocateError::InvalidWindow { start: 5, end: 4 })
        );
        assert_eq!(window(4, 4).len(), 1);
    }

    #[test]
    fn window_ending_at_clamps_to_genesis() {
        let w = SearchWindow::ending_at(50, 1000);
        assert_eq!((w.start(), w.end()), (0, 50));
        let w = SearchWindow::ending_at(1000, 100);
        assert_eq!((w.start(), w.end()), (900, 1000));
    }

    #[tokio::test]
    async fn small_window_is_scanned_newest_first() {
        let chain = MockChain::with_height(20);
        let found = RangeSearcher::new(&chain, THRESHOLD)
            .search(&tx_hash(1), window(5, 12))
            .await;
        assert!(found.is_none());
        assert_eq!(chain.visits(), vec![12, 11, 10, 9, 8, 7, 6, 5]);
    }

    #[tokio::test]
    async fn large_window_probes_midpoint_then_newer_half() {
        let chain = MockChain::with_height(100);
        RangeSearcher::new(&chain, THRESHOLD)
            .search(&tx_hash(1), window(0, 100))
            .await;
        let visits = chain.visits();
        assert_eq!(visits[0], 50);
        // Right half [51, 100] is bisected next.
        assert_eq!(visits[1], 75);
        assert_eq!(visits.len(), 101);
        assert_no_revisits(&chain);
    }

    #[tokio::test]
    async fn finds_target_at_every_height() {
        let (start, end) = (3, 64);
        for target in start..=end {
            let key = tx_hash(target);
            let chain = MockChain::with_height(80)
                .with_filler(target, 2)
                .with_transaction(target, key.clone());
            let found = RangeSearcher::new(&chain, THRESHOLD)
                .search(&key, window(start, end))
                .await
                .unwrap_or_else(|| panic!("target at {target} not found"));
            assert_eq!(found.block_number, target);
            assert_eq!(found.extrinsic_index, 2);
            assert_no_revisits(&chain);
        }
    }

    #[tokio::test]
    async fn matches_prefixed_upper_case_hashes_from_upstream() {
        let key = tx_hash(9);
        let chain = MockChain::with_height(30)
            .with_transaction(17, format!("0x{}", key.to_uppercase()));
        let found = RangeSearcher::new(&chain, THRESHOLD)
            .search(&key, window(0, 30))
            .await
            .unwrap();
        assert_eq!(found.block_number, 17);
    }

    #[tokio::test]
    async fn target_outside_window_is_not_found() {
        let key = tx_hash(5);
        let chain = MockChain::with_height(200).with_transaction(150, key.clone());
        let found = RangeSearcher::new(&chain, THRESHOLD)
            .search(&key, window(0, 100))
            .await;
        assert!(found.is_none());
        assert!(chain.visits().iter().all(|h| *h <= 100));
        assert_no_revisits(&chain);
    }

    #[tokio::test]
    async fn missing_midpoint_skips_older_half() {
        // Known limitation: a block missing at the midpoint hides everything below it.
        let key = tx_hash(7);
        let chain = MockChain::with_height(100)
            .with_missing(50)
            .with_transaction(20, key.clone());
        let found = RangeSearcher::new(&chain, THRESHOLD)
            .search(&key, window(0, 100))
            .await;
        assert!(found.is_none());
        assert!(chain.visits().iter().all(|h| *h >= 50));
    }

    #[tokio::test]
    async fn failing_midpoint_still_searches_both_halves() {
        let key = tx_hash(7);
        let chain = MockChain::with_height(100)
            .with_failing(50)
            .with_transaction(20, key.clone());
        let found = RangeSearcher::new(&chain, THRESHOLD)
            .search(&key, window(0, 100))
            .await
            .unwrap();
        assert_eq!(found.block_number, 20);
    }

    #[tokio::test]
    async fn failing_heights_in_linear_scan_are_skipped() {
        let key = tx_hash(3);
        let chain = MockChain::with_height(10)
            .with_failing(9)
            .with_failing(8)
            .with_transaction(4, key.clone());
        let found = RangeSearcher::new(&chain, THRESHOLD)
            .search(&key, window(0, 9))
            .await
            .unwrap();
        assert_eq!(found.block_number, 4);
        assert_eq!(chain.visits(), vec![9, 8, 7, 6, 5, 4]);
    }

    #[tokio::test]
    async fn recent_targets_are_found_quickly() {
        let key = tx_hash(11);
        let chain = MockChain::with_height(1000).with_transaction(990, key.clone());
        let found = RangeSearcher::new(&chain, THRESHOLD)
            .search(&key, window(0, 1000))
            .await
            .unwrap();
        assert_eq!(found.block_number, 990);
        assert!(chain.visit_count() < 50, "visited {}", chain.visit_count());
    }

    #[tokio::test]
    async fn unrelated_errors_do_not_surface() {
        let chain = MockChain::with_height(40)
            .with_head_error(SourceError::Request("down".to_string()))
            .with_failing(30);
        let found = RangeSearcher::new(&chain, THRESHOLD)
            .search(&tx_hash(1), window(0, 40))
            .await;
        assert!(found.is_none());
    }
}
