//! Entry point tying key normalization, window resolution and the search,
//! scan and paging strategies together.

use crate::{
    batch::BatchRetriever,
    config::LocatorConfig,
    error::{
        LocateError,
        Result,
        SourceError,
    },
    key::{
        InvalidKey,
        SearchKey,
        normalize,
    },
    scan::{
        AccountMatcher,
        AccountScanner,
        RawPayloadMatcher,
    },
    search::{
        RangeSearcher,
        SearchWindow,
    },
    source::{
        Block,
        BlockSummary,
        ChainSource,
        TransactionIndex,
        TransactionSearchResult,
        TxOffset,
    },
};
use serde::{
    Deserialize,
    Serialize,
};
use std::sync::Arc;
use tracing::{
    info,
    warn,
};

/// Caller-supplied height bounds. Missing bounds are filled from the
/// finalized head and the configured window depth.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchBounds {
    pub start: Option<u64>,
    pub end: Option<u64>,
}

impl SearchBounds {
    pub fn new(start: Option<u64>, end: Option<u64>) -> Self {
        Self { start, end }
    }
}

pub struct Locator<S: ?Sized> {
    source: Arc<S>,
    index: Option<Arc<dyn TransactionIndex>>,
    matcher: Arc<dyn AccountMatcher>,
    config: LocatorConfig,
}

impl<S: ?Sized> std::fmt::Debug for Locator<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Locator")
            .field("config", &self.config)
            .field("has_index", &self.index.is_some())
            .finish_non_exhaustive()
    }
}

impl<S> Locator<S>
where
    S: ChainSource + ?Sized,
{
    pub fn new(source: Arc<S>, config: LocatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            source,
            index: None,
            matcher: Arc::new(RawPayloadMatcher),
            config,
        })
    }

    /// Consult `index` for hash lookups before scanning blocks, and enable
    /// identifier lookups.
    pub fn with_index(mut self, index: Arc<dyn TransactionIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn with_matcher(mut self, matcher: Arc<dyn AccountMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    pub fn config(&self) -> &LocatorConfig {
        &self.config
    }

    /// Locates a transaction by hash or indexer identifier.
    ///
    /// `Ok(None)` means the search ran and found nothing in range.
    #[tracing::instrument(skip(self))]
    pub async fn find_transaction(
        &self,
        raw: &str,
        bounds: SearchBounds,
    ) -> Result<Option<TransactionSearchResult>> {
        let key = normalize(raw);
        for warning in key.warnings() {
            warn!(%warning, "search key adjusted");
        }

        match &key {
            SearchKey::Invalid(reason) => Err(LocateError::InvalidKey(*reason)),
            SearchKey::Identifier(identifier) => self.find_by_identifier(identifier).await,
            SearchKey::Hash { value, .. } => {
                let window = self
                    .resolve_window(bounds, self.config.max_search_blocks)
                    .await?;

                if let Some(found) = self.find_by_hash(value, window).await {
                    return Ok(Some(found));
                }
                // A long input may be junk followed by the real hash.
                match key.trailing_candidate() {
                    Some(trailing) if trailing != value.as_str() => {
                        warn!(trailing, "retrying with trailing 64 characters");
                        Ok(self.find_by_hash(trailing, window).await)
                    }
                    _ => Ok(None),
                }
            }
        }
    }

    /// Every transaction in range whose payload mentions `marker`, newest
    /// block first.
    #[tracing::instrument(skip(self))]
    pub async fn scan_account(
        &self,
        marker: &str,
        bounds: SearchBounds,
    ) -> Result<Vec<TransactionSearchResult>> {
        let marker = marker.trim();
        if marker.is_empty() {
            return Err(LocateError::EmptyMarker);
        }
        let window = self
            .resolve_window(bounds, self.config.max_scan_blocks)
            .await?;

        let found = AccountScanner::new(&*self.source, &*self.matcher)
            .scan(marker, window)
            .await;
        info!(matches = found.len(), "account scan complete");
        Ok(found)
    }

    /// The `limit` most recent blocks, newest first.
    #[tracing::instrument(skip(self))]
    pub async fn latest_blocks(&self, limit: usize) -> Result<Vec<BlockSummary>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let latest = self.latest_height().await?;
        let source = &*self.source;

        let page = BatchRetriever::new(self.config.batch_size)
            .fetch_page(SearchWindow::ending_at(latest, latest), limit, |height| {
                async move {
                    let block = source.block_by_height(height).await?;
                    Ok::<Vec<BlockSummary>, SourceError>(
                        block.map(|b| b.summary()).into_iter().collect(),
                    )
                }
            })
            .await;
        Ok(page)
    }

    /// Up to `limit` of the most recent transactions, newest first.
    ///
    /// Only a capped number of blocks is examined, so sparse chains produce
    /// short pages.
    #[tracing::instrument(skip(self))]
    pub async fn latest_transactions(
        &self,
        limit: usize,
    ) -> Result<Vec<TransactionSearchResult>> {
        let blocks = self.config.tx_block_range(limit);
        if blocks == 0 {
            return Ok(Vec::new());
        }
        let latest = self.latest_height().await?;
        let range = SearchWindow::ending_at(latest, blocks - 1);
        let source = &*self.source;

        let page = BatchRetriever::new(self.config.batch_size)
            .fetch_page(range, limit, |height| {
                async move {
                    let block = source.block_by_height(height).await?;
                    Ok::<_, SourceError>(
                        block
                            .map(|b| b.located_transactions())
                            .unwrap_or_default(),
                    )
                }
            })
            .await;
        if page.len() < limit {
            info!(found = page.len(), limit, blocks, "short transaction page");
        }
        Ok(page)
    }

    /// Resolves a block by hash.
    #[tracing::instrument(skip(self))]
    pub async fn block_by_hash(&self, raw: &str) -> Result<Option<Block>> {
        match normalize(raw) {
            SearchKey::Hash { value, .. } => {
                self.source
                    .block_by_hash(&value)
                    .await
                    .map_err(LocateError::Bootstrap)
            }
            SearchKey::Identifier(_) => Err(LocateError::InvalidKey(InvalidKey::NotAHash)),
            SearchKey::Invalid(reason) => Err(LocateError::InvalidKey(reason)),
        }
    }

    async fn find_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<TransactionSearchResult>> {
        let index = self
            .index
            .as_ref()
            .ok_or(LocateError::IdentifierUnsupported)?;
        let found = index
            .transactions_by_offset(&TxOffset::Identifier(identifier.to_string()))
            .await
            .map_err(LocateError::Bootstrap)?;
        Ok(found.into_iter().next())
    }

    async fn find_by_hash(
        &self,
        hash: &str,
        window: SearchWindow,
    ) -> Option<TransactionSearchResult> {
        if let Some(index) = &self.index {
            match index
                .transactions_by_offset(&TxOffset::Hash(hash.to_string()))
                .await
            {
                Ok(found) if !found.is_empty() => {
                    if let Some(tx) = found
                        .into_iter()
                        .find(|tx| window.contains(tx.block_number))
                    {
                        return Some(tx);
                    }
                    info!(hash, ?window, "index entry outside window, scanning blocks");
                }
                Ok(_) => info!(hash, "index has no entry, scanning blocks"),
                Err(error) => warn!(%error, "index lookup failed, scanning blocks"),
            }
        }

        let found = RangeSearcher::new(&*self.source, self.config.small_window_threshold)
            .search(hash, window)
            .await;
        if let Some(tx) = &found {
            info!(
                block_number = tx.block_number,
                extrinsic_index = tx.extrinsic_index,
                "transaction located"
            );
        }
        found
    }

    async fn resolve_window(&self, bounds: SearchBounds, depth: u64) -> Result<SearchWindow> {
        let end = match bounds.end {
            Some(end) => end,
            None => self.latest_height().await?,
        };
        match bounds.start {
            Some(start) => SearchWindow::new(start, end),
            None => Ok(SearchWindow::ending_at(end, depth)),
        }
    }

    async fn latest_height(&self) -> Result<u64> {
        self.source
            .latest_height()
            .await
            .map_err(LocateError::Bootstrap)
    }
}
