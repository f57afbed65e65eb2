//! Transaction and account locator for chains without a hash index.
//!
//! The crate takes a raw search string, normalizes it into a [`SearchKey`],
//! and walks a bounded window of block heights through a [`ChainSource`] until
//! the transaction is found or the window is exhausted. Browsing the latest
//! blocks and transactions goes through the batched retriever in [`batch`].
//!
//! Transport is left to the caller: anything implementing [`ChainSource`]
//! (and optionally [`TransactionIndex`]) can back a [`Locator`].
#![allow(clippy::missing_errors_doc)]
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod batch;
pub mod config;
pub mod error;
pub mod key;
pub mod locator;
pub mod scan;
pub mod search;
pub mod source;
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use config::LocatorConfig;
pub use error::{
    LocateError,
    SourceError,
};
pub use key::{
    InvalidKey,
    KeyWarning,
    SearchKey,
    normalize,
};
pub use locator::{
    Locator,
    SearchBounds,
};
pub use scan::{
    AccountMatcher,
    RawPayloadMatcher,
};
pub use search::SearchWindow;
pub use source::{
    Block,
    BlockSummary,
    ChainSource,
    Transaction,
    TransactionIndex,
    TransactionSearchResult,
    TxOffset,
};
