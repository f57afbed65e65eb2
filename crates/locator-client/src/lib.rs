//! HTTP transports for `chain-locator`.
//!
//! [`RpcChainClient`] talks JSON-RPC 2.0 to a chain node and implements
//! [`ChainSource`](chain_locator::ChainSource). [`IndexerClient`] queries a
//! GraphQL indexing service and implements both `ChainSource` and
//! [`TransactionIndex`](chain_locator::TransactionIndex).
#![deny(clippy::panic)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

mod config;
mod error;
pub mod indexer;
pub mod rpc;

pub use config::{
    ClientConfig,
    DEFAULT_REQUEST_TIMEOUT,
};
pub use error::ClientError;
pub use indexer::{
    BlockOffset,
    IndexerClient,
};
pub use rpc::RpcChainClient;
