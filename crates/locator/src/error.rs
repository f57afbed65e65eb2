//! Error types for the locator

use crate::key::InvalidKey;
use thiserror::Error;

/// Failure reported by a [`ChainSource`](crate::ChainSource) or
/// [`TransactionIndex`](crate::TransactionIndex) implementation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    /// The request could not be sent or no response arrived (includes timeouts).
    #[error("request failed: {0}")]
    Request(String),
    /// The chain answered with a protocol-level error object.
    #[error("RPC error code {code}: {message}")]
    Rpc { code: i64, message: String },
    /// The response did not have the expected shape.
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    /// The indexing service returned query errors.
    #[error("query failed: {0}")]
    Query(String),
}

impl SourceError {
    /// Machine-readable code, when the upstream supplied one.
    pub fn code(&self) -> Option<i64> {
        match self {
            SourceError::Rpc { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Errors surfaced to callers of the [`Locator`](crate::Locator).
///
/// Per-position fetch failures never show up here; they are absorbed inside
/// the search, scan and batch loops.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("invalid hash format: {0}")]
    InvalidKey(#[from] InvalidKey),

    #[error("invalid search window: start {start} is above end {end}")]
    InvalidWindow { start: u64, end: u64 },

    #[error("invalid locator configuration: {0}")]
    InvalidConfig(String),

    #[error("account marker must not be empty")]
    EmptyMarker,

    #[error("identifier lookups need an indexing service")]
    IdentifierUnsupported,

    /// The finalized head (or the indexer, for identifier keys) could not be
    /// queried, so the search could not run at all.
    #[error("failed to search: {0}")]
    Bootstrap(#[source] SourceError),
}

pub type Result<T> = std::result::Result<T, LocateError>;
