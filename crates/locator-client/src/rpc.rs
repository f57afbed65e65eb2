//! JSON-RPC chain client.
//!
//! Speaks the node methods `chain_getFinalizedHead`, `chain_getBlockHash` and
//! `chain_getBlock`. Extrinsics come back as SCALE-encoded hex; their hashes
//! are the Blake2b-256 digest of the encoded bytes.

use crate::{
    config::ClientConfig,
    error::ClientError,
};
use async_trait::async_trait;
use blake2b_simd::Params;
use chain_locator::{
    Block,
    ChainSource,
    SourceError,
    Transaction,
    key::canonical_hex,
};
use reqwest::Client;
use serde::{
    Deserialize,
    Serialize,
};
use std::sync::atomic::{
    AtomicU64,
    Ordering,
};
use tracing::trace;
use url::Url;

const EXTRINSIC_HASH_LEN: usize = 32;

#[derive(Debug)]
pub struct RpcChainClient {
    client: Client,
    url: Url,
    request_id: AtomicU64,
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, T> {
    jsonrpc: &'static str,
    method: &'a str,
    params: T,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    jsonrpc: String,
    result: Option<T>,
    error: Option<JsonRpcError>,
    id: u64,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct SignedBlock {
    block: RawBlock,
}

#[derive(Debug, Deserialize)]
struct RawBlock {
    header: RawHeader,
    extrinsics: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawHeader {
    number: BlockNumber,
    parent_hash: String,
}

/// Nodes report header numbers as `0x` hex strings; some proxies use plain
/// JSON numbers or decimal strings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum BlockNumber {
    Number(u64),
    Text(String),
}

impl BlockNumber {
    fn value(&self) -> Result<u64, SourceError> {
        match self {
            BlockNumber::Number(number) => Ok(*number),
            BlockNumber::Text(text) => {
                let parsed = match text.strip_prefix("0x") {
                    Some(hex) => u64::from_str_radix(hex, 16),
                    None => text.parse(),
                };
                parsed.map_err(|_| {
                    SourceError::InvalidResponse(format!("invalid block number '{text}'"))
                })
            }
        }
    }
}

/// Blake2b-256 of the decoded extrinsic, `0x`-prefixed.
pub fn extrinsic_hash(raw: &str) -> Result<String, SourceError> {
    let bytes = hex::decode(canonical_hex(raw))
        .map_err(|e| SourceError::InvalidResponse(format!("extrinsic is not hex: {e}")))?;
    let digest = Params::new().hash_length(EXTRINSIC_HASH_LEN).hash(&bytes);
    Ok(format!("0x{}", hex::encode(digest.as_bytes())))
}

impl RpcChainClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            client: config.http_client()?,
            url: config.url.clone(),
            request_id: AtomicU64::new(1),
        })
    }

    fn next_request_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Issues one call. A `null` result comes back as `None`.
    async fn make_request<P, R>(&self, method: &str, params: P) -> Result<Option<R>, SourceError>
    where
        P: Serialize,
        R: for<'de> Deserialize<'de>,
    {
        let request_id = self.next_request_id();
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: request_id,
        };
        trace!(method, id = request_id, "sending JSON-RPC request");

        let response = self
            .client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await
            .map_err(|e| SourceError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::Request(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let body: JsonRpcResponse<R> = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        if body.jsonrpc != "2.0" {
            return Err(SourceError::InvalidResponse(format!(
                "Invalid JSON-RPC version: expected '2.0', got '{}'",
                body.jsonrpc
            )));
        }
        if body.id != request_id {
            return Err(SourceError::InvalidResponse(format!(
                "Request/response ID mismatch: expected {request_id}, got {}",
                body.id
            )));
        }
        if let Some(error) = body.error {
            return Err(SourceError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        Ok(body.result)
    }

    async fn fetch_block(&self, hash: &str) -> Result<Option<Block>, SourceError> {
        let hash = format!("0x{}", canonical_hex(hash));
        let signed: Option<SignedBlock> = self.make_request("chain_getBlock", [&hash]).await?;
        signed.map(|signed| into_block(hash, signed.block)).transpose()
    }
}

fn into_block(hash: String, raw: RawBlock) -> Result<Block, SourceError> {
    let transactions = raw
        .extrinsics
        .into_iter()
        .enumerate()
        .map(|(position, encoded)| {
            let index = u32::try_from(position).map_err(|_| {
                SourceError::InvalidResponse(format!("extrinsic position {position} out of range"))
            })?;
            Ok(Transaction {
                index,
                hash: extrinsic_hash(&encoded)?,
                raw: encoded,
            })
        })
        .collect::<Result<Vec<_>, SourceError>>()?;

    Ok(Block {
        number: raw.header.number.value()?,
        hash,
        parent_hash: raw.header.parent_hash,
        transactions,
    })
}

#[async_trait]
impl ChainSource for RpcChainClient {
    async fn latest_height(&self) -> Result<u64, SourceError> {
        let head: String = self
            .make_request("chain_getFinalizedHead", [(); 0])
            .await?
            .ok_or_else(|| {
                SourceError::InvalidResponse("node has no finalized head".to_string())
            })?;
        let block = self.fetch_block(&head).await?.ok_or_else(|| {
            SourceError::InvalidResponse(format!("finalized head {head} is not retrievable"))
        })?;
        Ok(block.number)
    }

    async fn block_by_height(&self, height: u64) -> Result<Option<Block>, SourceError> {
        let hash: Option<String> = self.make_request("chain_getBlockHash", [height]).await?;
        match hash {
            Some(hash) => self.fetch_block(&hash).await,
            None => Ok(None),
        }
    }

    async fn block_by_hash(&self, hash: &str) -> Result<Option<Block>, SourceError> {
        self.fetch_block(hash).await
    }
}
