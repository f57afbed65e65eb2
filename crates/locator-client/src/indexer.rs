//! GraphQL indexer client.
//!
//! The indexer exposes `block(offset)` for single blocks and
//! `extrinsics(offset)` for transaction lookups by hash or identifier.

use crate::{
    config::ClientConfig,
    error::ClientError,
};
use async_trait::async_trait;
use chain_locator::{
    Block,
    ChainSource,
    SourceError,
    Transaction,
    TransactionIndex,
    TransactionSearchResult,
    TxOffset,
    key::canonical_hex,
};
use reqwest::Client;
use serde::{
    Deserialize,
    de::DeserializeOwned,
};
use serde_json::{
    Value,
    json,
};
use tracing::debug;
use url::Url;

const BLOCK_QUERY: &str = r"
    query Block($offset: BlockOffset) {
        block(offset: $offset) {
            height
            hash
            parentHash
            extrinsics {
                index
                hash
                data
            }
        }
    }
";

const EXTRINSICS_QUERY: &str = r"
    query Extrinsics($offset: ExtrinsicOffset!) {
        extrinsics(offset: $offset) {
            index
            hash
            data
            block {
                height
                hash
            }
        }
    }
";

/// Selects the block returned by the indexer's `block` query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockOffset {
    Latest,
    Height(u64),
    Hash(String),
}

impl BlockOffset {
    fn variables(&self) -> Value {
        match self {
            BlockOffset::Latest => json!({ "offset": null }),
            BlockOffset::Height(height) => json!({ "offset": { "height": height } }),
            BlockOffset::Hash(hash) => {
                json!({ "offset": { "hash": format!("0x{}", canonical_hex(hash)) } })
            }
        }
    }
}

fn tx_offset_variables(offset: &TxOffset) -> Value {
    match offset {
        TxOffset::Hash(hash) => {
            json!({ "offset": { "hash": format!("0x{}", canonical_hex(hash)) } })
        }
        TxOffset::Identifier(id) => {
            json!({ "offset": { "id": format!("0x{}", canonical_hex(id)) } })
        }
    }
}

pub struct IndexerClient {
    client: Client,
    url: Url,
}

impl IndexerClient {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        config.validate()?;
        Ok(Self {
            client: config.http_client()?,
            url: config.url.clone(),
        })
    }

    /// Fetches one block. `None` when the indexer has no such block.
    pub async fn block(&self, offset: &BlockOffset) -> Result<Option<Block>, SourceError> {
        let data: Option<BlockData> = self.execute_query(BLOCK_QUERY, offset.variables()).await?;
        Ok(data.and_then(|data| data.block).map(BlockNode::into_block))
    }

    /// Executes a query. A response without data and without errors is `None`.
    async fn execute_query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Value,
    ) -> Result<Option<T>, SourceError> {
        let body = json!({
            "query": query,
            "variables": variables,
        });

        let response = self
            .client
            .post(self.url.clone())
            .json(&body)
            .send()
            .await
            .map_err(|e| SourceError::Request(e.to_string()))?;

        if !response.status().is_success() {
            return Err(SourceError::Request(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let gql_response: GraphqlResponse<T> = response
            .json()
            .await
            .map_err(|e| SourceError::InvalidResponse(e.to_string()))?;

        if let Some(errors) = gql_response.errors.filter(|errors| !errors.is_empty()) {
            let messages: Vec<String> = errors.into_iter().map(|e| e.message).collect();
            return Err(SourceError::Query(messages.join("; ")));
        }

        Ok(gql_response.data)
    }
}

#[async_trait]
impl ChainSource for IndexerClient {
    async fn latest_height(&self) -> Result<u64, SourceError> {
        self.block(&BlockOffset::Latest)
            .await?
            .map(|block| block.number)
            .ok_or_else(|| SourceError::InvalidResponse("indexer has no blocks".to_string()))
    }

    async fn block_by_height(&self, height: u64) -> Result<Option<Block>, SourceError> {
        self.block(&BlockOffset::Height(height)).await
    }

    async fn block_by_hash(&self, hash: &str) -> Result<Option<Block>, SourceError> {
        self.block(&BlockOffset::Hash(hash.to_string())).await
    }
}

#[async_trait]
impl TransactionIndex for IndexerClient {
    async fn transactions_by_offset(
        &self,
        offset: &TxOffset,
    ) -> Result<Vec<TransactionSearchResult>, SourceError> {
        let data: Option<ExtrinsicsData> = self
            .execute_query(EXTRINSICS_QUERY, tx_offset_variables(offset))
            .await?;
        let found: Vec<_> = data
            .and_then(|data| data.extrinsics)
            .unwrap_or_default()
            .into_iter()
            .map(LocatedExtrinsicNode::into_result)
            .collect();
        debug!(?offset, found = found.len(), "indexer transaction lookup");
        Ok(found)
    }
}

// GraphQL response types
#[derive(Debug, Deserialize)]
struct GraphqlResponse<T> {
    data: Option<T>,
    errors: Option<Vec<GraphqlError>>,
}

#[derive(Debug, Deserialize)]
struct GraphqlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct BlockData {
    block: Option<BlockNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockNode {
    height: u64,
    hash: String,
    parent_hash: String,
    #[serde(default)]
    extrinsics: Vec<ExtrinsicNode>,
}

impl BlockNode {
    fn into_block(self) -> Block {
        let mut extrinsics = self.extrinsics;
        extrinsics.sort_by_key(|extrinsic| extrinsic.index);
        Block {
            number: self.height,
            hash: self.hash,
            parent_hash: self.parent_hash,
            transactions: extrinsics
                .into_iter()
                .map(|extrinsic| {
                    Transaction {
                        index: extrinsic.index,
                        hash: extrinsic.hash,
                        raw: extrinsic.data,
                    }
                })
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ExtrinsicNode {
    index: u32,
    hash: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct ExtrinsicsData {
    extrinsics: Option<Vec<LocatedExtrinsicNode>>,
}

#[derive(Debug, Deserialize)]
struct LocatedExtrinsicNode {
    index: u32,
    hash: String,
    data: String,
    block: BlockRef,
}

impl LocatedExtrinsicNode {
    fn into_result(self) -> TransactionSearchResult {
        TransactionSearchResult {
            block_hash: self.block.hash,
            block_number: self.block.height,
            extrinsic_index: self.index,
            hash: self.hash,
            raw_transaction: self.data,
        }
    }
}

#[derive(Debug, Deserialize)]
struct BlockRef {
    height: u64,
    hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use wiremock::{
        Mock,
        MockServer,
        ResponseTemplate,
        matchers::{
            body_partial_json,
            method,
        },
    };

    const BLOCK_HASH: &str = "0x4a1f9b0e3c2d7e6f5a4b3c2d1e0f9a8b7c6d5e4f3a2b1c0d9e8f7a6b5c4d3e2f";
    const TX_HASH: &str = "0x7d2c9e4b1a0f3e6d5c8b7a69584736251403f2e1d0c9b8a7f6e5d4c3b2a19080";

    async fn client(server: &MockServer) -> IndexerClient {
        IndexerClient::new(&ClientConfig::new(&server.uri()).unwrap()).unwrap()
    }

    async fn respond(server: &MockServer, variables: Value, body: Value) {
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "variables": variables })))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .expect(1)
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn block_by_height_orders_extrinsics_by_index() {
        let server = MockServer::start().await;
        respond(
            &server,
            json!({ "offset": { "height": 742 } }),
            json!({
                "data": {
                    "block": {
                        "height": 742,
                        "hash": BLOCK_HASH,
                        "parentHash": "0x00",
                        "extrinsics": [
                            { "index": 1, "hash": TX_HASH, "data": "0x0402" },
                            { "index": 0, "hash": "0x01", "data": "0x0401" }
                        ]
                    }
                }
            }),
        )
        .await;

        let block = client(&server)
            .await
            .block_by_height(742)
            .await
            .unwrap()
            .unwrap();

        assert_eq!(block.number, 742);
        let found = block
            .position_of(&canonical_hex(TX_HASH))
            .and_then(|i| block.locate(i))
            .unwrap();
        assert_eq!(found.extrinsic_index, 1);
        assert_eq!(found.raw_transaction, "0x0402");
    }

    #[tokio::test]
    async fn sparse_extrinsic_indices_are_kept() {
        let server = MockServer::start().await;
        respond(
            &server,
            json!({ "offset": { "height": 743 } }),
            json!({
                "data": {
                    "block": {
                        "height": 743,
                        "hash": BLOCK_HASH,
                        "parentHash": "0x00",
                        "extrinsics": [
                            { "index": 0, "hash": "0x01", "data": "0x0401" },
                            { "index": 3, "hash": TX_HASH, "data": "0x0403" }
                        ]
                    }
                }
            }),
        )
        .await;

        let block = client(&server)
            .await
            .block_by_height(743)
            .await
            .unwrap()
            .unwrap();

        let found = block
            .position_of(&canonical_hex(TX_HASH))
            .and_then(|i| block.locate(i))
            .unwrap();
        assert_eq!(found.extrinsic_index, 3);
        assert_eq!(found.raw_transaction, "0x0403");
        assert_eq!(block.located_transactions()[1].extrinsic_index, 3);
    }

    #[tokio::test]
    async fn null_block_is_not_found() {
        let server = MockServer::start().await;
        respond(
            &server,
            json!({ "offset": { "hash": BLOCK_HASH } }),
            json!({ "data": { "block": null } }),
        )
        .await;

        let block = client(&server)
            .await
            .block_by_hash(BLOCK_HASH.trim_start_matches("0x"))
            .await
            .unwrap();
        assert!(block.is_none());
    }

    #[tokio::test]
    async fn latest_height_uses_empty_offset() {
        let server = MockServer::start().await;
        respond(
            &server,
            json!({ "offset": null }),
            json!({
                "data": {
                    "block": { "height": 1000, "hash": BLOCK_HASH, "parentHash": "0x00" }
                }
            }),
        )
        .await;

        assert_eq!(client(&server).await.latest_height().await.unwrap(), 1000);
    }

    #[tokio::test]
    async fn graphql_errors_become_query_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": null,
                "errors": [{ "message": "unknown offset" }, { "message": "try again" }]
            })))
            .mount(&server)
            .await;

        let error = client(&server)
            .await
            .block_by_height(1)
            .await
            .unwrap_err();
        assert_eq!(error, SourceError::Query("unknown offset; try again".to_string()));
    }

    #[tokio::test]
    async fn empty_data_is_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let client = client(&server).await;
        assert!(client.block_by_height(1).await.unwrap().is_none());
        let found = client
            .transactions_by_offset(&TxOffset::Hash(TX_HASH.to_string()))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn transactions_by_hash() {
        let server = MockServer::start().await;
        respond(
            &server,
            json!({ "offset": { "hash": TX_HASH } }),
            json!({
                "data": {
                    "extrinsics": [{
                        "index": 2,
                        "hash": TX_HASH,
                        "data": "0x0403",
                        "block": { "height": 55, "hash": BLOCK_HASH }
                    }]
                }
            }),
        )
        .await;

        let found = client(&server)
            .await
            .transactions_by_offset(&TxOffset::Hash(TX_HASH.to_uppercase().replace("0X", "")))
            .await
            .unwrap();

        assert_eq!(
            found,
            vec![TransactionSearchResult {
                block_hash: BLOCK_HASH.to_string(),
                block_number: 55,
                extrinsic_index: 2,
                hash: TX_HASH.to_string(),
                raw_transaction: "0x0403".to_string(),
            }]
        );
    }

    #[tokio::test]
    async fn transactions_by_identifier_send_id_offset() {
        let server = MockServer::start().await;
        let identifier = format!("{}00000002", TX_HASH.trim_start_matches("0x"));
        respond(
            &server,
            json!({ "offset": { "id": format!("0x{identifier}") } }),
            json!({ "data": { "extrinsics": null } }),
        )
        .await;

        let found = client(&server)
            .await
            .transactions_by_offset(&TxOffset::Identifier(identifier))
            .await
            .unwrap();
        assert!(found.is_empty());
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let error = client(&server).await.latest_height().await.unwrap_err();
        assert_matches!(error, SourceError::InvalidResponse(_));
    }
}
