//! JSON-RPC client for the full node's wallet interface.
//!
//! The node is trusted as ground truth; this module only shuttles its
//! answers into typed structs. All wallet reads the resolution engine
//! needs go through the [`TransactionSource`] trait so the engine can be
//! exercised against a scripted source.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum NodeError {
    #[error("node transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("node rejected call: {code} {message}")]
    Rpc { code: i64, message: String },

    #[error("malformed node response: {0}")]
    Malformed(String),
}

/// One line of node-reported wallet activity, as returned by
/// `listsinceblock`. Block fields are absent while the transaction sits in
/// the mempool.
#[derive(Debug, Clone, Deserialize)]
pub struct RawTxEntry {
    pub txid: String,
    pub category: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub blockhash: Option<String>,
    #[serde(default)]
    pub blockheight: Option<i64>,
    #[serde(default)]
    pub blocktime: Option<i64>,
    #[serde(default)]
    pub time: Option<i64>,
}

/// One spent input of a verbose `getrawtransaction` result. Coinbase
/// inputs carry neither a previous txid nor an output index.
#[derive(Debug, Clone, Deserialize)]
pub struct DetailInput {
    #[serde(default)]
    pub txid: Option<String>,
    #[serde(default)]
    pub vout: Option<u32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScriptPubKey {
    #[serde(default)]
    pub address: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DetailOutput {
    pub value: f64,
    pub n: u32,
    #[serde(rename = "scriptPubKey")]
    pub script_pub_key: ScriptPubKey,
}

/// Verbose transaction detail from the node.
#[derive(Debug, Clone, Deserialize)]
pub struct TxDetail {
    pub txid: String,
    #[serde(default)]
    pub vin: Vec<DetailInput>,
    #[serde(default)]
    pub vout: Vec<DetailOutput>,
}

#[derive(Debug, Deserialize)]
struct ListSinceBlockResult {
    transactions: Vec<RawTxEntry>,
}

#[derive(Debug, Deserialize)]
struct BlockchainInfo {
    blocks: u64,
    headers: u64,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

/// The resolution engine's view of the node: the raw activity list plus
/// per-transaction detail. Both calls may fail with a transport or node
/// error; retry policy is the caller's concern.
#[async_trait]
pub trait TransactionSource: Send + Sync {
    async fn list_transactions(
        &self,
        block_hash: Option<&str>,
    ) -> Result<Vec<RawTxEntry>, NodeError>;

    async fn get_transaction_detail(&self, txid: &str) -> Result<TxDetail, NodeError>;

    /// Transport-level liveness probe. The default is a no-op for sources
    /// without a separate health surface.
    async fn ping(&self) -> Result<(), NodeError> {
        Ok(())
    }
}

#[derive(Clone)]
pub struct NodeClient {
    http: Client,
    url: String,
    user: String,
    password: String,
}

impl NodeClient {
    pub fn new(url: &str, user: &str, password: &str) -> Result<Self, NodeError> {
        let http = Client::builder().timeout(Duration::from_secs(90)).build()?;

        Ok(Self {
            http,
            url: url.to_string(),
            user: user.to_string(),
            password: password.to_string(),
        })
    }

    async fn call_raw(&self, method: &str, params: Value) -> Result<Value, NodeError> {
        let body = json!({
            "jsonrpc": "1.0",
            "id": "addressbridge",
            "method": method,
            "params": params,
        });

        let envelope: RpcEnvelope = self
            .http
            .post(&self.url)
            .basic_auth(&self.user, Some(&self.password))
            .json(&body)
            .send()
            .await?
            .json()
            .await?;

        if let Some(err) = envelope.error {
            return Err(NodeError::Rpc {
                code: err.code,
                message: err.message,
            });
        }

        Ok(envelope.result.unwrap_or(Value::Null))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> Result<T, NodeError> {
        let raw = self.call_raw(method, params).await?;
        serde_json::from_value(raw).map_err(|err| NodeError::Malformed(format!("{method}: {err}")))
    }

    /// Block until the node reports its chain tip at header height.
    /// Called once at startup, before the router begins serving.
    pub async fn wait_for_sync(&self) {
        loop {
            match self
                .call::<BlockchainInfo>("getblockchaininfo", json!([]))
                .await
            {
                Ok(info) if info.headers > 0 && info.blocks >= info.headers => {
                    info!("Node synced at height {}", info.blocks);
                    return;
                }
                Ok(info) => {
                    info!(
                        "Waiting for node sync: {} of {} blocks",
                        info.blocks, info.headers
                    );
                }
                Err(err) => {
                    warn!("Node not reachable yet: {}", err);
                }
            }

            tokio::time::sleep(Duration::from_secs(5)).await;
        }
    }

    /// Register watch-only addresses with the node's wallet. Best-effort:
    /// a rejected import is logged and the rest proceed.
    pub async fn import_addresses(&self, addresses: &[String]) {
        info!("Importing {} watch address(es)", addresses.len());

        for address in addresses {
            // rescan=false: historical activity is expected to already be
            // indexed by a prior import or an operator-triggered rescan.
            let params = json!([address, "addressbridge", false]);
            if let Err(err) = self.call_raw("importaddress", params).await {
                warn!("Failed to import address {}: {}", address, err);
            }
        }
    }
}

#[async_trait]
impl TransactionSource for NodeClient {
    async fn list_transactions(
        &self,
        block_hash: Option<&str>,
    ) -> Result<Vec<RawTxEntry>, NodeError> {
        let params = match block_hash {
            Some(hash) => json!([hash]),
            None => json!([]),
        };

        let result: ListSinceBlockResult = self.call("listsinceblock", params).await?;
        Ok(result.transactions)
    }

    async fn get_transaction_detail(&self, txid: &str) -> Result<TxDetail, NodeError> {
        self.call("getrawtransaction", json!([txid, true])).await
    }

    async fn ping(&self) -> Result<(), NodeError> {
        self.call::<BlockchainInfo>("getblockchaininfo", json!([]))
            .await?;
        Ok(())
    }
}
