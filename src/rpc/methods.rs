//! Typed wrappers for frequently used `multichaind` calls.

use crate::rpc::client::MultichainClient;
use crate::rpc_params;
use anyhow::Result;
use serde::Deserialize;
use serde_json::Value;

/// Subset of the `getinfo` result that callers usually care about. Unknown
/// fields are ignored.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct NodeInfo {
    pub version: String,
    #[serde(default)]
    pub chainname: String,
    pub blocks: u64,
    #[serde(default)]
    pub connections: u64,
    #[serde(default)]
    pub nodeaddress: Option<String>,
}

impl MultichainClient {
    pub async fn get_info(&self) -> Result<NodeInfo> {
        self.call(&self.node_msg("getinfo", rpc_params![])).await
    }

    pub async fn get_blockchain_params(&self) -> Result<Value> {
        self.call(&self.node_msg("getblockchainparams", rpc_params![]))
            .await
    }

    pub async fn get_block_count(&self) -> Result<u64> {
        self.call(&self.node_msg("getblockcount", rpc_params![]))
            .await
    }

    pub async fn get_peer_info(&self) -> Result<Vec<Value>> {
        self.call(&self.node_msg("getpeerinfo", rpc_params![])).await
    }

    /// Streams visible on this client's chain; `"*"` lists all of them.
    pub async fn list_streams(&self, streams: &str, verbose: bool) -> Result<Vec<Value>> {
        self.call(&self.chain_msg("liststreams", rpc_params![streams, verbose]))
            .await
    }

    /// Wallet addresses held by the node for this client's chain.
    pub async fn get_addresses(&self) -> Result<Vec<String>> {
        self.call(&self.chain_msg("getaddresses", rpc_params![false]))
            .await
    }
}
