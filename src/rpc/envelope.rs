//! JSON-RPC envelope construction and the decoded response wrapper.
//!
//! MultiChain speaks JSON-RPC 1.0 with a fixed request id. Node-level calls
//! use the method name verbatim while chain-level calls are prefixed with the
//! chain name, e.g. `"mychain getinfo"`.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};

pub const JSONRPC_VERSION: &str = "1.0";
pub const REQUEST_ID: &str = "multichain-client";

static NULL: Value = Value::Null;

/// Builds a `Vec<serde_json::Value>` parameter list from heterogeneous
/// expressions, each passed through `serde_json::json!`.
#[macro_export]
macro_rules! rpc_params {
    () => {
        ::std::vec::Vec::<$crate::__private::serde_json::Value>::new()
    };
    ($($param:expr),+ $(,)?) => {
        ::std::vec![$($crate::__private::serde_json::json!($param)),+]
    };
}

/// A single JSON-RPC request object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Envelope {
    jsonrpc: &'static str,
    id: &'static str,
    method: String,
    params: Vec<Value>,
}

impl Envelope {
    /// Envelope for a node-level call; `method` is sent as given.
    pub fn node(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: REQUEST_ID,
            method: method.into(),
            params,
        }
    }

    /// Envelope for a call routed to `chain`.
    pub fn chain(chain: &str, method: &str, params: Vec<Value>) -> Self {
        Self::node(format!("{chain} {method}"), params)
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn to_value(&self) -> Value {
        serde_json::json!({
            "jsonrpc": self.jsonrpc,
            "id": self.id,
            "method": self.method,
            "params": self.params,
        })
    }
}

/// Decoded JSON object returned by a node.
#[derive(Debug, Clone, PartialEq)]
pub struct Response(Map<String, Value>);

impl Response {
    pub(crate) fn new(body: Map<String, Value>) -> Self {
        Self(body)
    }

    /// The `result` payload, or `Value::Null` when absent.
    pub fn result(&self) -> &Value {
        self.0.get("result").unwrap_or(&NULL)
    }

    /// Deserializes the `result` payload into `T`.
    pub fn result_as<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_value(self.result().clone())
            .context("failed to deserialize RPC result payload")
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}
