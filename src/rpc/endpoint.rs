//! Candidate node addresses and the formatting rules used when a client is
//! narrowed to specific nodes behind a shared domain.

use crate::rpc::RpcError;
use reqwest::Url;
use std::fmt;
use std::sync::Arc;

/// One candidate server address (`scheme://host:port`).
///
/// The address is kept as text and only parsed when a request is built, so
/// a malformed endpoint fails that attempt rather than client construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint(Arc<str>);

impl Endpoint {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into().into())
    }

    pub fn from_host_port(host: &str, port: u16) -> Self {
        Self::new(format!("http://{host}:{port}"))
    }

    /// `http://<subdomain>.<domain>:<port>`
    pub fn subdomain(subdomain: impl fmt::Display, domain: &str, port: u16) -> Self {
        Self::new(format!("http://{subdomain}.{domain}:{port}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub(crate) fn url(&self) -> Result<Url, RpcError> {
        let url = Url::parse(&self.0).map_err(|err| RpcError::InvalidEndpoint {
            endpoint: self.to_string(),
            reason: err.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(RpcError::InvalidEndpoint {
                endpoint: self.to_string(),
                reason: format!("unsupported scheme {}", url.scheme()),
            });
        }
        Ok(url)
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Endpoint {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for Endpoint {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}
