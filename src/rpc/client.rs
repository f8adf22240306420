//! RPC client implementation for MultiChain nodes. Houses the
//! `MultichainClient` dispatcher, its error type, and the outcome
//! classification that drives ordered endpoint failover.

use crate::config::ClientConfig;
use crate::rpc::auth::Credentials;
use crate::rpc::endpoint::Endpoint;
use crate::rpc::envelope::{Envelope, Response};
use crate::rpc::metrics::{RpcMetrics, RpcMetricsSnapshot};
use crate::rpc::options::RpcClientOptions;
use crate::rpc::retry::{Attempt, DispatchContext};
use anyhow::{Context, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{sleep, timeout, Instant};
use tokio_util::sync::CancellationToken;

/// Tracing target for the debug-mode request/response dumps.
pub const WIRE_LOG_TARGET: &str = "multichain_client::wire";

#[derive(Debug)]
pub enum RpcError {
    NoEndpoints,
    InvalidEndpoint {
        endpoint: String,
        reason: String,
    },
    RequestBuild {
        endpoint: String,
        reason: String,
    },
    Transport {
        endpoint: String,
        source: reqwest::Error,
    },
    BodyRead {
        endpoint: String,
        source: reqwest::Error,
    },
    Decode {
        endpoint: String,
        source: serde_json::Error,
    },
    Remote {
        method: Option<String>,
        code: Option<i64>,
        message: String,
    },
    UnexpectedStatus {
        endpoint: String,
        status: StatusCode,
    },
    DeadlineExceeded {
        method: Option<String>,
        deadline: Duration,
    },
    Cancelled {
        method: Option<String>,
    },
}

impl RpcError {
    /// Whether the dispatcher moves on to the next endpoint after this error.
    /// Only the final attempt's retryable error reaches the caller.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RpcError::Transport { .. } | RpcError::Remote { .. } | RpcError::UnexpectedStatus { .. }
        )
    }
}

impl std::fmt::Display for RpcError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RpcError::NoEndpoints => {
                write!(f, "no endpoints configured for the request dispatcher")
            }
            RpcError::InvalidEndpoint { endpoint, reason } => {
                write!(f, "invalid rpc endpoint {endpoint}: {reason}")
            }
            RpcError::RequestBuild { endpoint, reason } => {
                write!(f, "failed to build rpc request for {endpoint}: {reason}")
            }
            RpcError::Transport { endpoint, source } => {
                write!(f, "rpc transport to {endpoint} failed: {source}")
            }
            RpcError::BodyRead { endpoint, source } => {
                write!(f, "failed to read rpc response body from {endpoint}: {source}")
            }
            RpcError::Decode { endpoint, source } => {
                write!(f, "rpc response from {endpoint} is not a JSON object: {source}")
            }
            RpcError::Remote {
                method: Some(method),
                message,
                ..
            } => write!(f, "multichaind - '{method}': {message}"),
            RpcError::Remote {
                method: None,
                message,
                ..
            } => write!(f, "multichaind - {message}"),
            RpcError::UnexpectedStatus { endpoint, status } => write!(
                f,
                "rpc endpoint {endpoint} returned HTTP {status} without error detail"
            ),
            RpcError::DeadlineExceeded { method, deadline } => write!(
                f,
                "rpc {} exceeded its {}ms deadline",
                method.as_deref().unwrap_or("request"),
                deadline.as_millis()
            ),
            RpcError::Cancelled { method } => write!(
                f,
                "rpc {} was cancelled",
                method.as_deref().unwrap_or("request")
            ),
        }
    }
}

impl std::error::Error for RpcError {}

/// Dispatcher delivering one envelope at a time across an ordered list of
/// `multichaind` endpoints.
///
/// Clones are cheap and share the HTTP connection pool and metrics. Scoped
/// variants created through [`MultichainClient::via_node`] and friends share
/// them too but carry their own endpoint list.
#[derive(Debug, Clone)]
pub struct MultichainClient {
    chain: Arc<str>,
    domain: Arc<str>,
    port: u16,
    endpoints: Arc<[Endpoint]>,
    credentials: Credentials,
    http: reqwest::Client,
    options: RpcClientOptions,
    metrics: Arc<RpcMetrics>,
}

impl MultichainClient {
    pub fn new(
        chain: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        user: &str,
        password: &str,
    ) -> Result<Self> {
        Self::with_options(
            chain,
            host,
            port,
            user,
            password,
            RpcClientOptions::default(),
        )
    }

    pub fn with_options(
        chain: impl Into<String>,
        host: impl Into<String>,
        port: u16,
        user: &str,
        password: &str,
        options: RpcClientOptions,
    ) -> Result<Self> {
        options.validate()?;

        let chain: String = chain.into();
        let domain: String = host.into();
        let mut builder = reqwest::Client::builder();
        if let Some(request_timeout) = options.request_timeout {
            builder = builder.timeout(request_timeout);
        }
        let http = builder.build().context("failed to build HTTP client")?;

        Ok(Self {
            chain: chain.into(),
            endpoints: vec![Endpoint::from_host_port(&domain, port)].into(),
            domain: domain.into(),
            port,
            credentials: Credentials::new(user, password),
            http,
            options,
            metrics: Arc::new(RpcMetrics::default()),
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        config.validate()?;
        Self::with_options(
            config.chain(),
            config.host(),
            config.port(),
            config.rpc_user(),
            config.rpc_password(),
            config.client_options(),
        )
    }

    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// Host the primary endpoint was built from; scoped endpoints hang
    /// subdomains off it.
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn options(&self) -> &RpcClientOptions {
        &self.options
    }

    pub fn metrics(&self) -> RpcMetricsSnapshot {
        self.metrics.snapshot()
    }

    /// Client targeting `http://<subdomain>.<domain>:<port>` only. The
    /// address is listed twice so one transient failure gets a second try.
    pub fn via_node(&self, subdomain: &str) -> Self {
        let endpoint = Endpoint::subdomain(subdomain, &self.domain, self.port);
        self.with_endpoints([endpoint.clone(), endpoint])
    }

    /// Client targeting `http://<id>.<domain>:<port>` for each id, in order.
    pub fn via_nodes(&self, hosts: &[u32]) -> Self {
        self.with_endpoints(
            hosts
                .iter()
                .map(|host| Endpoint::subdomain(host, &self.domain, self.port)),
        )
    }

    /// Client sharing everything with `self` except the endpoint list.
    pub fn with_endpoints<I, E>(&self, endpoints: I) -> Self
    where
        I: IntoIterator<Item = E>,
        E: Into<Endpoint>,
    {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            ..self.clone()
        }
    }

    /// Envelope for a node-level method.
    pub fn node_msg(&self, method: &str, params: Vec<Value>) -> Envelope {
        let envelope = Envelope::node(method, params);
        self.log_envelope(&envelope);
        envelope
    }

    /// Envelope for a method scoped to this client's chain.
    pub fn chain_msg(&self, method: &str, params: Vec<Value>) -> Envelope {
        let envelope = Envelope::chain(&self.chain, method, params);
        self.log_envelope(&envelope);
        envelope
    }

    pub async fn dispatch(&self, envelope: &Envelope) -> Result<Response> {
        self.post(&envelope.to_value(), Some(envelope.method()), None)
            .await
    }

    /// Like [`MultichainClient::dispatch`], but `cancel` aborts the in-flight
    /// attempt and ends the dispatch without trying further endpoints.
    pub async fn dispatch_with_cancel(
        &self,
        envelope: &Envelope,
        cancel: &CancellationToken,
    ) -> Result<Response> {
        self.post(&envelope.to_value(), Some(envelope.method()), Some(cancel))
            .await
    }

    /// Dispatches an arbitrary JSON payload. The method used in error
    /// messages is read from a top-level `method` string when present.
    pub async fn dispatch_raw(&self, payload: &Value) -> Result<Response> {
        let method = payload.get("method").and_then(Value::as_str);
        self.post(payload, method, None).await
    }

    /// Dispatches `envelope` and deserializes its `result` into `T`.
    pub async fn call<T: DeserializeOwned>(&self, envelope: &Envelope) -> Result<T> {
        let response = self.dispatch(envelope).await?;
        response
            .result_as()
            .with_context(|| format!("unexpected result shape for {}", envelope.method()))
    }

    pub async fn call_node(&self, method: &str, params: Vec<Value>) -> Result<Response> {
        self.dispatch(&self.node_msg(method, params)).await
    }

    pub async fn call_chain(&self, method: &str, params: Vec<Value>) -> Result<Response> {
        self.dispatch(&self.chain_msg(method, params)).await
    }

    async fn post(
        &self,
        payload: &Value,
        method: Option<&str>,
        cancel: Option<&CancellationToken>,
    ) -> Result<Response> {
        self.metrics.record_dispatch();
        let context = DispatchContext::new(method);

        if self.options.debug {
            tracing::info!(
                target: WIRE_LOG_TARGET,
                chain = %self.chain,
                endpoints = self.endpoints.len(),
                payload = %payload,
                "sending RPC payload"
            );
        }

        match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        let err = RpcError::Cancelled { method: method.map(str::to_owned) };
                        tracing::warn!(error = %err, "RPC dispatch cancelled");
                        Err(err.into())
                    }
                    result = self.run_with_deadline(payload, context) => result,
                }
            }
            None => self.run_with_deadline(payload, context).await,
        }
    }

    async fn run_with_deadline(
        &self,
        payload: &Value,
        context: DispatchContext<'_>,
    ) -> Result<Response> {
        let Some(deadline) = self.options.deadline else {
            return self.run_attempts(payload, context).await;
        };

        match timeout(deadline, self.run_attempts(payload, context)).await {
            Ok(result) => result,
            Err(_) => {
                let err = RpcError::DeadlineExceeded {
                    method: context.method().map(str::to_owned),
                    deadline,
                };
                tracing::error!(error = %err, "RPC dispatch deadline elapsed");
                Err(err.into())
            }
        }
    }

    /// Walks the attempt plan until one endpoint succeeds, a fatal error
    /// occurs, or the final attempt fails.
    async fn run_attempts(
        &self,
        payload: &Value,
        context: DispatchContext<'_>,
    ) -> Result<Response> {
        let policy = self.options.retry;
        let mut current_pass = 0;

        for attempt in policy.plan(&self.endpoints) {
            if attempt.pass != current_pass {
                current_pass = attempt.pass;
                let backoff = policy.backoff_delay(current_pass);
                if !backoff.is_zero() {
                    context.log_backoff(current_pass, backoff);
                    sleep(backoff).await;
                }
            }

            context.log_attempt(&attempt);
            let start = Instant::now();
            let outcome = self.send_once(payload, &attempt, context).await;
            self.metrics.record_attempt(start.elapsed());

            let err = match outcome {
                Ok(response) => {
                    self.metrics.record_success();
                    context.log_success(&attempt);
                    return Ok(response);
                }
                Err(err) => err,
            };

            self.record_failure(&err);
            let retryable = err.is_retryable();
            let err = anyhow::Error::from(err);

            if !retryable {
                context.log_fatal(attempt.endpoint, &err);
                return Err(err);
            }
            if attempt.is_last {
                context.log_exhausted(&attempt, &err);
                return Err(err);
            }

            self.metrics.record_failover();
            context.log_failover(&attempt, &err);
        }

        Err(RpcError::NoEndpoints.into())
    }

    async fn send_once(
        &self,
        payload: &Value,
        attempt: &Attempt<'_>,
        context: DispatchContext<'_>,
    ) -> Result<Response, RpcError> {
        let endpoint = attempt.endpoint;
        let url = endpoint.url()?;
        let authorization =
            self.credentials
                .header_value()
                .map_err(|err| RpcError::RequestBuild {
                    endpoint: endpoint.to_string(),
                    reason: format!("{err:#}"),
                })?;

        let request = self
            .http
            .post(url)
            .header(AUTHORIZATION, authorization)
            .json(payload)
            .build()
            .map_err(|err| RpcError::RequestBuild {
                endpoint: endpoint.to_string(),
                reason: err.to_string(),
            })?;

        let response = self
            .http
            .execute(request)
            .await
            .map_err(|source| RpcError::Transport {
                endpoint: endpoint.to_string(),
                source,
            })?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|source| RpcError::BodyRead {
                endpoint: endpoint.to_string(),
                source,
            })?;

        if self.options.debug {
            tracing::info!(
                target: WIRE_LOG_TARGET,
                endpoint = %endpoint,
                status = status.as_u16(),
                body = %String::from_utf8_lossy(&body),
                "received RPC response body"
            );
        }

        classify_response(endpoint, status, &body, context.method())
    }

    fn record_failure(&self, err: &RpcError) {
        match err {
            RpcError::Transport { .. } => self.metrics.record_transport_error(),
            RpcError::Remote { .. } => self.metrics.record_remote_error(),
            RpcError::UnexpectedStatus { .. } => self.metrics.record_status_error(),
            RpcError::InvalidEndpoint { .. }
            | RpcError::RequestBuild { .. }
            | RpcError::BodyRead { .. }
            | RpcError::Decode { .. } => self.metrics.record_fatal_error(),
            RpcError::NoEndpoints
            | RpcError::DeadlineExceeded { .. }
            | RpcError::Cancelled { .. } => {}
        }
    }

    fn log_envelope(&self, envelope: &Envelope) {
        if self.options.debug {
            tracing::info!(
                target: WIRE_LOG_TARGET,
                envelope = %envelope.to_value(),
                "built RPC envelope"
            );
        }
    }
}

/// Maps one HTTP exchange to a dispatch outcome.
///
/// A body that is not a JSON object is a decode error whatever the status.
/// Otherwise an `error` member wins over the status code.
pub(crate) fn classify_response(
    endpoint: &Endpoint,
    status: StatusCode,
    body: &[u8],
    method: Option<&str>,
) -> Result<Response, RpcError> {
    let object = match serde_json::from_slice::<Map<String, Value>>(body) {
        Ok(object) => object,
        Err(source) => {
            return Err(RpcError::Decode {
                endpoint: endpoint.to_string(),
                source,
            });
        }
    };

    if let Some(error) = object.get("error").filter(|error| !error.is_null()) {
        return Err(remote_error(method, error));
    }

    if status != StatusCode::OK {
        return Err(RpcError::UnexpectedStatus {
            endpoint: endpoint.to_string(),
            status,
        });
    }

    Ok(Response::new(object))
}

fn remote_error(method: Option<&str>, error: &Value) -> RpcError {
    let message = error
        .get("message")
        .and_then(Value::as_str)
        .or_else(|| error.as_str())
        .map(str::to_owned)
        .unwrap_or_else(|| error.to_string());

    RpcError::Remote {
        method: method.map(str::to_owned),
        code: error.get("code").and_then(Value::as_i64),
        message,
    }
}
