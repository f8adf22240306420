use crate::rpc::options::RpcClientOptions;
use crate::rpc::retry::RetryPolicy;
use anyhow::{bail, Context, Result};
use std::time::Duration;

/// Runtime configuration for a [`MultichainClient`](crate::MultichainClient).
///
/// All instances must be constructed via [`ClientConfig::builder`] or [`ClientConfig::new`]
/// so invariants are validated before any consumer observes the values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    chain: String,
    host: String,
    port: u16,
    rpc_user: String,
    rpc_password: String,
    debug: bool,
    request_timeout: Option<Duration>,
    deadline: Option<Duration>,
    passes: usize,
    initial_backoff: Duration,
    max_backoff: Duration,
}

pub struct ClientConfigParams {
    pub chain: String,
    pub host: String,
    pub port: u16,
    pub rpc_user: String,
    pub rpc_password: String,
    pub debug: bool,
    pub request_timeout: Option<Duration>,
    pub deadline: Option<Duration>,
    pub passes: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl ClientConfig {
    /// Returns a builder to incrementally construct and validate a configuration.
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Constructs a configuration directly from the provided values.
    ///
    /// Prefer [`ClientConfig::builder`] when most values use defaults.
    pub fn new(params: ClientConfigParams) -> Result<Self> {
        let ClientConfigParams {
            chain,
            host,
            port,
            rpc_user,
            rpc_password,
            debug,
            request_timeout,
            deadline,
            passes,
            initial_backoff,
            max_backoff,
        } = params;

        let config = Self {
            chain: trimmed_string(chain),
            host: trimmed_string(host),
            port,
            rpc_user: trimmed_string(rpc_user),
            rpc_password,
            debug,
            request_timeout,
            deadline,
            passes,
            initial_backoff,
            max_backoff,
        };

        config.validate()?;
        Ok(config)
    }

    /// Chain name used to scope chain-level methods.
    pub fn chain(&self) -> &str {
        &self.chain
    }

    /// Host of the primary endpoint, also the domain scoped endpoints hang off.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn rpc_user(&self) -> &str {
        &self.rpc_user
    }

    pub fn rpc_password(&self) -> &str {
        &self.rpc_password
    }

    pub fn debug(&self) -> bool {
        self.debug
    }

    /// Timeout applied to each individual HTTP attempt, if any.
    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout
    }

    /// Optional bound on a whole dispatch across all endpoints.
    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    /// Number of times the endpoint list is walked per dispatch.
    pub fn passes(&self) -> usize {
        self.passes
    }

    pub fn initial_backoff(&self) -> Duration {
        self.initial_backoff
    }

    pub fn max_backoff(&self) -> Duration {
        self.max_backoff
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            passes: self.passes,
            initial_backoff: self.initial_backoff,
            max_backoff: self.max_backoff,
        }
    }

    pub fn client_options(&self) -> RpcClientOptions {
        RpcClientOptions {
            request_timeout: self.request_timeout,
            deadline: self.deadline,
            debug: self.debug,
            retry: self.retry_policy(),
        }
    }

    /// Performs validation on an existing configuration instance.
    pub fn validate(&self) -> Result<()> {
        ensure_not_empty(&self.chain, "chain")?;
        validate_host(&self.host)?;
        ensure_not_empty(&self.rpc_user, "rpc_user")?;
        if self.rpc_password.is_empty() {
            bail!("rpc_password cannot be empty");
        }

        if self.port == 0 {
            bail!("port must be greater than 0");
        }

        self.client_options().validate()
    }
}

#[derive(Debug, Default, Clone)]
pub struct ClientConfigBuilder {
    chain: Option<String>,
    host: Option<String>,
    port: Option<u16>,
    rpc_user: Option<String>,
    rpc_password: Option<String>,
    debug: Option<bool>,
    request_timeout: Option<Duration>,
    deadline: Option<Duration>,
    passes: Option<usize>,
    initial_backoff: Option<Duration>,
    max_backoff: Option<Duration>,
}

impl ClientConfigBuilder {
    pub fn chain(mut self, chain: impl Into<String>) -> Self {
        self.chain = Some(chain.into());
        self
    }

    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn rpc_user(mut self, user: impl Into<String>) -> Self {
        self.rpc_user = Some(user.into());
        self
    }

    pub fn rpc_password(mut self, password: impl Into<String>) -> Self {
        self.rpc_password = Some(password.into());
        self
    }

    pub fn debug(mut self, enabled: bool) -> Self {
        self.debug = Some(enabled);
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn passes(mut self, passes: usize) -> Self {
        self.passes = Some(passes);
        self
    }

    pub fn initial_backoff(mut self, backoff: Duration) -> Self {
        self.initial_backoff = Some(backoff);
        self
    }

    pub fn max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = Some(backoff);
        self
    }

    pub fn build(self) -> Result<ClientConfig> {
        let defaults = RetryPolicy::default();
        let params = ClientConfigParams {
            chain: self.chain.context("chain is required")?,
            host: self.host.context("host is required")?,
            port: self.port.context("port is required")?,
            rpc_user: self.rpc_user.context("rpc_user is required")?,
            rpc_password: self.rpc_password.context("rpc_password is required")?,
            debug: self.debug.unwrap_or(false),
            request_timeout: self.request_timeout,
            deadline: self.deadline,
            passes: self.passes.unwrap_or(defaults.passes),
            initial_backoff: self.initial_backoff.unwrap_or(defaults.initial_backoff),
            max_backoff: self.max_backoff.unwrap_or(defaults.max_backoff),
        };

        ClientConfig::new(params)
    }
}

fn trimmed_string(value: String) -> String {
    value.trim().to_owned()
}

fn ensure_not_empty(value: &str, field: &str) -> Result<()> {
    if value.trim().is_empty() {
        bail!("{field} cannot be empty");
    }
    Ok(())
}

fn validate_host(host: &str) -> Result<()> {
    ensure_not_empty(host, "host")?;
    if host.contains("://") {
        bail!("host must not include a scheme");
    }
    if host.chars().any(char::is_whitespace) {
        bail!("host must not contain whitespace");
    }
    Ok(())
}
