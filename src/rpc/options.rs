//! Configurable knobs for the RPC client along with validation helpers so
//! callers can reason about per-attempt timeouts, the overall deadline, and
//! the retry policy layered over the endpoint list.

use crate::rpc::retry::RetryPolicy;
use anyhow::{bail, Result};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpcClientOptions {
    /// Bounds a single HTTP attempt. Expiry counts as a transport failure,
    /// so the request may be re-sent elsewhere. `None` leaves attempts
    /// unbounded.
    pub request_timeout: Option<Duration>,
    /// Bounds a whole dispatch across every endpoint. `None` means unbounded.
    pub deadline: Option<Duration>,
    /// Dumps outgoing envelopes and raw response bodies to the wire log.
    pub debug: bool,
    pub retry: RetryPolicy,
}

impl Default for RpcClientOptions {
    fn default() -> Self {
        Self {
            request_timeout: None,
            deadline: None,
            debug: false,
            retry: RetryPolicy::default(),
        }
    }
}

impl RpcClientOptions {
    pub(crate) fn validate(&self) -> Result<()> {
        if matches!(self.request_timeout, Some(timeout) if timeout.is_zero()) {
            bail!("request_timeout must be greater than 0 when set");
        }
        if matches!(self.deadline, Some(deadline) if deadline.is_zero()) {
            bail!("deadline must be greater than 0 when set");
        }
        self.retry.validate()
    }
}
