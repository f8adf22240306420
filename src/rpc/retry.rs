//! Retry policy layered over the endpoint list, the attempt plan it expands
//! into, and the logging helpers the dispatcher uses so every failover and
//! terminal outcome is reported with the same fields.

use crate::rpc::endpoint::Endpoint;
use anyhow::{bail, Error, Result};
use std::time::Duration;

const DEFAULT_PASSES: usize = 1;
const DEFAULT_MAX_BACKOFF_MS: u64 = 2_000;

macro_rules! log_with_dispatch_ctx {
    ($level:ident, $ctx:expr, $($rest:tt)*) => {{
        if let Some(method) = $ctx.method {
            tracing::$level!(method = method, $($rest)*);
        } else {
            tracing::$level!($($rest)*);
        }
    }};
}

/// How many times the endpoint list is walked and how long to wait between
/// walks. The endpoint list decides *where* to send; this decides *how often*.
///
/// The default is a single pass with no delay, i.e. each endpoint is tried
/// exactly once in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub passes: usize,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            passes: DEFAULT_PASSES,
            initial_backoff: Duration::ZERO,
            max_backoff: Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
        }
    }
}

impl RetryPolicy {
    /// A policy walking the endpoint list `passes` times without delay.
    pub fn passes(passes: usize) -> Self {
        Self {
            passes,
            ..Self::default()
        }
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.passes == 0 {
            bail!("passes must be greater than 0");
        }
        if self.initial_backoff > self.max_backoff {
            bail!("initial_backoff must not exceed max_backoff");
        }
        Ok(())
    }

    /// Delay before starting `pass` (1-based for every pass after the first).
    pub fn backoff_delay(&self, pass: usize) -> Duration {
        if pass == 0 || self.initial_backoff.is_zero() {
            return Duration::ZERO;
        }

        let exponent = pass.saturating_sub(1) as u32;
        let multiplier = 1u32.checked_shl(exponent).unwrap_or(u32::MAX);
        let delay = self.initial_backoff.saturating_mul(multiplier);

        delay.min(self.max_backoff)
    }

    pub(crate) fn plan<'a>(&self, endpoints: &'a [Endpoint]) -> AttemptPlan<'a> {
        AttemptPlan {
            endpoints,
            passes: if endpoints.is_empty() { 0 } else { self.passes },
            next: 0,
        }
    }
}

/// One scheduled request against one endpoint.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Attempt<'a> {
    /// 1-based attempt counter across the whole dispatch.
    pub(crate) number: usize,
    pub(crate) pass: usize,
    pub(crate) endpoint: &'a Endpoint,
    /// Whether this attempt's failure is surfaced to the caller.
    pub(crate) is_last: bool,
}

/// Ordered attempts: every endpoint of pass 0, then every endpoint of
/// pass 1, and so on.
pub(crate) struct AttemptPlan<'a> {
    endpoints: &'a [Endpoint],
    passes: usize,
    next: usize,
}

impl<'a> Iterator for AttemptPlan<'a> {
    type Item = Attempt<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let total = self.endpoints.len().saturating_mul(self.passes);
        if self.next >= total {
            return None;
        }

        let index = self.next;
        self.next += 1;

        Some(Attempt {
            number: index + 1,
            pass: index / self.endpoints.len(),
            endpoint: &self.endpoints[index % self.endpoints.len()],
            is_last: self.next == total,
        })
    }
}

/// Carries the method label (when one could be derived from the payload)
/// into every log line emitted by a dispatch.
#[derive(Clone, Copy)]
pub(crate) struct DispatchContext<'a> {
    method: Option<&'a str>,
}

impl<'a> DispatchContext<'a> {
    pub(crate) fn new(method: Option<&'a str>) -> Self {
        Self { method }
    }

    pub(crate) fn method(&self) -> Option<&'a str> {
        self.method
    }

    pub(crate) fn log_attempt(&self, attempt: &Attempt<'_>) {
        log_with_dispatch_ctx!(
            trace,
            self,
            attempt = attempt.number,
            pass = attempt.pass,
            endpoint = %attempt.endpoint,
            "dispatching RPC request"
        );
    }

    pub(crate) fn log_success(&self, attempt: &Attempt<'_>) {
        log_with_dispatch_ctx!(
            debug,
            self,
            attempt = attempt.number,
            endpoint = %attempt.endpoint,
            "RPC request completed successfully"
        );
    }

    pub(crate) fn log_failover(&self, attempt: &Attempt<'_>, err: &Error) {
        log_with_dispatch_ctx!(
            warn,
            self,
            attempt = attempt.number,
            pass = attempt.pass,
            endpoint = %attempt.endpoint,
            error = %err,
            "RPC endpoint failed; trying next endpoint"
        );
    }

    pub(crate) fn log_backoff(&self, pass: usize, backoff: Duration) {
        let backoff_ms = backoff.as_millis().min(u128::from(u64::MAX)) as u64;
        log_with_dispatch_ctx!(
            debug,
            self,
            pass,
            backoff_ms,
            "endpoint list exhausted; starting next pass"
        );
    }

    pub(crate) fn log_exhausted(&self, attempt: &Attempt<'_>, err: &Error) {
        log_with_dispatch_ctx!(
            error,
            self,
            attempt = attempt.number,
            endpoint = %attempt.endpoint,
            error = %err,
            "RPC request failed on final endpoint"
        );
    }

    pub(crate) fn log_fatal(&self, endpoint: &Endpoint, err: &Error) {
        log_with_dispatch_ctx!(
            error,
            self,
            endpoint = %endpoint,
            error = %err,
            "RPC request aborted without failover"
        );
    }
}
