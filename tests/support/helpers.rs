use std::net::TcpListener;
use std::time::Duration;

use anyhow::{Context, Result};
use multichain_client::{MultichainClient, RpcClientOptions, RpcError};
use once_cell::sync::Lazy;
use tracing_subscriber::EnvFilter;

pub const TEST_CHAIN: &str = "chain1";
pub const TEST_USER: &str = "user";
pub const TEST_PASSWORD: &str = "pass";

static TRACING_SUBSCRIBER: Lazy<()> = Lazy::new(|| {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
});

pub fn init_tracing() {
    Lazy::force(&TRACING_SUBSCRIBER);
}

pub fn fast_options() -> RpcClientOptions {
    RpcClientOptions {
        request_timeout: Some(Duration::from_secs(5)),
        ..RpcClientOptions::default()
    }
}

/// Client whose endpoint list is exactly `endpoints`, in order.
pub fn client_for(endpoints: &[&str], options: RpcClientOptions) -> Result<MultichainClient> {
    let client = MultichainClient::with_options(
        TEST_CHAIN,
        "127.0.0.1",
        1,
        TEST_USER,
        TEST_PASSWORD,
        options,
    )?;
    Ok(client.with_endpoints(endpoints.iter().copied()))
}

/// Address of a local port nothing listens on, so connecting is refused.
pub fn closed_endpoint() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").context("failed to reserve a local port")?;
    let addr = listener
        .local_addr()
        .context("failed to read reserved port")?;
    drop(listener);
    Ok(format!("http://{addr}"))
}

pub fn rpc_error(err: &anyhow::Error) -> &RpcError {
    err.downcast_ref::<RpcError>()
        .unwrap_or_else(|| panic!("expected RpcError, got {err:#}"))
}
