use std::env;
use std::time::Duration;

use anyhow::{Context, Result};
use multichain_client::{ClientConfig, MultichainClient};

const DEFAULT_CHAIN: &str = "chain1";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 8570;
const DEFAULT_RPC_USER: &str = "multichainrpc";
const DEFAULT_LOG_DIRECTIVE: &str = "info";

/// Prints `getinfo` and the visible streams of a MultiChain node.
///
/// Reads `MULTICHAIN_CHAIN`, `MULTICHAIN_HOST`, `MULTICHAIN_PORT`,
/// `MULTICHAIN_RPC_USER`, `MULTICHAIN_RPC_PASSWORD`, `MULTICHAIN_NODES`
/// (comma separated numeric node ids to try instead of the primary host) and
/// `MULTICHAIN_DEBUG`.
#[tokio::main]
async fn main() -> Result<()> {
    if env::var_os("RUST_LOG").is_none() {
        env::set_var("RUST_LOG", DEFAULT_LOG_DIRECTIVE);
    }
    multichain_client::init_tracing();

    let config = ClientConfig::builder()
        .chain(env_or("MULTICHAIN_CHAIN", DEFAULT_CHAIN))
        .host(env_or("MULTICHAIN_HOST", DEFAULT_HOST))
        .port(parse_port()?)
        .rpc_user(env_or("MULTICHAIN_RPC_USER", DEFAULT_RPC_USER))
        .rpc_password(
            env::var("MULTICHAIN_RPC_PASSWORD").context("MULTICHAIN_RPC_PASSWORD is required")?,
        )
        .debug(env_flag("MULTICHAIN_DEBUG"))
        .deadline(Duration::from_secs(60))
        .build()?;

    let mut client = MultichainClient::from_config(&config)?;
    if let Some(nodes) = parse_nodes()? {
        client = client.via_nodes(&nodes);
    }

    let info = client.get_info().await?;
    println!(
        "{} running MultiChain {} at height {} with {} connections",
        info.chainname, info.version, info.blocks, info.connections
    );

    for stream in client.list_streams("*", false).await? {
        println!("stream: {}", stream["name"].as_str().unwrap_or("<unnamed>"));
    }

    let metrics = client.metrics();
    println!(
        "attempts={} failovers={} avg_latency_ms={:.2}",
        metrics.total_attempts, metrics.total_failovers, metrics.average_attempt_latency_ms
    );

    Ok(())
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_flag(key: &str) -> bool {
    env::var(key)
        .map(|value| matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn parse_port() -> Result<u16> {
    match env::var("MULTICHAIN_PORT") {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("invalid MULTICHAIN_PORT {value}")),
        Err(_) => Ok(DEFAULT_PORT),
    }
}

fn parse_nodes() -> Result<Option<Vec<u32>>> {
    let Ok(raw) = env::var("MULTICHAIN_NODES") else {
        return Ok(None);
    };
    raw.split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(|id| {
            id.parse()
                .with_context(|| format!("invalid node id {id} in MULTICHAIN_NODES"))
        })
        .collect::<Result<Vec<u32>>>()
        .map(Some)
}
