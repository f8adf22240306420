use std::io;
use std::sync::{Arc, Mutex};

use crate::support::{
    helpers::{client_for, fast_options},
    mock_rpc::{Behavior, MockRpcServer},
};
use anyhow::Result;
use multichain_client::{rpc_params, RpcClientOptions, WIRE_LOG_TARGET};
use serde_json::json;
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

/// In-memory sink for formatted log lines.
#[derive(Clone, Default)]
struct CapturedLog(Arc<Mutex<Vec<u8>>>);

impl CapturedLog {
    fn contents(&self) -> String {
        let buffer = self.0.lock().expect("log buffer poisoned");
        String::from_utf8_lossy(&buffer).into_owned()
    }
}

impl io::Write for CapturedLog {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .expect("log buffer poisoned")
            .extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for CapturedLog {
    type Writer = CapturedLog;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Runs one `getinfo` dispatch against a node answering `marker` and returns
/// everything logged under the wire target on this thread.
async fn wire_output(debug: bool, marker: &str) -> Result<String> {
    let server = MockRpcServer::start(Behavior::Result(json!(marker))).await?;
    let log = CapturedLog::default();
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(format!("{WIRE_LOG_TARGET}=info")))
        .with_writer(log.clone())
        .with_ansi(false)
        .finish();

    {
        let _guard = tracing::subscriber::set_default(subscriber);
        let options = RpcClientOptions {
            debug,
            ..fast_options()
        };
        let client = client_for(&[server.url()], options)?;
        let envelope = client.node_msg("getinfo", rpc_params!["wire-param"]);
        let response = client.dispatch(&envelope).await?;
        assert_eq!(response.result(), &json!(marker));
    }

    server.shutdown().await;
    Ok(log.contents())
}

#[tokio::test]
async fn debug_mode_logs_envelope_and_raw_body() -> Result<()> {
    let output = wire_output(true, "wire-marker-on").await?;

    assert!(output.contains(WIRE_LOG_TARGET), "output: {output}");
    assert!(output.contains("built RPC envelope"), "output: {output}");
    assert!(output.contains("sending RPC payload"), "output: {output}");
    assert!(output.contains(r#""method":"getinfo""#), "output: {output}");
    assert!(output.contains("wire-param"), "output: {output}");
    assert!(output.contains("received RPC response body"), "output: {output}");
    assert!(output.contains("wire-marker-on"), "output: {output}");
    Ok(())
}

#[tokio::test]
async fn wire_log_is_silent_without_debug() -> Result<()> {
    let output = wire_output(false, "wire-marker-off").await?;

    assert!(output.is_empty(), "unexpected wire output: {output}");
    Ok(())
}
