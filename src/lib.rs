pub mod config;
pub mod rpc;
pub mod telemetry;

pub use config::{ClientConfig, ClientConfigBuilder, ClientConfigParams};
pub use rpc::{
    Credentials, Endpoint, Envelope, MultichainClient, NodeInfo, Response, RetryPolicy,
    RpcClientOptions, RpcError, RpcMetricsSnapshot, WIRE_LOG_TARGET,
};
pub use telemetry::init_tracing;

#[doc(hidden)]
pub mod __private {
    pub use serde_json;
}
