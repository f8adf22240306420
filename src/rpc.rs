//! JSON-RPC client plumbing: envelopes, authentication, endpoints, the
//! failover dispatcher, retry policy, metrics, and typed method helpers.

pub mod auth;
pub mod client;
pub mod endpoint;
pub mod envelope;
pub mod methods;
pub mod metrics;
pub mod options;
pub mod retry;

pub use auth::Credentials;
pub use client::{MultichainClient, RpcError, WIRE_LOG_TARGET};
pub use endpoint::Endpoint;
pub use envelope::{Envelope, Response};
pub use methods::NodeInfo;
pub use metrics::RpcMetricsSnapshot;
pub use options::RpcClientOptions;
pub use retry::RetryPolicy;
