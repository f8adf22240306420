use std::{
    convert::Infallible,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use anyhow::{Context, Result};
use hyper::service::{make_service_fn, service_fn};
use hyper::{body, Body, Method, Request, Response, Server, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// What the mock node answers to one request.
#[derive(Clone, Debug)]
pub enum Behavior {
    /// `200 OK` with `{"result": value, "error": null}`.
    Result(Value),
    /// `200 OK` with an `error` object, the way `multichaind` reports
    /// rejected calls.
    RpcError { code: i64, message: String },
    /// The given status with a JSON body whose `error` is null.
    Status(StatusCode),
    /// The given status with an empty body, the way proxies and auth
    /// failures answer.
    Empty(StatusCode),
    /// The given status with a JSON body that carries no `error`.
    StatusJson(StatusCode, Value),
    /// `200 OK` with a body that is not JSON.
    Garbage,
    /// `200 OK` whose body stream breaks off after a partial JSON prefix.
    Truncated,
    /// Waits before answering with the inner behavior.
    Delay(Duration, Box<Behavior>),
}

impl Behavior {
    pub fn rpc_error(message: impl Into<String>) -> Self {
        Behavior::RpcError {
            code: -1,
            message: message.into(),
        }
    }

    pub fn delayed(delay: Duration, inner: Behavior) -> Self {
        Behavior::Delay(delay, Box::new(inner))
    }
}

#[derive(Clone, Debug)]
pub struct RecordedRequest {
    pub authorization: Option<String>,
    pub body: Value,
}

/// Behaviors are served in order; the last one repeats.
#[derive(Clone)]
struct MockNode {
    script: Arc<Vec<Behavior>>,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl MockNode {
    fn behavior_for(&self, hit: usize) -> Behavior {
        let index = hit.min(self.script.len().saturating_sub(1));
        self.script
            .get(index)
            .cloned()
            .unwrap_or(Behavior::Status(StatusCode::INTERNAL_SERVER_ERROR))
    }
}

pub struct MockRpcServer {
    url: String,
    node: MockNode,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl MockRpcServer {
    pub async fn start(behavior: Behavior) -> Result<Self> {
        Self::start_script(vec![behavior]).await
    }

    pub async fn start_script(script: Vec<Behavior>) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .context("failed to bind mock RPC listener")?;
        let addr = listener
            .local_addr()
            .context("failed to read mock listener address")?;
        let std_listener = listener
            .into_std()
            .context("failed to convert mock listener")?;
        std_listener
            .set_nonblocking(true)
            .context("failed to set mock listener non-blocking")?;

        let node = MockNode {
            script: Arc::new(script),
            hits: Arc::new(AtomicUsize::new(0)),
            requests: Arc::new(Mutex::new(Vec::new())),
        };

        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let service_node = node.clone();
        let make_service = make_service_fn(move |_| {
            let node = service_node.clone();
            async move { Ok::<_, Infallible>(service_fn(move |req| serve_request(node.clone(), req))) }
        });

        let server = Server::from_tcp(std_listener)
            .context("failed to build mock HTTP server")?
            .serve(make_service);
        let graceful = server.with_graceful_shutdown(async {
            let _ = shutdown_rx.await;
        });

        let handle = tokio::spawn(async move {
            if let Err(err) = graceful.await {
                eprintln!("mock RPC server stopped: {err}");
            }
        });

        Ok(Self {
            url: format!("http://{}", addr),
            node,
            shutdown: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Number of requests that reached this node.
    pub fn hits(&self) -> usize {
        self.node.hits.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.node
            .requests
            .lock()
            .expect("mock request log poisoned")
            .clone()
    }

    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

async fn serve_request(node: MockNode, req: Request<Body>) -> Result<Response<Body>, Infallible> {
    if req.method() != Method::POST {
        return Ok(status_response(StatusCode::METHOD_NOT_ALLOWED, "Unsupported method"));
    }

    let hit = node.hits.fetch_add(1, Ordering::SeqCst);
    let authorization = req
        .headers()
        .get(hyper::header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let bytes = match body::to_bytes(req.into_body()).await {
        Ok(bytes) => bytes,
        Err(err) => {
            return Ok(status_response(
                StatusCode::BAD_REQUEST,
                format!("failed to read body: {err}"),
            ));
        }
    };

    let payload: Value = match serde_json::from_slice(&bytes) {
        Ok(value) => value,
        Err(err) => {
            return Ok(status_response(
                StatusCode::BAD_REQUEST,
                format!("invalid JSON payload: {err}"),
            ));
        }
    };

    let id = payload.get("id").cloned().unwrap_or(Value::Null);
    node.requests
        .lock()
        .expect("mock request log poisoned")
        .push(RecordedRequest {
            authorization,
            body: payload,
        });

    let mut behavior = node.behavior_for(hit);
    while let Behavior::Delay(delay, inner) = behavior {
        tokio::time::sleep(delay).await;
        behavior = *inner;
    }

    let response = match behavior {
        Behavior::Result(result) => json_response(
            StatusCode::OK,
            json!({"result": result, "error": null, "id": id}),
        ),
        Behavior::RpcError { code, message } => json_response(
            StatusCode::OK,
            json!({"result": null, "error": {"code": code, "message": message}, "id": id}),
        ),
        Behavior::Status(status) => {
            json_response(status, json!({"result": null, "error": null, "id": id}))
        }
        Behavior::Empty(status) => status_response(status, ""),
        Behavior::StatusJson(status, value) => json_response(status, value),
        Behavior::Garbage => status_response(StatusCode::OK, "<html>not json</html>"),
        Behavior::Truncated => {
            let (mut sender, body) = Body::channel();
            tokio::spawn(async move {
                let _ = sender
                    .send_data(body::Bytes::from_static(b"{\"result\":"))
                    .await;
                sender.abort();
            });
            status_response(StatusCode::OK, body)
        }
        Behavior::Delay(..) => unreachable!("delays are unwrapped above"),
    };

    Ok(response)
}

fn json_response(status: StatusCode, value: Value) -> Response<Body> {
    let mut response = Response::new(Body::from(value.to_string()));
    *response.status_mut() = status;
    response.headers_mut().insert(
        hyper::header::CONTENT_TYPE,
        hyper::header::HeaderValue::from_static("application/json"),
    );
    response
}

fn status_response(status: StatusCode, body: impl Into<Body>) -> Response<Body> {
    let mut response = Response::new(body.into());
    *response.status_mut() = status;
    response
}
