//! Test server management

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, Method, StatusCode, Uri},
    response::Response,
    Router,
};
use parking_lot::Mutex;
use sqslite_core::{Credentials, Params, Region};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread::JoinHandle;
use thiserror::Error;
use tokio::sync::oneshot;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::handlers::{handle_request, ServerState};
use crate::storage::SqsStorage;

/// Access key the test server accepts by default
pub const TEST_ACCESS_KEY: &str = "AKIDTEST";
/// Secret key the test server accepts by default
pub const TEST_SECRET_KEY: &str = "test-secret-key";

/// Errors that can occur with the test server
#[derive(Error, Debug)]
pub enum TestError {
    #[error("Failed to bind test server: {0}")]
    Bind(#[from] std::io::Error),
}

/// Build the query API router over shared state
pub fn router(state: Arc<ServerState>) -> Router {
    Router::new()
        .fallback(handle_request)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// A router served from its own thread and runtime
struct Running {
    addr: SocketAddr,
    shutdown: Option<oneshot::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

fn bind() -> Result<std::net::TcpListener, TestError> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    listener.set_nonblocking(true)?;
    Ok(listener)
}

impl Running {
    fn spawn(listener: std::net::TcpListener, router: Router) -> Result<Self, TestError> {
        let addr = listener.local_addr()?;

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let (shutdown, signal) = oneshot::channel::<()>();

        let thread = std::thread::spawn(move || {
            runtime.block_on(async move {
                let listener = match tokio::net::TcpListener::from_std(listener) {
                    Ok(listener) => listener,
                    Err(e) => {
                        warn!(error = %e, "Test server listener failed");
                        return;
                    }
                };
                let serve = axum::serve(listener, router).with_graceful_shutdown(async {
                    let _ = signal.await;
                });
                if let Err(e) = serve.await {
                    warn!(error = %e, "Test server stopped with error");
                }
            });
        });

        info!(%addr, "Test server listening");
        Ok(Self {
            addr,
            shutdown: Some(shutdown),
            thread: Some(thread),
        })
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

/// An in-process queue service that checks request signatures
///
/// The server runs until it is dropped.
pub struct TestServer {
    running: Running,
    base_url: String,
    state: Arc<ServerState>,
}

impl TestServer {
    /// Start a server accepting [`TEST_ACCESS_KEY`] and [`TEST_SECRET_KEY`]
    pub fn start() -> Result<Self, TestError> {
        Self::start_with_credentials(Credentials::new(TEST_ACCESS_KEY, TEST_SECRET_KEY))
    }

    /// Start a server accepting a single key pair
    pub fn start_with_credentials(credentials: Credentials) -> Result<Self, TestError> {
        // Queue URLs carry the port, so bind before building the storage
        let listener = bind()?;
        let port = listener.local_addr()?.port();

        let base_url = format!("http://127.0.0.1:{}", port);
        let state = Arc::new(ServerState {
            storage: SqsStorage::new(base_url.clone()),
            credentials,
        });

        let running = Running::spawn(listener, router(state.clone()))?;
        Ok(Self {
            running,
            base_url,
            state,
        })
    }

    /// Get the base URL
    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Get the port
    pub fn port(&self) -> u16 {
        self.running.addr.port()
    }

    /// A region whose endpoint points at this server
    pub fn region(&self) -> Region {
        Region::new("local", self.base_url.clone())
    }

    /// The key pair the server accepts
    pub fn credentials(&self) -> Credentials {
        self.state.credentials.clone()
    }

    /// Direct access to the queues, for assertions
    pub fn storage(&self) -> &SqsStorage {
        &self.state.storage
    }
}

/// A request seen by a [`StubServer`]
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub content_type: Option<String>,
    /// Query string parameters for GET, form body parameters for POST
    pub params: Params,
}

#[derive(Debug)]
struct CannedResponse {
    action: String,
    status: StatusCode,
    body: String,
}

#[derive(Debug)]
struct StubState {
    responses: Vec<CannedResponse>,
    requests: Mutex<Vec<RecordedRequest>>,
}

/// A server that answers with canned responses and records what it receives
pub struct StubServer {
    running: Running,
    state: Arc<StubState>,
}

impl StubServer {
    /// Answer every request with the same response
    pub fn start(status: u16, body: &str) -> Result<Self, TestError> {
        Self::with_responses(&[("*", status, body)])
    }

    /// Answer each `(action, status, body)` entry's action with its response
    ///
    /// The first matching entry wins; `*` matches any action. Requests that
    /// match nothing get an empty 400. A 3xx status is sent with
    /// `Location: /`.
    pub fn with_responses(responses: &[(&str, u16, &str)]) -> Result<Self, TestError> {
        let state = Arc::new(StubState {
            responses: responses
                .iter()
                .map(|(action, status, body)| CannedResponse {
                    action: action.to_string(),
                    status: StatusCode::from_u16(*status)
                        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
                    body: body.to_string(),
                })
                .collect(),
            requests: Mutex::new(Vec::new()),
        });

        let router = Router::new()
            .fallback(stub_handler)
            .with_state(state.clone());
        let running = Running::spawn(bind()?, router)?;
        Ok(Self { running, state })
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.running.addr)
    }

    pub fn region(&self) -> Region {
        Region::new("stub", self.url())
    }

    /// Requests received so far, oldest first
    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().clone()
    }
}

async fn stub_handler(
    State(state): State<Arc<StubState>>,
    method: Method,
    uri: Uri,
    headers: axum::http::HeaderMap,
    body: Bytes,
) -> Response {
    let params = if method == Method::POST {
        Params::from_form(&body)
    } else {
        Params::from_form(uri.query().unwrap_or_default().as_bytes())
    };

    let action = params.get("Action").unwrap_or_default();
    let canned = state
        .responses
        .iter()
        .find(|r| r.action == "*" || r.action == action);
    let (status, body) = match canned {
        Some(r) => (r.status, r.body.clone()),
        None => (StatusCode::BAD_REQUEST, String::new()),
    };

    state.requests.lock().push(RecordedRequest {
        method: method.to_string(),
        path: uri.path().to_string(),
        content_type: headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string),
        params,
    });

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/xml"));
    if status.is_redirection() {
        response
            .headers_mut()
            .insert(header::LOCATION, header::HeaderValue::from_static("/"));
    }
    response
}
