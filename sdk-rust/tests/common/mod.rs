#![allow(dead_code)]

use axum::{
    body::to_bytes,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json, Router,
};
use serde_json::Value;
use std::{
    collections::VecDeque,
    error::Error,
    sync::{Arc, Mutex},
};
use tokio::{net::TcpListener, sync::oneshot, task::JoinHandle};

pub type BoxedError = Box<dyn Error + Send + Sync>;

/// One request as seen by the stub.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    /// Path and query.
    pub uri: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

#[derive(Default)]
struct StubState {
    responses: VecDeque<(StatusCode, Value)>,
    requests: Vec<RecordedRequest>,
}

/// A local HTTP server that answers every route with queued JSON responses.
pub struct StubServer {
    url: String,
    state: Arc<Mutex<StubState>>,
    shutdown: Option<oneshot::Sender<()>>,
    handle: JoinHandle<()>,
}

impl StubServer {
    pub async fn start() -> Result<Self, BoxedError> {
        let state = Arc::new(Mutex::new(StubState::default()));
        let app = Router::new()
            .fallback(handle_request)
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let url = format!("http://{}", listener.local_addr()?);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            });
            if let Err(err) = server.await {
                eprintln!("stub server error: {err}");
            }
        });

        Ok(Self {
            url,
            state,
            shutdown: Some(shutdown_tx),
            handle,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn respond(&self, status: StatusCode, body: Value) -> &Self {
        self.state
            .lock()
            .unwrap()
            .responses
            .push_back((status, body));
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.lock().unwrap().requests.clone()
    }

    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        let _ = (&mut self.handle).await;
    }
}

async fn handle_request(State(state): State<Arc<Mutex<StubState>>>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let bytes = to_bytes(body, usize::MAX)
        .await
        .unwrap_or_default();
    let body = serde_json::from_slice(&bytes).ok();

    let recorded = RecordedRequest {
        method: parts.method.to_string(),
        uri: parts.uri.to_string(),
        headers: parts
            .headers
            .iter()
            .map(|(key, value)| {
                (
                    key.to_string(),
                    value.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect(),
        body,
    };

    let mut state = state.lock().unwrap();
    state.requests.push(recorded);
    match state.responses.pop_front() {
        Some((status, body)) => (status, Json(body)).into_response(),
        None => (StatusCode::NOT_IMPLEMENTED, "no queued response").into_response(),
    }
}
