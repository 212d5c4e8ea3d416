//! In-process Knocki server for integration tests
//!
//! Serves canned REST responses, an optional WebSocket endpoint, and records
//! every request it receives.

#![allow(dead_code)]

use axum::{
    body::Body,
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Request, State,
    },
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use serde_json::Value;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const TOKENS: &str = include_str!("../fixtures/tokens.json");
pub const INVALID_AUTH: &str = include_str!("../fixtures/invalid_auth.json");
pub const TRIGGERS: &str = include_str!("../fixtures/triggers.json");

pub const TRIGGERED_EVENT: &str = r#"{"event":"actionTriggered","payload":{"device":"KNC1-W-00000214","details":{"id":31,"name":"Tap"}}}"#;
pub const CREATED_EVENT: &str = r#"{"event":"actionCreated","payload":{"device":"KNC1-W-00000214","details":{"id":33,"name":"Triple tap"}}}"#;

/// A request as seen by the mock server
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Option<Value>,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// Canned reply for one method and path
#[derive(Debug, Clone)]
pub struct MockRoute {
    method: Method,
    path: String,
    status: StatusCode,
    content_type: String,
    body: String,
    delay: Option<Duration>,
}

impl MockRoute {
    pub fn json(method: Method, path: &str, body: &str) -> Self {
        Self {
            method,
            path: path.to_string(),
            status: StatusCode::OK,
            content_type: "application/json".to_string(),
            body: body.to_string(),
            delay: None,
        }
    }

    pub fn status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    pub fn content_type(mut self, content_type: &str) -> Self {
        self.content_type = content_type.to_string();
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }
}

/// What the WebSocket endpoint does after the upgrade
#[derive(Debug, Clone, Default)]
pub struct MockSocket {
    /// Text frames sent right after the upgrade
    pub messages: Vec<String>,
    /// Send a close frame after the messages instead of waiting for the client
    pub close_after: bool,
}

#[derive(Default)]
struct MockState {
    routes: Vec<MockRoute>,
    socket: MockSocket,
    requests: Mutex<Vec<RecordedRequest>>,
    websocket_requests: Mutex<Vec<RecordedRequest>>,
}

pub struct MockServer {
    pub base_url: String,
    pub websocket_url: String,
    state: Arc<MockState>,
    handle: JoinHandle<()>,
}

impl MockServer {
    pub async fn start(routes: Vec<MockRoute>) -> Self {
        Self::start_with_socket(routes, MockSocket::default()).await
    }

    pub async fn start_with_socket(routes: Vec<MockRoute>, socket: MockSocket) -> Self {
        let state = Arc::new(MockState {
            routes,
            socket,
            ..MockState::default()
        });

        let router = Router::new()
            .route("/ws", get(websocket_handler))
            .fallback(rest_handler)
            .with_state(state.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        Self {
            base_url: format!("http://{}", addr),
            websocket_url: format!("ws://{}/ws", addr),
            state,
            handle,
        }
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state.requests.lock().unwrap().clone()
    }

    /// The single recorded REST request, failing if there were more or fewer
    pub fn only_request(&self) -> RecordedRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one request: {:?}", requests);
        requests.into_iter().next().unwrap()
    }

    pub fn websocket_requests(&self) -> Vec<RecordedRequest> {
        self.state.websocket_requests.lock().unwrap().clone()
    }
}

impl Drop for MockServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

async fn rest_handler(State(state): State<Arc<MockState>>, request: Request) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let headers = request.headers().clone();
    let bytes = axum::body::to_bytes(request.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).ok();

    state.requests.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        headers,
        body,
    });

    let Some(route) = state
        .routes
        .iter()
        .find(|r| r.method == method && r.path == path)
        .cloned()
    else {
        return StatusCode::NOT_FOUND.into_response();
    };

    if let Some(delay) = route.delay {
        tokio::time::sleep(delay).await;
    }

    Response::builder()
        .status(route.status)
        .header(header::CONTENT_TYPE, route.content_type)
        .body(Body::from(route.body))
        .unwrap()
}

async fn websocket_handler(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    state.websocket_requests.lock().unwrap().push(RecordedRequest {
        method: Method::GET,
        path: "/ws".to_string(),
        headers,
        body: None,
    });

    let socket = state.socket.clone();
    ws.on_upgrade(move |ws| serve_socket(ws, socket))
}

async fn serve_socket(mut ws: WebSocket, socket: MockSocket) {
    for message in socket.messages {
        if ws.send(Message::Text(message)).await.is_err() {
            return;
        }
    }

    if socket.close_after {
        let _ = ws.send(Message::Close(None)).await;
        return;
    }

    while let Some(Ok(message)) = ws.recv().await {
        if let Message::Close(_) = message {
            break;
        }
    }
}
