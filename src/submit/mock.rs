//! In-process stand-in for a marketplace API: records every request and
//! answers with whatever the test's responder returns.

use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::{Method, StatusCode, Uri},
    response::{IntoResponse, Response},
};
use reqwest::Client;
use serde_json::Value;
use std::{sync::Arc, time::Duration};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: Method,
    pub path: String,
    pub token: Option<String>,
    pub body: Value,
}

pub enum Reply {
    Json(StatusCode, Value),
    Text(StatusCode, String),
    /// Hold the connection open past the client timeout.
    Stall(Duration),
}

type Responder = Arc<dyn Fn(&RecordedCall, usize) -> Reply + Send + Sync>;

#[derive(Clone)]
struct MockState {
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    responder: Responder,
}

pub struct MockMarketplace {
    pub base_url: String,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
}

impl MockMarketplace {
    /// Starts the server; `responder` receives each call and its 0-based index.
    pub async fn start<F>(responder: F) -> Self
    where
        F: Fn(&RecordedCall, usize) -> Reply + Send + Sync + 'static,
    {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let state = MockState {
            calls: calls.clone(),
            responder: Arc::new(responder),
        };
        let app = Router::new().fallback(record).with_state(state);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock marketplace");
        let addr = listener.local_addr().expect("mock addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Self {
            base_url: format!("http://{addr}"),
            calls,
        }
    }

    pub async fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().await.clone()
    }
}

async fn record(
    State(state): State<MockState>,
    method: Method,
    uri: Uri,
    headers: axum::http::HeaderMap,
    body: Bytes,
) -> Response {
    let token = headers
        .get("X-Shopify-Access-Token")
        .or_else(|| headers.get(axum::http::header::AUTHORIZATION))
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    let call = RecordedCall {
        method,
        path: uri.path().to_string(),
        token,
        body: serde_json::from_slice(&body).unwrap_or(Value::Null),
    };
    let index = {
        let mut calls = state.calls.lock().await;
        calls.push(call.clone());
        calls.len() - 1
    };
    match (state.responder)(&call, index) {
        Reply::Json(status, value) => (status, Json(value)).into_response(),
        Reply::Text(status, text) => (status, text).into_response(),
        Reply::Stall(duration) => {
            tokio::time::sleep(duration).await;
            StatusCode::GATEWAY_TIMEOUT.into_response()
        }
    }
}

/// Client with a short timeout so stalled calls fail fast.
pub fn test_client() -> Client {
    Client::builder()
        .no_proxy()
        .timeout(Duration::from_millis(500))
        .build()
        .expect("test client")
}
