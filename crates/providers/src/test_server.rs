//! A scripted local HTTP server for exercising vendor clients.

use axum::Router;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use std::sync::{Arc, Mutex};

/// One request as the server saw it.
#[derive(Debug, Clone)]
pub struct Captured {
    pub headers: HeaderMap,
    pub body: serde_json::Value,
}

struct Script {
    responses: Vec<(u16, String)>,
    hits: Mutex<Vec<Captured>>,
}

pub struct MockServer {
    pub base_url: String,
    script: Arc<Script>,
}

impl MockServer {
    /// Serve `path`, answering the n-th request with `responses[n]` (the last
    /// entry repeats).
    pub async fn start(path: &str, responses: Vec<(u16, &str)>) -> Self {
        let script = Arc::new(Script {
            responses: responses.into_iter().map(|(s, b)| (s, b.to_string())).collect(),
            hits: Mutex::new(Vec::new()),
        });

        let app = Router::new().route(path, post(handle)).with_state(script.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            base_url: format!("http://{addr}"),
            script,
        }
    }

    pub fn hits(&self) -> Vec<Captured> {
        self.script.hits.lock().unwrap().clone()
    }
}

async fn handle(State(script): State<Arc<Script>>, headers: HeaderMap, body: Bytes) -> (StatusCode, String) {
    let mut hits = script.hits.lock().unwrap();
    let index = hits.len().min(script.responses.len() - 1);
    hits.push(Captured {
        headers,
        body: serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null),
    });
    let (status, body) = script.responses[index].clone();
    (StatusCode::from_u16(status).unwrap(), body)
}
