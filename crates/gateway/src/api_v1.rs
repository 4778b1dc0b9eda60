//! HTTP API v1, the connector's REST surface.
//!
//! Endpoints (all under `/v1/connector`):
//!
//! - `POST|PUT /query`          Ask through the routed provider
//! - `POST /query/stream`       Same, answered as an SSE stream of `chunk` events
//! - `POST /file`               Multipart prompt + file, file sent base64-encoded
//! - `POST /training/enqueue`   Queue a training message
//! - `GET  /providers`          Provider catalog
//! - `GET  /events`             SSE stream of connector events
//! - `GET  /health`             Liveness (never needs the api key)
//!
//! Routing keys travel as headers: `X-Data-Type` and `X-Data-Characteristic`
//! are required, `X-Module-Key` and `X-Profile-Id` are optional.

use axum::{
    Router,
    extract::rejection::JsonRejection,
    extract::{Multipart, State},
    http::{HeaderMap, StatusCode},
    middleware,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    response::{IntoResponse, Json, Response},
    routing::{get, post},
};
use base64::Engine as _;
use serde::Serialize;
use std::convert::Infallible;
use tokio_stream::StreamExt;
use tracing::{error, info};

use connector_core::error::Error;
use connector_core::inference::{InferenceRequest, InferenceResponse, RoutingKeys};
use connector_core::provider::ProviderInfo;
use connector_core::training::TrainingMessage;

use crate::SharedState;

pub const DATA_TYPE_HEADER: &str = "X-Data-Type";
pub const CHARACTERISTIC_HEADER: &str = "X-Data-Characteristic";
pub const MODULE_KEY_HEADER: &str = "X-Module-Key";
pub const PROFILE_ID_HEADER: &str = "X-Profile-Id";

// ── Router ────────────────────────────────────────────────────────────────

/// Build the connector router. Nest this under "/v1/connector".
pub fn connector_router(state: SharedState) -> Router {
    Router::new()
        .route("/query", post(query_handler).put(query_handler))
        .route("/query/stream", post(query_stream_handler))
        .route("/file", post(file_handler))
        .route("/training/enqueue", post(enqueue_handler))
        .route("/providers", get(providers_handler))
        .route("/events", get(events_handler))
        .route_layer(middleware::from_fn_with_state(state.clone(), crate::auth_middleware))
        .route("/health", get(health_handler))
        .with_state(state)
}

// ── Errors ────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

/// Maps connector errors to `400` (caller's fault) or `500`.
pub struct ApiError(Error);

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        Self(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self(Error::Validation(format!("Invalid request body: {}", rejection.body_text())))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = if self.0.is_client_error() {
            StatusCode::BAD_REQUEST
        } else {
            error!(error = %self.0, "Request failed");
            StatusCode::INTERNAL_SERVER_ERROR
        };
        (status, Json(ErrorResponse { error: self.0.to_string() })).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

// ── Header parsing ────────────────────────────────────────────────────────

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
}

fn require_header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, Error> {
    header(headers, name).ok_or_else(|| Error::Validation(format!("Missing required header: {name}")))
}

fn routing_keys(headers: &HeaderMap) -> Result<RoutingKeys, Error> {
    let mut keys = RoutingKeys::new(
        require_header(headers, DATA_TYPE_HEADER)?,
        require_header(headers, CHARACTERISTIC_HEADER)?,
    );
    if let Some(module) = header(headers, MODULE_KEY_HEADER) {
        keys = keys.module(module);
    }
    if let Some(profile) = header(headers, PROFILE_ID_HEADER) {
        keys = keys.profile(profile);
    }
    Ok(keys)
}

// ── Handlers ──────────────────────────────────────────────────────────────

async fn query_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<InferenceRequest>, JsonRejection>,
) -> ApiResult<Json<InferenceResponse>> {
    let keys = routing_keys(&headers)?;
    let Json(request) = payload?;
    info!(data_type = %keys.data_type, characteristic = %keys.characteristic, "query request");

    let response = state.orchestrator.ask(&request, &keys).await?;
    Ok(Json(response))
}

/// `POST /query/stream`: one SSE `chunk` event per provider chunk. A failed
/// chunk is sent as an `error` event.
async fn query_stream_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    payload: Result<Json<InferenceRequest>, JsonRejection>,
) -> ApiResult<Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>>> {
    let keys = routing_keys(&headers)?;
    let Json(request) = payload?;
    info!(data_type = %keys.data_type, characteristic = %keys.characteristic, "query/stream request");

    let chunks = state.orchestrator.ask_stream(&request, &keys).await?;
    let stream = chunks.map(|chunk| {
        Ok(match chunk {
            Ok(text) => SseEvent::default().event("chunk").data(text),
            Err(e) => SseEvent::default().event("error").data(e.to_string()),
        })
    });

    Ok(Sse::new(stream))
}

/// `POST /file`: multipart form with a `prompt` text part and a `file` part.
async fn file_handler(
    State(state): State<SharedState>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> ApiResult<Json<InferenceResponse>> {
    let keys = routing_keys(&headers)?;

    let mut prompt = String::new();
    let mut file: Option<Vec<u8>> = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("Invalid multipart body: {e}")))?
    {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("prompt") => {
                prompt = field
                    .text()
                    .await
                    .map_err(|e| Error::Validation(format!("Invalid prompt part: {e}")))?;
            }
            Some("file") => {
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| Error::Validation(format!("Invalid file part: {e}")))?;
                file = Some(bytes.to_vec());
            }
            _ => {}
        }
    }
    let file = file.ok_or_else(|| Error::Validation("Multipart body has no file part".into()))?;

    info!(bytes = file.len(), "file request");
    let request = InferenceRequest::new(file_prompt(&prompt, &file)).with_metadata("source", "multipart-file");
    let response = state.orchestrator.ask(&request, &keys).await?;
    Ok(Json(response))
}

/// The prompt sent for an uploaded file.
pub fn file_prompt(prompt: &str, file: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(file);
    format!("Analyse the attached file (base64) together with the prompt.\nPrompt: {prompt}\nFileBase64: {encoded}\n")
}

#[derive(Serialize)]
struct StatusResponse {
    status: &'static str,
}

async fn enqueue_handler(
    State(state): State<SharedState>,
    payload: Result<Json<TrainingMessage>, JsonRejection>,
) -> ApiResult<Json<StatusResponse>> {
    let Json(message) = payload?;
    state.training.enqueue(&message).await?;
    Ok(Json(StatusResponse { status: "queued" }))
}

#[derive(Serialize)]
struct ProviderListResponse {
    providers: Vec<ProviderInfo>,
}

async fn providers_handler(State(state): State<SharedState>) -> Json<ProviderListResponse> {
    Json(ProviderListResponse {
        providers: state.orchestrator.list_providers(),
    })
}

/// `GET /events`: every event published after the client connects. Slow
/// clients that lag behind the bus skip the events they missed.
async fn events_handler(
    State(state): State<SharedState>,
) -> Sse<impl futures::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.events.subscribe();
    let stream = tokio_stream::wrappers::BroadcastStream::new(rx)
        .filter_map(|result| result.ok())
        .map(|event| {
            let data = serde_json::to_string(event.as_ref()).unwrap_or_default();
            Ok(SseEvent::default().event(event.event_type.as_str()).data(data))
        });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

async fn health_handler() -> Json<StatusResponse> {
    Json(StatusResponse { status: "ok" })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GatewayState;
    use axum::body::Body;
    use axum::http::Request;
    use connector_core::error::ProviderError;
    use connector_core::event::{ConnectorEvent, EventBus, EventPublisher, EventType};
    use connector_core::provider::{ProviderClient, ProviderPayload};
    use connector_core::route::{RouteConfig, RouteRule};
    use connector_engine::{InferenceOrchestrator, TrainingQueueProcessor};
    use connector_providers::ProviderRegistry;
    use connector_store::{InMemoryStore, RouteAdmin};
    use http_body_util::BodyExt;
    use std::sync::{Arc, Mutex};
    use tower::ServiceExt;

    /// Echoes the user prompt back and remembers it.
    struct EchoProvider {
        prompts: Mutex<Vec<String>>,
    }

    #[async_trait::async_trait]
    impl ProviderClient for EchoProvider {
        fn name(&self) -> &str {
            "OPENAI"
        }

        fn default_model(&self) -> &str {
            "echo-model"
        }

        async fn invoke(&self, payload: &ProviderPayload) -> Result<String, ProviderError> {
            self.prompts.lock().unwrap().push(payload.user_prompt.clone());
            if payload.user_prompt.contains("explode") {
                return Err(ProviderError::ApiError {
                    status_code: 503,
                    message: "upstream down".into(),
                });
            }
            Ok(format!("line one\nline two for: {}", payload.user_prompt.len()))
        }
    }

    struct TestApp {
        state: SharedState,
        store: Arc<InMemoryStore>,
        provider: Arc<EchoProvider>,
    }

    impl TestApp {
        async fn new() -> Self {
            let store = Arc::new(InMemoryStore::new());
            store
                .add_route(&RouteRule {
                    data_type: "SUPPORT".into(),
                    characteristic: "FAQ".into(),
                    priority: 0,
                    enabled: true,
                    route: RouteConfig {
                        route_id: 0,
                        route_key: "SUPPORT_DEFAULT".into(),
                        provider: "openai".into(),
                        model: Some("gpt-5".into()),
                        system_prompt: None,
                        temperature: None,
                        max_tokens: None,
                    },
                })
                .await
                .unwrap();

            let provider = Arc::new(EchoProvider {
                prompts: Mutex::new(Vec::new()),
            });
            let registry = ProviderRegistry::new().with(provider.clone());
            let events = Arc::new(EventBus::default());
            let orchestrator = Arc::new(InferenceOrchestrator::new(
                store.clone(),
                store.clone(),
                store.clone(),
                Arc::new(registry),
                events.clone(),
            ));
            let training = Arc::new(TrainingQueueProcessor::new(store.clone(), orchestrator.clone()));
            let state = Arc::new(GatewayState {
                orchestrator,
                training,
                events,
                api_key: None,
            });
            Self { state, store, provider }
        }

        async fn send(&self, req: Request<Body>) -> (StatusCode, serde_json::Value) {
            let response = connector_router(self.state.clone()).oneshot(req).await.unwrap();
            let status = response.status();
            let body = response.into_body().collect().await.unwrap().to_bytes();
            let json = serde_json::from_slice(&body).unwrap_or(serde_json::Value::Null);
            (status, json)
        }
    }

    fn query(method: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri("/query")
            .header("content-type", "application/json")
            .header(DATA_TYPE_HEADER, "SUPPORT")
            .header(CHARACTERISTIC_HEADER, "FAQ")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn post_and_put_query_answer() {
        let app = TestApp::new().await;

        for method in ["POST", "PUT"] {
            let (status, json) = app.send(query(method, serde_json::json!({"prompt": "pergunta"}))).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(json["provider"], "OPENAI");
            assert_eq!(json["model"], "gpt-5");
            assert_eq!(json["routeKey"], "SUPPORT_DEFAULT");
            assert!(json["output"].as_str().unwrap().starts_with("line one"));
        }
        assert_eq!(app.store.request_logs().await.len(), 2);
    }

    #[tokio::test]
    async fn missing_header_is_a_bad_request() {
        let app = TestApp::new().await;
        let req = Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json")
            .header(DATA_TYPE_HEADER, "SUPPORT")
            .body(Body::from(r#"{"prompt":"q"}"#))
            .unwrap();

        let (status, json) = app.send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("X-Data-Characteristic"));
        assert!(app.provider.prompts.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_prompt_and_bad_json_are_bad_requests() {
        let app = TestApp::new().await;

        let (status, json) = app.send(query("POST", serde_json::json!({"prompt": "  "}))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("prompt"));

        let req = Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json")
            .header(DATA_TYPE_HEADER, "SUPPORT")
            .header(CHARACTERISTIC_HEADER, "FAQ")
            .body(Body::from("{not json"))
            .unwrap();
        let (status, json) = app.send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].is_string());
    }

    #[tokio::test]
    async fn unknown_route_is_400_and_provider_failure_is_500() {
        let app = TestApp::new().await;

        let req = Request::builder()
            .method("POST")
            .uri("/query")
            .header("content-type", "application/json")
            .header(DATA_TYPE_HEADER, "BILLING")
            .header(CHARACTERISTIC_HEADER, "FAQ")
            .body(Body::from(r#"{"prompt":"q"}"#))
            .unwrap();
        let (status, json) = app.send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("dataType=BILLING"));

        let (status, json) = app.send(query("POST", serde_json::json!({"prompt": "explode"}))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json["error"].as_str().unwrap().contains("upstream down"));
    }

    #[tokio::test]
    async fn stream_emits_chunk_events() {
        let app = TestApp::new().await;
        let req = Request::builder()
            .method("POST")
            .uri("/query/stream")
            .header("content-type", "application/json")
            .header(DATA_TYPE_HEADER, "SUPPORT")
            .header(CHARACTERISTIC_HEADER, "FAQ")
            .body(Body::from(r#"{"prompt":"q"}"#))
            .unwrap();

        let response = connector_router(app.state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()["content-type"], "text/event-stream");

        let body = response.into_body().collect().await.unwrap().to_bytes();
        let text = String::from_utf8(body.to_vec()).unwrap();
        assert!(text.contains("event: chunk\ndata: line one\n"));
        assert!(text.contains("event: chunk\ndata: line two for: 1\n"));
        assert!(app.store.request_logs().await.is_empty());
    }

    #[tokio::test]
    async fn file_upload_is_base64_encoded_into_the_prompt() {
        let app = TestApp::new().await;
        let boundary = "XBOUNDARYX";
        let body = format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"prompt\"\r\n\r\nsummarise\r\n\
             --{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"a.txt\"\r\n\
             Content-Type: text/plain\r\n\r\nhello\r\n--{boundary}--\r\n"
        );
        let req = Request::builder()
            .method("POST")
            .uri("/file")
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .header(DATA_TYPE_HEADER, "SUPPORT")
            .header(CHARACTERISTIC_HEADER, "FAQ")
            .body(Body::from(body))
            .unwrap();

        let (status, json) = app.send(req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["routeKey"], "SUPPORT_DEFAULT");

        let prompts = app.provider.prompts.lock().unwrap().clone();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Prompt: summarise\n"));
        assert!(prompts[0].contains("FileBase64: aGVsbG8=\n"));
    }

    #[tokio::test]
    async fn file_without_file_part_is_rejected() {
        let app = TestApp::new().await;
        let boundary = "B";
        let body = format!("--{boundary}\r\nContent-Disposition: form-data; name=\"prompt\"\r\n\r\nonly text\r\n--{boundary}--\r\n");
        let req = Request::builder()
            .method("POST")
            .uri("/file")
            .header("content-type", format!("multipart/form-data; boundary={boundary}"))
            .header(DATA_TYPE_HEADER, "SUPPORT")
            .header(CHARACTERISTIC_HEADER, "FAQ")
            .body(Body::from(body))
            .unwrap();

        let (status, json) = app.send(req).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("no file part"));
    }

    #[tokio::test]
    async fn enqueue_validates_and_queues() {
        let app = TestApp::new().await;
        let req = |body: &str| {
            Request::builder()
                .method("POST")
                .uri("/training/enqueue")
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap()
        };

        let (status, json) = app
            .send(req(r#"{"dataType":"SUPPORT","dataCharacteristic":"FAQ","content":"Refunds take 5 days."}"#))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({"status": "queued"}));

        let (status, json) = app.send(req(r#"{"dataType":"SUPPORT","dataCharacteristic":"FAQ"}"#)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("Training message is incomplete"));

        assert_eq!(app.store.training_items().await.len(), 1);
    }

    #[tokio::test]
    async fn providers_and_health() {
        let app = TestApp::new().await;

        let req = Request::builder().uri("/providers").body(Body::empty()).unwrap();
        let (status, json) = app.send(req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            json,
            serde_json::json!({"providers": [{"name": "OPENAI", "defaultModel": "echo-model"}]})
        );

        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();
        let (status, json) = app.send(req).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, serde_json::json!({"status": "ok"}));
    }

    #[tokio::test]
    async fn events_stream_forwards_published_events() {
        let app = TestApp::new().await;
        let req = Request::builder().uri("/events").body(Body::empty()).unwrap();
        let response = connector_router(app.state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(app.state.events.subscriber_count(), 1);

        app.state
            .events
            .publish(ConnectorEvent::success(
                EventType::InferenceCompleted,
                "SUPPORT_DEFAULT",
                "OPENAI",
                "gpt-5",
                "Inference completed.",
            ))
            .await
            .unwrap();

        let mut body = response.into_body();
        let frame = body.frame().await.unwrap().unwrap();
        let text = String::from_utf8(frame.into_data().unwrap().to_vec()).unwrap();
        assert!(text.starts_with("event: INFERENCE_COMPLETED\n"));
        assert!(text.contains("\"routeKey\":\"SUPPORT_DEFAULT\""));
    }

    #[test]
    fn file_prompt_layout() {
        assert_eq!(
            file_prompt("what is this?", b"hi"),
            "Analyse the attached file (base64) together with the prompt.\nPrompt: what is this?\nFileBase64: aGk=\n"
        );
    }
}
