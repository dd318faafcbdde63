//! HTTP API gateway for LocalAgent.
//!
//! Exposes the agent service over REST: code generation, code review,
//! memory history, the context-protocol envelope and a health check.
//!
//! Built on Axum for high performance async HTTP.

use axum::extract::DefaultBodyLimit;
use axum::{
    Router,
    extract::{Query, State},
    http::StatusCode,
    response::Json,
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use localagent_agent::{AgentService, ContextRequest, ContextResponse, RunSummary, handle_context};
use localagent_config::AppConfig;
use localagent_core::error::AgentError;
use localagent_providers::OllamaProvider;

/// Request bodies above this size are rejected with 413.
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Shared application state for the gateway.
pub struct GatewayState {
    pub service: AgentService,
}

type SharedState = Arc<GatewayState>;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorResponse>)>;

/// Build the Axum router with all gateway routes.
///
/// Layers applied:
/// - Permissive CORS
/// - Request body size limit (1 MB)
/// - HTTP trace logging
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/", get(root_handler))
        .route("/health", get(health_handler))
        .route("/generate", post(generate_handler))
        .route("/review", post(review_handler))
        .route("/history", get(history_handler))
        .route("/mcp", post(mcp_handler))
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(CorsLayer::permissive())
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

/// Start the gateway HTTP server.
///
/// When `gateway.wait_for_model` is set, blocks until the model server
/// lists the configured model (or gives up after the configured retries).
pub async fn start(config: AppConfig) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);

    if config.gateway.wait_for_model {
        OllamaProvider::from_config(&config)?
            .wait_until_ready(
                &config.model.id,
                config.model.startup_retries,
                Duration::from_secs(config.model.startup_interval_secs),
            )
            .await?;
    } else {
        info!("Skipping model readiness check");
    }

    let service = AgentService::from_config(&config)?;
    let app = build_router(Arc::new(GatewayState { service }));

    info!(addr = %addr, model = %config.model.id, "Gateway starting");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

// --- Handlers ---

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

fn error_response(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
    (
        status,
        Json(ErrorResponse {
            error: message.into(),
        }),
    )
}

fn agent_error(e: AgentError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match &e {
        AgentError::EmptyTask | AgentError::EmptyCode => StatusCode::BAD_REQUEST,
        AgentError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
    };
    error_response(status, e.to_string())
}

#[derive(Serialize)]
struct RootResponse {
    message: &'static str,
}

async fn root_handler() -> Json<RootResponse> {
    Json(RootResponse {
        message: "LocalAgent API is running",
    })
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
    model: String,
    tools: Vec<String>,
    memory_backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    memory_count: Option<usize>,
}

async fn health_handler(State(state): State<SharedState>) -> Json<HealthResponse> {
    let service = &state.service;
    let memory_count = match service.memory_count().await {
        Ok(n) => Some(n),
        Err(e) => {
            warn!(error = %e, "Memory store unavailable for health check");
            None
        }
    };

    Json(HealthResponse {
        status: if memory_count.is_some() { "ok" } else { "degraded" },
        version: env!("CARGO_PKG_VERSION"),
        model: service.model().to_string(),
        tools: service.tool_names(),
        memory_backend: service.memory_backend().to_string(),
        memory_count,
    })
}

#[derive(Deserialize)]
struct GenerateRequest {
    #[serde(default)]
    task: String,
    #[serde(default)]
    context: Option<String>,
}

#[derive(Serialize)]
struct GenerateResponse {
    code: String,
    #[serde(flatten)]
    summary: RunSummary,
}

async fn generate_handler(
    State(state): State<SharedState>,
    Json(payload): Json<GenerateRequest>,
) -> ApiResult<GenerateResponse> {
    info!(task_len = payload.task.len(), "Generate request received");

    let response = state
        .service
        .generate(&payload.task, payload.context.as_deref())
        .await
        .map_err(agent_error)?;

    Ok(Json(GenerateResponse {
        code: response.output,
        summary: response.summary,
    }))
}

#[derive(Deserialize)]
struct ReviewRequest {
    #[serde(default)]
    code: String,
}

#[derive(Serialize)]
struct ReviewResponse {
    review: String,
    #[serde(flatten)]
    summary: RunSummary,
}

async fn review_handler(
    State(state): State<SharedState>,
    Json(payload): Json<ReviewRequest>,
) -> ApiResult<ReviewResponse> {
    info!(code_len = payload.code.len(), "Review request received");

    let response = state
        .service
        .review(&payload.code)
        .await
        .map_err(agent_error)?;

    Ok(Json(ReviewResponse {
        review: response.output,
        summary: response.summary,
    }))
}

#[derive(Deserialize)]
struct HistoryParams {
    limit: Option<usize>,
}

#[derive(Serialize)]
struct HistoryItem {
    id: String,
    query: String,
    response: String,
    timestamp: String,
    metadata: serde_json::Map<String, serde_json::Value>,
}

#[derive(Serialize)]
struct HistoryResponse {
    history: Vec<HistoryItem>,
}

async fn history_handler(
    State(state): State<SharedState>,
    Query(params): Query<HistoryParams>,
) -> ApiResult<HistoryResponse> {
    let entries = state.service.history(params.limit).await.map_err(|e| {
        error!(error = %e, "History query failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
    })?;

    Ok(Json(HistoryResponse {
        history: entries
            .into_iter()
            .map(|e| HistoryItem {
                id: e.id,
                query: e.query,
                response: e.response,
                timestamp: e.timestamp.to_rfc3339(),
                metadata: e.metadata,
            })
            .collect(),
    }))
}

async fn mcp_handler(
    State(state): State<SharedState>,
    Json(request): Json<ContextRequest>,
) -> Json<ContextResponse> {
    Json(handle_context(&state.service, request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use http_body_util::BodyExt;
    use localagent_agent::AgentLoop;
    use localagent_core::error::ProviderError;
    use localagent_core::memory::{MemoryEntry, MemoryStore};
    use localagent_core::message::Message;
    use localagent_core::provider::{Provider, ProviderRequest, ProviderResponse};
    use localagent_memory::{HashEmbedder, InMemoryStore};
    use tower::ServiceExt;

    /// Answers every request with the same text.
    struct FixedProvider(String);

    #[async_trait::async_trait]
    impl Provider for FixedProvider {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Ok(ProviderResponse {
                message: Message::assistant(self.0.clone()),
                usage: None,
                model: request.model,
            })
        }
    }

    fn test_state(reply: &str) -> (SharedState, Arc<InMemoryStore>) {
        let provider: Arc<dyn Provider> = Arc::new(FixedProvider(reply.to_string()));
        let memory = Arc::new(InMemoryStore::new(Arc::new(HashEmbedder::default())));
        let tools = localagent_tools::registry_with_memory(memory.clone(), Duration::from_secs(15));
        let agent = AgentLoop::new(provider.clone(), "test-model", Arc::new(tools)).with_memory(memory.clone());
        let service = AgentService::new(agent, provider, memory.clone());
        (Arc::new(GatewayState { service }), memory)
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn root_endpoint() {
        let (state, _) = test_state("unused");
        let req = Request::builder().uri("/").body(Body::empty()).unwrap();

        let response = build_router(state).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["message"], "LocalAgent API is running");
    }

    #[tokio::test]
    async fn health_endpoint() {
        let (state, _) = test_state("unused");
        let req = Request::builder().uri("/health").body(Body::empty()).unwrap();

        let response = build_router(state).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["memory_count"], 0);
        assert_eq!(json["tools"].as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn generate_returns_code_and_trace() {
        let (state, memory) = test_state("Final Answer: ```python\nprint('hi')\n```");
        let response = build_router(state)
            .oneshot(post_json("/generate", serde_json::json!({"task": "say hi", "context": "python"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["code"], "print('hi')");
        assert_eq!(json["status"], "success");
        assert_eq!(json["model"], "test-model");
        assert_eq!(json["iterations"], 1);
        assert!(json["trace"].as_array().unwrap().is_empty());
        assert!(json["run_id"].is_string());
        assert!(json.get("error").is_none());
        assert_eq!(memory.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn generate_with_empty_task_is_bad_request() {
        let (state, _) = test_state("unused");
        for body in [serde_json::json!({"task": "   "}), serde_json::json!({})] {
            let response = build_router(state.clone())
                .oneshot(post_json("/generate", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            assert_eq!(body_json(response).await["error"], "Task must not be empty");
        }
    }

    #[tokio::test]
    async fn generate_reports_iteration_limit() {
        let (state, _) = test_state("Action: knowledge_lookup\nAction Input: {\"query\": \"rust\"}");
        let response = build_router(state)
            .oneshot(post_json("/generate", serde_json::json!({"task": "loop"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "iteration_limit_exceeded");
        assert_eq!(json["code"], "");
        assert_eq!(json["trace"].as_array().unwrap().len(), 8);
    }

    #[tokio::test]
    async fn review_returns_text() {
        let (state, _) = test_state("Final Answer: Looks fine.");
        let response = build_router(state)
            .oneshot(post_json("/review", serde_json::json!({"code": "x = 1"})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["review"], "Looks fine.");
        assert_eq!(json["status"], "success");
    }

    #[tokio::test]
    async fn review_with_empty_code_is_bad_request() {
        let (state, _) = test_state("unused");
        let response = build_router(state)
            .oneshot(post_json("/review", serde_json::json!({"code": ""})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn history_honours_limit() {
        let (state, memory) = test_state("unused");
        for i in 0..5 {
            let mut entry = MemoryEntry::new(format!("task {i}"), "ok").with_metadata("status", "success");
            entry.timestamp = chrono::Utc::now() + chrono::Duration::seconds(i);
            memory.write(entry).await.unwrap();
        }

        let req = Request::builder().uri("/history?limit=2").body(Body::empty()).unwrap();
        let response = build_router(state.clone()).oneshot(req).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        let history = json["history"].as_array().unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0]["query"], "task 4");
        assert_eq!(history[0]["metadata"]["status"], "success");
        assert!(history[0].get("embedding").is_none());

        let req = Request::builder().uri("/history").body(Body::empty()).unwrap();
        let json = body_json(build_router(state).oneshot(req).await.unwrap()).await;
        assert_eq!(json["history"].as_array().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn mcp_generate_and_echo() {
        let (state, _) = test_state("Final Answer: `ls -la`");

        let response = build_router(state.clone())
            .oneshot(post_json(
                "/mcp",
                serde_json::json!({"context_type": "generate", "payload": {"task": "list files"}}),
            ))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["status"], "ok");
        assert_eq!(json["data"]["result"], "ls -la");

        let response = build_router(state.clone())
            .oneshot(post_json(
                "/mcp",
                serde_json::json!({"context_type": "generate", "payload": {}}),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let json = body_json(response).await;
        assert_eq!(json["status"], "error");
        assert_eq!(json["data"]["error"], "Missing 'task' in payload");

        let response = build_router(state)
            .oneshot(post_json(
                "/mcp",
                serde_json::json!({"context_type": "status", "payload": {"a": 1}}),
            ))
            .await
            .unwrap();
        let json = body_json(response).await;
        assert_eq!(json["data"], serde_json::json!({"echo": {"a": 1}, "type": "status"}));
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let (state, _) = test_state("unused");
        let big = "x".repeat(MAX_BODY_BYTES + 1);
        let response = build_router(state)
            .oneshot(post_json("/review", serde_json::json!({"code": big})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn malformed_json_is_rejected() {
        let (state, _) = test_state("unused");
        let req = Request::builder()
            .method("POST")
            .uri("/generate")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = build_router(state).oneshot(req).await.unwrap();
        assert!(response.status().is_client_error());
    }
}
