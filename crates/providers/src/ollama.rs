//! Ollama provider: native `/api/*` endpoints of a local model server.
//!
//! Supports:
//! - Chat completion (`POST /api/chat`, non-streaming)
//! - Embeddings (`POST /api/embed`)
//! - Model listing and health checks (`GET /api/tags`)
//! - Startup readiness polling until the configured model is pulled

use async_trait::async_trait;
use localagent_config::AppConfig;
use localagent_core::error::ProviderError;
use localagent_core::message::{Message, Role};
use localagent_core::provider::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// A provider backed by an Ollama server.
///
/// The inner `reqwest::Client` pools connections and is cheap to share, so
/// one instance serves every concurrent run.
pub struct OllamaProvider {
    base_url: String,
    client: reqwest::Client,
    timeout: Duration,
}

impl OllamaProvider {
    /// Create a provider for `base_url` whose requests give up after `timeout`.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, ProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            timeout,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self, ProviderError> {
        Self::new(&config.model.host, config.request_timeout())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn send_error(&self, e: reqwest::Error) -> ProviderError {
        if e.is_timeout() {
            ProviderError::Timeout(format!("no response within {}s", self.timeout.as_secs()))
        } else {
            ProviderError::Network(e.to_string())
        }
    }

    /// Read the body of a response, turning non-success statuses into errors.
    async fn read_body(&self, response: reqwest::Response) -> Result<String, ProviderError> {
        let status = response.status().as_u16();
        let body = response.text().await.map_err(|e| self.send_error(e))?;

        match status {
            200..=299 => Ok(body),
            404 => Err(ProviderError::ModelNotFound(error_message(&body))),
            _ => {
                warn!(status, body = %body, "Model server returned error");
                Err(ProviderError::ApiError {
                    status_code: status,
                    message: error_message(&body),
                })
            }
        }
    }

    /// Poll `/api/tags` until `model` is listed.
    ///
    /// Connection errors and a missing model are both retried. After the
    /// last attempt the most recent failure is returned.
    pub async fn wait_until_ready(
        &self,
        model: &str,
        retries: u32,
        interval: Duration,
    ) -> Result<(), ProviderError> {
        let attempts = retries.max(1);
        let mut last_error = ProviderError::ModelNotFound(model.to_string());

        for attempt in 1..=attempts {
            match self.list_models().await {
                Ok(models) if models.iter().any(|m| model_matches(m, model)) => {
                    info!(model, attempt, "Model is ready");
                    return Ok(());
                }
                Ok(_) => {
                    info!(model, attempt, attempts, "Waiting for model to be available");
                    last_error = ProviderError::ModelNotFound(model.to_string());
                }
                Err(e) => {
                    info!(attempt, attempts, error = %e, "Waiting for model server to start");
                    last_error = e;
                }
            }

            if attempt < attempts {
                tokio::time::sleep(interval).await;
            }
        }

        warn!(model, attempts, "Model server not ready after maximum retries");
        Err(last_error)
    }
}

/// `llama3` matches a server listing of `llama3:latest`.
pub fn model_matches(available: &str, wanted: &str) -> bool {
    available == wanted
        || (!wanted.contains(':') && available.strip_suffix(":latest") == Some(wanted))
}

/// Ollama reports failures as `{"error": "..."}`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<ApiError>(body)
        .map(|e| e.error)
        .unwrap_or_else(|_| body.to_string())
}

fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
    messages
        .iter()
        .map(|m| ApiMessage {
            role: match m.role {
                Role::User => "user".into(),
                Role::Assistant => "assistant".into(),
                Role::System => "system".into(),
            },
            content: m.content.clone(),
        })
        .collect()
}

#[async_trait]
impl Provider for OllamaProvider {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);

        let body = ChatRequest {
            model: &request.model,
            messages: to_api_messages(&request.messages),
            stream: false,
            options: ChatOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
                stop: (!request.stop.is_empty()).then(|| request.stop.clone()),
            },
        };

        debug!(model = %request.model, messages = body.messages.len(), "Sending chat request");

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let text = self.read_body(response).await?;

        let api_response: ChatResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::MalformedResponse(format!("chat response: {e}")))?;

        let usage = match (api_response.prompt_eval_count, api_response.eval_count) {
            (None, None) => None,
            (prompt, completion) => {
                let prompt_tokens = prompt.unwrap_or(0);
                let completion_tokens = completion.unwrap_or(0);
                Some(Usage {
                    prompt_tokens,
                    completion_tokens,
                    total_tokens: prompt_tokens + completion_tokens,
                })
            }
        };

        Ok(ProviderResponse {
            message: Message::assistant(api_response.message.content),
            usage,
            model: api_response.model.unwrap_or(request.model),
        })
    }

    async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
        let url = format!("{}/api/embed", self.base_url);
        let expected = request.inputs.len();

        debug!(model = %request.model, count = expected, "Sending embedding request");

        let response = self
            .client
            .post(&url)
            .json(&EmbedRequest {
                model: &request.model,
                input: &request.inputs,
            })
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let text = self.read_body(response).await?;

        let api_response: EmbedResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::MalformedResponse(format!("embed response: {e}")))?;

        if api_response.embeddings.len() != expected {
            return Err(ProviderError::MalformedResponse(format!(
                "expected {expected} embeddings, got {}",
                api_response.embeddings.len()
            )));
        }

        Ok(EmbeddingResponse {
            embeddings: api_response.embeddings,
            model: api_response.model.unwrap_or(request.model),
        })
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;
        let text = self.read_body(response).await?;

        let tags: TagsResponse = serde_json::from_str(&text)
            .map_err(|e| ProviderError::MalformedResponse(format!("tags response: {e}")))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        let url = format!("{}/api/tags", self.base_url);
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        Ok(response.status().is_success())
    }
}

// --- Ollama API types (private) ---

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Serialize)]
struct ChatOptions {
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stop: Option<Vec<String>>,
}

#[derive(Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default)]
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    message: ApiMessage,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
    #[serde(default)]
    eval_count: Option<u32>,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    model: Option<String>,
    embeddings: Vec<Vec<f32>>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Deserialize)]
struct TagModel {
    name: String,
}

#[derive(Deserialize)]
struct ApiError {
    error: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Json, Router, http::StatusCode, routing::get, routing::post};
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn provider(base_url: &str) -> OllamaProvider {
        OllamaProvider::new(base_url, Duration::from_secs(5)).unwrap()
    }

    fn chat_request() -> ProviderRequest {
        ProviderRequest {
            model: "qwen2.5-coder:0.5b".into(),
            messages: vec![Message::system("be brief"), Message::user("hi")],
            temperature: 0.2,
            max_tokens: None,
            stop: vec!["\nObservation:".into()],
        }
    }

    #[test]
    fn trailing_slash_is_trimmed() {
        let p = provider("http://localhost:11434/");
        assert_eq!(p.base_url(), "http://localhost:11434");
        assert_eq!(p.name(), "ollama");
    }

    #[test]
    fn latest_tag_matches_bare_name() {
        assert!(model_matches("llama3:latest", "llama3"));
        assert!(model_matches("qwen2.5-coder:0.5b", "qwen2.5-coder:0.5b"));
        assert!(!model_matches("qwen2.5-coder:1.5b", "qwen2.5-coder:0.5b"));
        assert!(!model_matches("llama3:8b", "llama3"));
    }

    #[test]
    fn chat_request_serializes_options() {
        let req = chat_request();
        let body = ChatRequest {
            model: &req.model,
            messages: to_api_messages(&req.messages),
            stream: false,
            options: ChatOptions {
                temperature: req.temperature,
                num_predict: None,
                stop: Some(req.stop.clone()),
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["options"]["stop"][0], "\nObservation:");
        assert!(json["options"].get("num_predict").is_none());
    }

    #[test]
    fn error_body_is_unwrapped() {
        assert_eq!(error_message(r#"{"error":"model 'x' not found"}"#), "model 'x' not found");
        assert_eq!(error_message("plain text"), "plain text");
    }

    #[tokio::test]
    async fn complete_parses_chat_response() {
        let router = Router::new().route(
            "/api/chat",
            post(|Json(body): Json<serde_json::Value>| async move {
                assert_eq!(body["model"], "qwen2.5-coder:0.5b");
                Json(serde_json::json!({
                    "model": "qwen2.5-coder:0.5b",
                    "message": {"role": "assistant", "content": "Final Answer: 42"},
                    "done": true,
                    "prompt_eval_count": 12,
                    "eval_count": 4
                }))
            }),
        );
        let base = serve(router).await;

        let response = provider(&base).complete(chat_request()).await.unwrap();
        assert_eq!(response.message.content, "Final Answer: 42");
        assert_eq!(response.message.role, Role::Assistant);
        assert_eq!(response.usage.unwrap().total_tokens, 16);
    }

    #[tokio::test]
    async fn complete_rejects_malformed_body() {
        let router = Router::new().route("/api/chat", post(|| async { "not json" }));
        let base = serve(router).await;

        let err = provider(&base).complete(chat_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn missing_model_maps_to_model_not_found() {
        let router = Router::new().route(
            "/api/chat",
            post(|| async {
                (
                    StatusCode::NOT_FOUND,
                    Json(serde_json::json!({"error": "model 'qwen2.5-coder:0.5b' not found"})),
                )
            }),
        );
        let base = serve(router).await;

        let err = provider(&base).complete(chat_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::ModelNotFound(ref m) if m.contains("not found")));
    }

    #[tokio::test]
    async fn server_error_maps_to_api_error() {
        let router = Router::new().route(
            "/api/chat",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "out of memory") }),
        );
        let base = serve(router).await;

        let err = provider(&base).complete(chat_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::ApiError { status_code: 500, .. }));
    }

    #[tokio::test]
    async fn unreachable_server_is_network_error() {
        // Bind then drop to get a port nobody listens on.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let err = provider(&format!("http://{addr}"))
            .complete(chat_request())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Network(_)));
    }

    #[tokio::test]
    async fn slow_server_times_out() {
        let router = Router::new().route(
            "/api/chat",
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "late"
            }),
        );
        let base = serve(router).await;

        let p = OllamaProvider::new(&base, Duration::from_millis(200)).unwrap();
        let err = p.complete(chat_request()).await.unwrap_err();
        assert!(matches!(err, ProviderError::Timeout(_)));
    }

    #[tokio::test]
    async fn embed_returns_one_vector_per_input() {
        let router = Router::new().route(
            "/api/embed",
            post(|| async {
                Json(serde_json::json!({
                    "model": "nomic-embed-text",
                    "embeddings": [[0.1, 0.2], [0.3, 0.4]]
                }))
            }),
        );
        let base = serve(router).await;

        let response = provider(&base)
            .embed(EmbeddingRequest {
                model: "nomic-embed-text".into(),
                inputs: vec!["a".into(), "b".into()],
            })
            .await
            .unwrap();
        assert_eq!(response.embeddings.len(), 2);
        assert_eq!(response.embeddings[1], vec![0.3, 0.4]);
    }

    #[tokio::test]
    async fn embed_count_mismatch_is_malformed() {
        let router = Router::new().route(
            "/api/embed",
            post(|| async { Json(serde_json::json!({"embeddings": [[0.1]]})) }),
        );
        let base = serve(router).await;

        let err = provider(&base)
            .embed(EmbeddingRequest {
                model: "m".into(),
                inputs: vec!["a".into(), "b".into()],
            })
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse(_)));
    }

    #[tokio::test]
    async fn wait_until_ready_polls_until_model_listed() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = calls.clone();
        let router = Router::new().route(
            "/api/tags",
            get(move || {
                let counter = counter.clone();
                async move {
                    let n = counter.fetch_add(1, Ordering::SeqCst);
                    let models = if n < 2 {
                        serde_json::json!([])
                    } else {
                        serde_json::json!([{"name": "qwen2.5-coder:0.5b"}])
                    };
                    Json(serde_json::json!({ "models": models }))
                }
            }),
        );
        let base = serve(router).await;

        provider(&base)
            .wait_until_ready("qwen2.5-coder:0.5b", 5, Duration::from_millis(10))
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn wait_until_ready_gives_up() {
        let router = Router::new().route(
            "/api/tags",
            get(|| async { Json(serde_json::json!({"models": [{"name": "llama3:latest"}]})) }),
        );
        let base = serve(router).await;

        let err = provider(&base)
            .wait_until_ready("codellama:7b", 3, Duration::from_millis(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ModelNotFound(ref m) if m == "codellama:7b"));
    }
}
