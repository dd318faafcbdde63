//! Context-protocol envelope: a typed request in, a status-tagged reply out.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::debug;

use crate::service::AgentService;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextRequest {
    pub context_type: String,
    #[serde(default)]
    pub payload: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextStatus {
    Ok,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResponse {
    pub status: ContextStatus,
    pub data: Value,
}

impl ContextResponse {
    pub fn ok(data: Value) -> Self {
        Self {
            status: ContextStatus::Ok,
            data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ContextStatus::Error,
            data: json!({ "error": message.into() }),
        }
    }
}

/// Route an envelope. `generate` runs the agent; any other type is echoed.
pub async fn handle_context(service: &AgentService, request: ContextRequest) -> ContextResponse {
    debug!(context_type = %request.context_type, "Context request");

    if request.context_type != "generate" {
        return ContextResponse::ok(json!({
            "echo": request.payload,
            "type": request.context_type,
        }));
    }

    let Some(task) = request
        .payload
        .get("task")
        .and_then(Value::as_str)
        .filter(|t| !t.trim().is_empty())
    else {
        return ContextResponse::error("Missing 'task' in payload");
    };
    let context = request.payload.get("context").and_then(Value::as_str);

    match service.generate(task, context).await {
        Ok(response) => ContextResponse::ok(json!({
            "result": response.output,
            "status": response.summary.status,
            "run_id": response.summary.run_id,
        })),
        Err(e) => ContextResponse::error(e.to_string()),
    }
}
