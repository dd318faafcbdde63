//! `localagent mcp`: Send one context-protocol envelope.

use localagent_agent::{ContextRequest, handle_context};
use serde_json::{Map, Value};

pub async fn run(context_type: &str, payload: &str) -> Result<(), Box<dyn std::error::Error>> {
    let request = ContextRequest {
        context_type: context_type.to_string(),
        payload: parse_payload(payload)?,
    };

    let service = super::load_service()?;
    let response = handle_context(&service, request).await;
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn parse_payload(raw: &str) -> Result<Map<String, Value>, Box<dyn std::error::Error>> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err("Payload must be a JSON object".into()),
        Err(e) => Err(format!("Invalid JSON payload: {e}").into()),
    }
}
