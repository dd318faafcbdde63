//! Subcommand implementations.

pub mod config_cmd;
pub mod doctor;
pub mod generate;
pub mod history;
pub mod mcp;
pub mod review;
pub mod serve;

use localagent_agent::{AgentResponse, AgentService};
use localagent_config::AppConfig;

pub(crate) fn load_config() -> Result<AppConfig, Box<dyn std::error::Error>> {
    Ok(AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?)
}

pub(crate) fn load_service() -> Result<AgentService, Box<dyn std::error::Error>> {
    let config = load_config()?;
    Ok(AgentService::from_config(&config)?)
}

/// Serialize a response with its output under `output_key`.
pub(crate) fn response_json(output_key: &str, response: &AgentResponse) -> serde_json::Value {
    let mut value = serde_json::to_value(&response.summary).unwrap_or_default();
    if let Some(map) = value.as_object_mut() {
        map.insert(output_key.to_string(), response.output.clone().into());
    }
    value
}

/// Human-readable footer: tool steps, status and timing.
pub(crate) fn render_summary(response: &AgentResponse) -> String {
    let summary = &response.summary;
    let mut out = String::new();

    for step in &summary.trace {
        let marker = if step.is_error { "✗" } else { "→" };
        out.push_str(&format!("  {marker} {} {}\n", step.tool, step.arguments));
    }
    out.push_str(&format!(
        "  status: {} | iterations: {} | {} ms | model: {} | run: {}\n",
        summary.status, summary.iterations, summary.elapsed_ms, summary.model, summary.run_id
    ));
    if let Some(error) = &summary.error {
        out.push_str(&format!("  error: {error}\n"));
    }
    out
}

/// Print a response and turn a non-successful run into an error exit.
pub(crate) fn report(
    output_key: &str,
    response: &AgentResponse,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(&response_json(output_key, response))?);
    } else {
        if !response.output.is_empty() {
            println!("{}", response.output);
            println!();
        }
        eprint!("{}", render_summary(response));
    }

    if response.is_success() {
        Ok(())
    } else {
        Err(format!("Run ended with status {}", response.summary.status).into())
    }
}
