//! Turning a finished run into the structured result callers receive.

use localagent_core::run::{AgentRun, RunId, RunStatus, ToolInvocation};
use serde::{Deserialize, Serialize};

/// Everything about a run except the primary output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub model: String,
    pub status: RunStatus,
    pub trace: Vec<ToolInvocation>,
    pub iterations: u32,
    pub elapsed_ms: u64,
    pub run_id: RunId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The result of `generate` or `review`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentResponse {
    /// Generated code or review text; empty when the run produced no answer
    pub output: String,
    #[serde(flatten)]
    pub summary: RunSummary,
}

impl AgentResponse {
    /// Build a response, passing the answer (if any) through `shape`.
    pub fn from_run(run: AgentRun, model: &str, shape: impl FnOnce(&str) -> String) -> Self {
        let output = run.answer.as_deref().map(shape).unwrap_or_default();
        Self {
            output,
            summary: RunSummary {
                model: model.to_string(),
                status: run.status,
                trace: run.trace,
                iterations: run.iterations,
                elapsed_ms: run.elapsed_ms,
                run_id: run.id,
                error: run.error,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.summary.status == RunStatus::Success
    }
}

/// Pull code out of a model answer.
///
/// Returns the body of the first fenced block, or the inline span when the
/// fence closes on its opening line. Without a fence, every paired inline
/// backtick span is replaced by its contents.
pub fn extract_code(answer: &str) -> String {
    if let Some(open) = answer.find("```") {
        let after = &answer[open + 3..];
        let first_line = after.split('\n').next().unwrap_or_default();
        if let Some(close) = first_line.find("```") {
            return first_line[..close].trim().to_string();
        }

        let body = match after.find('\n') {
            Some(nl) if is_language_tag(first_line) => &after[nl + 1..],
            _ => after,
        };
        let body = match body.find("```") {
            Some(close) => &body[..close],
            None => body,
        };
        return body.trim_end().trim_start_matches('\n').to_string();
    }

    strip_inline_backticks(answer.trim()).trim().to_string()
}

/// `python`, `c++`, `objective-c` or nothing at all.
fn is_language_tag(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '+' | '#' | '-' | '.'))
}

fn strip_inline_backticks(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(open) = rest.find('`') {
        let Some(len) = rest[open + 1..].find('`') else {
            break;
        };
        out.push_str(&rest[..open]);
        out.push_str(&rest[open + 1..open + 1 + len]);
        rest = &rest[open + 2 + len..];
    }
    out.push_str(rest);
    out
}
