//! Parsing model replies in the ReAct text format.
//!
//! Small local models drift from the format often, so the parser is
//! lenient: markers are matched at line starts only, a reply with neither
//! an `Action:` nor a `Final Answer:` is taken as the answer itself, and an
//! `Action Input` that is not a JSON object is wrapped as `{"input": ...}`.

use serde_json::Value;

const THOUGHT: &str = "Thought:";
const ACTION: &str = "Action:";
const ACTION_INPUT: &str = "Action Input:";
const OBSERVATION: &str = "Observation:";
const FINAL_ANSWER: &str = "Final Answer:";

/// What the model decided to do this iteration.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// Call a tool.
    Action {
        tool: String,
        input: Value,
        thought: Option<String>,
    },
    /// Finish the run.
    Final { answer: String },
}

/// Interpret one model reply.
///
/// A `Final Answer:` wins only when it comes before any `Action:`; a model
/// that writes an action and then hallucinates an answer still gets its
/// action executed.
pub fn parse(reply: &str) -> Decision {
    let action = find_marker(reply, ACTION);
    let final_answer = find_marker(reply, FINAL_ANSWER);

    match (action, final_answer) {
        (Some(a), Some(f)) if f.start < a.start => final_decision(reply, f),
        (Some(a), _) => match action_decision(reply, a) {
            Some(decision) => decision,
            None => Decision::Final {
                answer: reply.trim().to_string(),
            },
        },
        (None, Some(f)) => final_decision(reply, f),
        (None, None) => Decision::Final {
            answer: strip_leading_thought(reply),
        },
    }
}

#[derive(Debug, Clone, Copy)]
struct Marker {
    /// Byte offset of the marker itself
    start: usize,
    /// Byte offset just past the marker
    body: usize,
}

/// First occurrence of `marker` at the start of a line (leading spaces allowed).
fn find_marker(text: &str, marker: &str) -> Option<Marker> {
    let mut offset = 0;
    for line in text.split_inclusive('\n') {
        let indent = line.len() - line.trim_start().len();
        if line[indent..].starts_with(marker) {
            let start = offset + indent;
            return Some(Marker {
                start,
                body: start + marker.len(),
            });
        }
        offset += line.len();
    }
    None
}

/// Text from `from` up to the next line-start marker (any of them) or the end.
fn section(text: &str, from: usize) -> &str {
    let rest = &text[from..];
    let end = [THOUGHT, ACTION, ACTION_INPUT, OBSERVATION, FINAL_ANSWER]
        .iter()
        .filter_map(|m| find_marker(rest, m))
        .map(|m| m.start)
        .filter(|&s| s > 0)
        .min()
        .unwrap_or(rest.len());
    &rest[..end]
}

fn final_decision(reply: &str, marker: Marker) -> Decision {
    Decision::Final {
        answer: reply[marker.body..].trim().to_string(),
    }
}

fn action_decision(reply: &str, action: Marker) -> Option<Decision> {
    let tool = section(reply, action.body)
        .lines()
        .next()
        .unwrap_or_default()
        .trim()
        .trim_matches(|c| c == '`' || c == '"' || c == '\'')
        .to_string();
    if tool.is_empty() {
        return None;
    }

    let input = find_marker(reply, ACTION_INPUT)
        .filter(|m| m.start > action.start)
        .map(|m| parse_input(section(reply, m.body)))
        .unwrap_or_else(|| Value::Object(Default::default()));

    let thought = find_marker(reply, THOUGHT)
        .filter(|m| m.start < action.start)
        .map(|m| section(reply, m.body).trim().to_string())
        .filter(|t| !t.is_empty());

    Some(Decision::Action {
        tool,
        input,
        thought,
    })
}

/// JSON objects pass through; anything else is wrapped as `{"input": ...}`.
fn parse_input(raw: &str) -> Value {
    let cleaned = strip_fences(raw.trim());
    match serde_json::from_str::<Value>(cleaned) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(Value::String(s)) => serde_json::json!({ "input": s }),
        _ => serde_json::json!({ "input": cleaned }),
    }
}

fn strip_fences(text: &str) -> &str {
    let Some(inner) = text.strip_prefix("```") else {
        return text;
    };
    let inner = inner.strip_suffix("```").unwrap_or(inner);
    // Drop a language tag such as ```json
    match inner.split_once('\n') {
        Some((tag, body)) if !tag.trim().contains(' ') => body.trim(),
        _ => inner.trim(),
    }
}

fn strip_leading_thought(reply: &str) -> String {
    let trimmed = reply.trim();
    trimmed
        .strip_prefix(THOUGHT)
        .map(str::trim)
        .unwrap_or(trimmed)
        .to_string()
}
