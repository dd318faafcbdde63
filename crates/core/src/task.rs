//! The unit of work handed to the agent loop.

use serde::{Deserialize, Serialize};

use crate::error::AgentError;

/// A natural-language instruction plus optional context.
///
/// Fields are private so a `Task` can only exist with a non-blank
/// instruction. Deserialization goes through the same check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTask")]
pub struct Task {
    text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    context: Option<String>,
}

impl Task {
    /// Validate and build a task. Blank context collapses to `None`.
    pub fn new(text: impl Into<String>, context: Option<String>) -> Result<Self, AgentError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(AgentError::EmptyTask);
        }
        let context = context.filter(|c| !c.trim().is_empty());
        Ok(Self { text, context })
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }
}

#[derive(Deserialize)]
struct RawTask {
    text: String,
    #[serde(default)]
    context: Option<String>,
}

impl TryFrom<RawTask> for Task {
    type Error = AgentError;

    fn try_from(raw: RawTask) -> Result<Self, Self::Error> {
        Task::new(raw.text, raw.context)
    }
}
