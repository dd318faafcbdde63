//! Agent run types: the record of one bounded execution.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

use crate::task::Task;

/// Unique identifier for a run, used to correlate logs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub String);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Where a run is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Running,
    Success,
    IterationLimitExceeded,
    TimeLimitExceeded,
    Error,
}

impl RunStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, RunStatus::Running)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Running => "running",
            RunStatus::Success => "success",
            RunStatus::IterationLimitExceeded => "iteration_limit_exceeded",
            RunStatus::TimeLimitExceeded => "time_limit_exceeded",
            RunStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ceilings applied to every run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    pub max_iterations: u32,
    pub max_duration: Duration,
}

impl Default for RunLimits {
    fn default() -> Self {
        Self {
            max_iterations: 8,
            max_duration: Duration::from_secs(60),
        }
    }
}

/// One recorded tool call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Zero-based position in the trace
    pub sequence: usize,
    pub tool: String,
    pub arguments: serde_json::Value,
    pub observation: String,
    /// Whether the observation is an error message
    #[serde(default)]
    pub is_error: bool,
    /// The model's reasoning before choosing the tool
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thought: Option<String>,
}

/// The execution context of one task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentRun {
    pub id: RunId,
    pub task: Task,
    pub trace: Vec<ToolInvocation>,
    pub iterations: u32,
    pub elapsed_ms: u64,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentRun {
    pub fn start(task: Task) -> Self {
        Self {
            id: RunId::new(),
            task,
            trace: Vec::new(),
            iterations: 0,
            elapsed_ms: 0,
            status: RunStatus::Running,
            answer: None,
            error: None,
        }
    }

    /// Count one more iteration. Returns the new count.
    pub fn tick(&mut self) -> u32 {
        self.iterations += 1;
        self.iterations
    }

    /// Update elapsed time. Never moves backwards.
    pub fn observe_elapsed(&mut self, elapsed: Duration) {
        let ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
        self.elapsed_ms = self.elapsed_ms.max(ms);
    }

    /// Append a tool call to the trace with the next sequence index.
    pub fn record(
        &mut self,
        tool: impl Into<String>,
        arguments: serde_json::Value,
        observation: impl Into<String>,
        is_error: bool,
        thought: Option<String>,
    ) -> &ToolInvocation {
        let sequence = self.trace.len();
        self.trace.push(ToolInvocation {
            sequence,
            tool: tool.into(),
            arguments,
            observation: observation.into(),
            is_error,
            thought,
        });
        &self.trace[sequence]
    }

    pub fn succeed(&mut self, answer: impl Into<String>) {
        self.answer = Some(answer.into());
        self.status = RunStatus::Success;
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.error = Some(error.into());
        self.status = RunStatus::Error;
    }

    pub fn exceed(&mut self, status: RunStatus) {
        debug_assert!(matches!(
            status,
            RunStatus::IterationLimitExceeded | RunStatus::TimeLimitExceeded
        ));
        self.status = status;
    }

    pub fn is_finished(&self) -> bool {
        self.status.is_terminal()
    }

    /// The text stored in memory for this run: the answer, or the error.
    pub fn outcome_summary(&self) -> Option<String> {
        match self.status {
            RunStatus::Success => self.answer.clone(),
            RunStatus::Error => Some(format!(
                "error: {}",
                self.error.as_deref().unwrap_or("unknown failure")
            )),
            _ => None,
        }
    }
}
