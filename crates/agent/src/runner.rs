//! The agent reasoning loop implementation.
//!
//! Each iteration is Select → Dispatch → Observe → Decide: the model picks a
//! tool or answers, the registry runs the tool, the observation lands in the
//! trace, and the limits decide whether another iteration is allowed.

use localagent_core::error::{AgentError, ProviderError};
use localagent_core::memory::{MemoryEntry, MemoryStore};
use localagent_core::message::Message;
use localagent_core::provider::{Provider, ProviderRequest};
use localagent_core::run::{AgentRun, RunLimits, RunStatus};
use localagent_core::task::Task;
use localagent_core::tool::ToolRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::parser::{self, Decision};
use crate::prompt;

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// The core agent loop that orchestrates model calls and tool dispatch.
pub struct AgentLoop {
    /// The model backend
    provider: Arc<dyn Provider>,

    /// The model to use
    model: String,

    /// Temperature setting
    temperature: f32,

    /// Tool registry
    tools: Arc<ToolRegistry>,

    /// Optional memory store for recall and write-back
    memory: Option<Arc<dyn MemoryStore>>,

    /// Iteration and wall-clock ceilings
    limits: RunLimits,

    /// Maximum memories to recall per run
    recall_limit: usize,

    /// Upper bound on a single model call
    request_timeout: Duration,
}

impl AgentLoop {
    /// Create a new agent loop.
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            provider,
            model: model.into(),
            temperature: 0.7,
            tools,
            memory: None,
            limits: RunLimits::default(),
            recall_limit: 3,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Set the iteration and time limits.
    pub fn with_limits(mut self, limits: RunLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Attach a memory store for automatic recall and write-back.
    pub fn with_memory(mut self, memory: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(memory);
        self
    }

    /// Set the maximum number of memories to recall per run.
    pub fn with_recall_limit(mut self, limit: usize) -> Self {
        self.recall_limit = limit;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn limits(&self) -> RunLimits {
        self.limits
    }

    /// Execute one task to a terminal status.
    ///
    /// `history` replaces automatic recall when given. The returned run
    /// always has a terminal status; model failures end up in
    /// `AgentRun::error` rather than propagating.
    pub async fn run(&self, task: Task, history: Option<Vec<MemoryEntry>>) -> AgentRun {
        let started = Instant::now();
        let mut run = AgentRun::start(task);
        info!(
            run_id = %run.id,
            model = %self.model,
            max_iterations = self.limits.max_iterations,
            "Agent run started"
        );

        let memories = match history {
            Some(entries) => entries,
            None => self.recall(&run).await,
        };
        let system = prompt::system_prompt(&self.tools.definitions());

        loop {
            let elapsed = started.elapsed();
            run.observe_elapsed(elapsed);

            if run.iterations >= self.limits.max_iterations {
                warn!(run_id = %run.id, iterations = run.iterations, "Iteration limit reached");
                run.exceed(RunStatus::IterationLimitExceeded);
                break;
            }
            if elapsed >= self.limits.max_duration {
                warn!(run_id = %run.id, elapsed_ms = run.elapsed_ms, "Time limit reached");
                run.exceed(RunStatus::TimeLimitExceeded);
                break;
            }

            let iteration = run.tick();
            debug!(run_id = %run.id, iteration, "Agent loop iteration");

            let request = ProviderRequest {
                model: self.model.clone(),
                messages: vec![
                    Message::system(&system),
                    Message::user(prompt::render(&run.task, &memories, &run.trace)),
                ],
                temperature: self.temperature,
                max_tokens: None,
                stop: vec![prompt::STOP_SEQUENCE.to_string()],
            };

            // The call may not outlive the run's deadline.
            let remaining = self.limits.max_duration - elapsed;
            let budget = remaining.min(self.request_timeout);
            let reply = match tokio::time::timeout(budget, self.provider.complete(request)).await {
                Ok(Ok(response)) => response.message.content,
                Ok(Err(e)) => {
                    error!(run_id = %run.id, iteration, model = %self.model, error = %e, "Model call failed");
                    run.fail(AgentError::ModelUnavailable(e).to_string());
                    break;
                }
                Err(_) if budget < self.request_timeout => {
                    warn!(run_id = %run.id, iteration, "Time limit reached during model call");
                    run.exceed(RunStatus::TimeLimitExceeded);
                    break;
                }
                Err(_) => {
                    let e = ProviderError::Timeout(format!(
                        "no reply within {}s",
                        self.request_timeout.as_secs()
                    ));
                    error!(run_id = %run.id, iteration, model = %self.model, error = %e, "Model call failed");
                    run.fail(AgentError::ModelUnavailable(e).to_string());
                    break;
                }
            };

            match parser::parse(&reply) {
                Decision::Final { answer } => {
                    debug!(run_id = %run.id, iteration, "Final answer produced");
                    run.succeed(answer);
                    break;
                }
                Decision::Action {
                    tool,
                    input,
                    thought,
                } => {
                    let observation = self.tools.observe(&tool, input.clone()).await;
                    debug!(
                        run_id = %run.id,
                        iteration,
                        tool = %tool,
                        is_error = observation.is_error,
                        "Tool observed"
                    );
                    run.record(tool, input, observation.text, observation.is_error, thought);
                }
            }
        }

        run.observe_elapsed(started.elapsed());
        self.remember(&run).await;

        info!(
            run_id = %run.id,
            status = %run.status,
            iterations = run.iterations,
            tool_calls = run.trace.len(),
            elapsed_ms = run.elapsed_ms,
            "Agent run finished"
        );
        run
    }

    /// Recall the entries most similar to the task.
    async fn recall(&self, run: &AgentRun) -> Vec<MemoryEntry> {
        let Some(memory) = &self.memory else {
            return vec![];
        };
        if self.recall_limit == 0 {
            return vec![];
        }

        match memory.query(run.task.text(), self.recall_limit).await {
            Ok(entries) => {
                if !entries.is_empty() {
                    debug!(run_id = %run.id, count = entries.len(), "Recalled memories for context");
                }
                entries
            }
            Err(e) => {
                warn!(run_id = %run.id, error = %e, "Memory recall failed");
                vec![]
            }
        }
    }

    /// Write the outcome of a successful or failed run to memory.
    async fn remember(&self, run: &AgentRun) {
        let Some(memory) = &self.memory else {
            return;
        };
        let Some(summary) = run.outcome_summary() else {
            return;
        };

        let mut entry = MemoryEntry::new(run.task.text(), summary)
            .with_metadata("run_id", run.id.to_string())
            .with_metadata("status", run.status.as_str())
            .with_metadata("iterations", run.iterations)
            .with_metadata("model", self.model.clone());
        if let Some(context) = run.task.context() {
            entry = entry.with_metadata("context", context);
        }

        match memory.write(entry).await {
            Ok(id) => debug!(run_id = %run.id, memory_id = %id, "Run saved to memory"),
            Err(e) => warn!(run_id = %run.id, error = %e, "Failed to save run to memory"),
        }
    }
}
