//! The application service behind the CLI and the gateway.
//!
//! `AgentService` owns one `AgentLoop` plus the memory store and exposes the
//! three user-facing operations: generate code, review code, list history.

use localagent_config::AppConfig;
use localagent_core::error::{AgentError, MemoryError};
use localagent_core::memory::{Embedder, MemoryEntry, MemoryStore};
use localagent_core::provider::Provider;
use localagent_core::task::Task;
use localagent_memory::{HashEmbedder, build_store};
use localagent_providers::{OllamaProvider, ProviderEmbedder};
use localagent_tools::registry_with_memory;
use std::sync::Arc;
use tracing::info;

use crate::assembler::{AgentResponse, extract_code};
use crate::runner::AgentLoop;

/// History entries returned when the caller does not ask for a number.
pub const DEFAULT_HISTORY_LIMIT: usize = 10;

const REVIEW_INSTRUCTION: &str = "Review the following code. Start by running the code_review tool on it, \
then explain the real problems (bugs, risky patterns, unclear naming) in order of importance \
and suggest concrete fixes.";

pub struct AgentService {
    agent: AgentLoop,
    provider: Arc<dyn Provider>,
    memory: Arc<dyn MemoryStore>,
}

impl AgentService {
    pub fn new(agent: AgentLoop, provider: Arc<dyn Provider>, memory: Arc<dyn MemoryStore>) -> Self {
        Self {
            agent,
            provider,
            memory,
        }
    }

    /// Wire up provider, embedder, store and tools from configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self, localagent_core::Error> {
        let provider: Arc<dyn Provider> = Arc::new(OllamaProvider::from_config(config)?);

        let embedder: Arc<dyn Embedder> = match config.memory.embedder.as_str() {
            "ollama" => Arc::new(ProviderEmbedder::new(provider.clone(), config.model.id.clone())),
            "hash" => Arc::new(HashEmbedder::new(config.memory.embedding_dims)),
            other => {
                return Err(localagent_core::Error::Config {
                    message: format!("Unknown embedder '{other}'"),
                });
            }
        };

        let memory = build_store(
            &config.memory.backend,
            &config.memory_dir(),
            &config.memory.collection,
            embedder.clone(),
        )?;
        let tools = registry_with_memory(memory.clone(), config.tool_timeout());

        let agent = AgentLoop::new(provider.clone(), config.model.id.clone(), Arc::new(tools))
            .with_temperature(config.model.temperature)
            .with_limits(config.run_limits())
            .with_memory(memory.clone())
            .with_recall_limit(config.agent.recall_limit)
            .with_request_timeout(config.request_timeout());

        info!(
            model = %config.model.id,
            host = %config.model.host,
            memory = memory.name(),
            embedder = embedder.name(),
            "Agent service ready"
        );

        Ok(Self::new(agent, provider, memory))
    }

    /// Generate code for a task.
    pub async fn generate(&self, task: &str, context: Option<&str>) -> Result<AgentResponse, AgentError> {
        let task = Task::new(task, context.map(str::to_string))?;
        let run = self.agent.run(task, None).await;
        Ok(AgentResponse::from_run(run, self.agent.model(), extract_code))
    }

    /// Review a piece of code.
    pub async fn review(&self, code: &str) -> Result<AgentResponse, AgentError> {
        if code.trim().is_empty() {
            return Err(AgentError::EmptyCode);
        }
        let task = Task::new(format!("{REVIEW_INSTRUCTION}\n\n```\n{}\n```", code.trim_end()), None)?;
        let run = self.agent.run(task, None).await;
        Ok(AgentResponse::from_run(run, self.agent.model(), |answer| {
            answer.trim().to_string()
        }))
    }

    /// The most recent memory entries, newest first.
    pub async fn history(&self, limit: Option<usize>) -> Result<Vec<MemoryEntry>, MemoryError> {
        self.memory
            .recent(limit.unwrap_or(DEFAULT_HISTORY_LIMIT))
            .await
    }

    pub async fn memory_count(&self) -> Result<usize, MemoryError> {
        self.memory.count().await
    }

    pub fn memory_backend(&self) -> &str {
        self.memory.name()
    }

    pub fn model(&self) -> &str {
        self.agent.model()
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.agent.tools().names().into_iter().map(String::from).collect()
    }

    pub fn provider(&self) -> &Arc<dyn Provider> {
        &self.provider
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{ScriptedProvider, action, final_answer};
    use localagent_core::run::RunStatus;
    use localagent_memory::InMemoryStore;

    fn service(provider: Arc<ScriptedProvider>) -> (AgentService, Arc<InMemoryStore>) {
        let memory = Arc::new(InMemoryStore::new(Arc::new(HashEmbedder::default())));
        let tools = registry_with_memory(memory.clone(), std::time::Duration::from_secs(15));
        let agent = AgentLoop::new(provider.clone(), "mock-model", Arc::new(tools)).with_memory(memory.clone());
        (AgentService::new(agent, provider, memory.clone()), memory)
    }

    #[tokio::test]
    async fn generate_extracts_code() {
        let provider = Arc::new(ScriptedProvider::new([final_answer(
            "Here it is:\n```python\ndef square(x):\n    return x * x\n```",
        )]));
        let (service, memory) = service(provider);

        let response = service.generate("square a number", None).await.unwrap();
        assert_eq!(response.output, "def square(x):\n    return x * x");
        assert_eq!(response.summary.status, RunStatus::Success);
        assert_eq!(response.summary.model, "mock-model");
        assert_eq!(memory.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn generate_rejects_empty_task() {
        let provider = Arc::new(ScriptedProvider::new(Vec::<String>::new()));
        let (service, _) = service(provider.clone());

        let err = service.generate("   ", None).await.unwrap_err();
        assert!(matches!(err, AgentError::EmptyTask));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn review_uses_code_review_tool() {
        let code = "try:\n    run()\nexcept:\n    pass";
        let provider = Arc::new(ScriptedProvider::new([
            action("code_review", serde_json::json!({"code": code, "language": "python"})),
            final_answer("Avoid the bare except; catch a specific exception."),
        ]));
        let (service, _) = service(provider.clone());

        let response = service.review(code).await.unwrap();
        assert_eq!(response.output, "Avoid the bare except; catch a specific exception.");
        assert_eq!(response.summary.trace.len(), 1);
        assert!(response.summary.trace[0].observation.contains("bare-except"));

        let first_prompt = &provider.requests()[0].messages[1].content;
        assert!(first_prompt.contains("except:\n    pass"));
    }

    #[tokio::test]
    async fn review_rejects_empty_code() {
        let (service, _) = service(Arc::new(ScriptedProvider::new(Vec::<String>::new())));
        assert!(matches!(service.review("\n\n").await, Err(AgentError::EmptyCode)));
    }

    #[tokio::test]
    async fn history_defaults_to_ten() {
        let (service, memory) = service(Arc::new(ScriptedProvider::new(Vec::<String>::new())));
        for i in 0..12 {
            let mut entry = MemoryEntry::new(format!("task {i}"), "ok");
            entry.timestamp = chrono::Utc::now() + chrono::Duration::seconds(i);
            memory.write(entry).await.unwrap();
        }

        let history = service.history(None).await.unwrap();
        assert_eq!(history.len(), 10);
        assert_eq!(history[0].query, "task 11");
        assert_eq!(service.history(Some(3)).await.unwrap().len(), 3);
    }

    #[test]
    fn from_config_offline_backends() {
        let mut config = AppConfig::default();
        config.memory.backend = "in_memory".into();
        config.memory.embedder = "hash".into();

        let service = AgentService::from_config(&config).unwrap();
        assert_eq!(service.memory_backend(), "in_memory");
        assert_eq!(service.model(), config.model.id);
        assert_eq!(
            service.tool_names(),
            vec!["code_review", "knowledge_lookup", "memory_search"]
        );
    }

    #[test]
    fn from_config_rejects_unknown_embedder() {
        let mut config = AppConfig::default();
        config.memory.backend = "none".into();
        config.memory.embedder = "word2vec".into();
        assert!(AgentService::from_config(&config).is_err());
    }
}
