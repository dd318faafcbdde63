//! Shared test helpers for agent tests.

use localagent_core::error::ProviderError;
use localagent_core::message::Message;
use localagent_core::provider::{Provider, ProviderRequest, ProviderResponse, Usage};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// One scripted provider outcome.
#[derive(Clone)]
pub enum Step {
    Reply(String),
    Fail(ProviderError),
}

/// A mock provider that plays back a script of replies.
///
/// Once the script runs out, the `repeat` step (if any) is returned
/// forever; otherwise calls fail with `MalformedResponse`. Every request is
/// recorded for later inspection.
pub struct ScriptedProvider {
    script: Mutex<VecDeque<Step>>,
    repeat: Option<Step>,
    delay: Duration,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Mutex::new(replies.into_iter().map(|r| Step::Reply(r.into())).collect()),
            repeat: None,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// A provider that gives the same reply on every call.
    pub fn repeating(reply: impl Into<String>) -> Self {
        Self::new(Vec::<String>::new()).then_repeat(Step::Reply(reply.into()))
    }

    /// A provider whose every call fails.
    pub fn failing(error: ProviderError) -> Self {
        Self::new(Vec::<String>::new()).then_repeat(Step::Fail(error))
    }

    pub fn then_repeat(mut self, step: Step) -> Self {
        self.repeat = Some(step);
        self
    }

    /// Sleep this long (on the tokio clock) before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        let step = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .or_else(|| self.repeat.clone());

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match step {
            Some(Step::Reply(text)) => Ok(ProviderResponse {
                message: Message::assistant(text),
                usage: Some(Usage {
                    prompt_tokens: 10,
                    completion_tokens: 5,
                    total_tokens: 15,
                }),
                model,
            }),
            Some(Step::Fail(e)) => Err(e),
            None => Err(ProviderError::MalformedResponse("script exhausted".into())),
        }
    }
}

/// A reply that calls `tool` with `input`.
pub fn action(tool: &str, input: serde_json::Value) -> String {
    format!("Thought: I should use {tool}.\nAction: {tool}\nAction Input: {input}")
}

/// A reply that finishes the run.
pub fn final_answer(answer: &str) -> String {
    format!("Thought: I now know the final answer\nFinal Answer: {answer}")
}
