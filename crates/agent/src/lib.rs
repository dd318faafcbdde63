//! The core agent loop: the heart of LocalAgent.
//!
//! A run follows a bounded **Select → Dispatch → Observe → Decide** cycle:
//!
//! 1. **Recall** similar past tasks from the memory store
//! 2. **Prompt** the model with the task, recalled answers and the trace so far
//! 3. **Parse** the reply as a tool call or a final answer
//! 4. **If a tool call**: dispatch it, record the observation, loop back to step 2
//! 5. **If a final answer**: finish and write the outcome back to memory
//!
//! The loop also stops at the iteration or wall-clock ceiling, returning the
//! partial trace with a limit status.

pub mod assembler;
pub mod mcp;
pub mod parser;
pub mod prompt;
pub mod runner;
pub mod service;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use assembler::{AgentResponse, RunSummary, extract_code};
pub use mcp::{ContextRequest, ContextResponse, ContextStatus, handle_context};
pub use parser::Decision;
pub use runner::AgentLoop;
pub use service::{AgentService, DEFAULT_HISTORY_LIMIT};
