//! # LocalAgent Core
//!
//! Domain types, traits, and error definitions for the LocalAgent runtime.
//! Every other crate depends inward on this one: the model client, memory
//! stores and tools implement the traits declared here, and the agent loop
//! only talks to those traits.

pub mod error;
pub mod memory;
pub mod message;
pub mod provider;
pub mod run;
pub mod task;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{AgentError, Error, Result};
pub use memory::{Embedder, MemoryEntry, MemoryStore};
pub use message::{Message, Role};
pub use provider::{Provider, ProviderRequest, ProviderResponse};
pub use run::{AgentRun, RunId, RunLimits, RunStatus, ToolInvocation};
pub use task::Task;
pub use tool::{Observation, Tool, ToolRegistry, ToolResult};
