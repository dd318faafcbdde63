//! Model-server clients for LocalAgent.
//!
//! All providers implement the `localagent_core::Provider` trait.

pub mod embedder;
pub mod ollama;

pub use embedder::ProviderEmbedder;
pub use ollama::{OllamaProvider, model_matches};
