// OpenAI Text Generator
//
// This crate provides the remote text-generation backend for WebForge.
// It implements the TextGenerator trait from webforge-core against the
// OpenAI chat-completions API (or any compatible server via base_url).

mod provider;
mod types;

pub use provider::{OpenAiConfig, OpenAiTextGenerator, DEFAULT_BASE_URL, DEFAULT_MODEL};
pub use types::{ChatMessage, ChatRequest, MessageRole};

// Re-export core trait for convenience
pub use webforge_core::TextGenerator;
