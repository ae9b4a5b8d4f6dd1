//! Project Translator LLM
//!
//! Conversation protocol types and the provider abstraction used by the
//! iterative and batch translation engines:
//! - Role-tagged `ConversationMessage` history with tool call / result pairing
//! - Tool schema catalog types
//! - `LlmProvider` trait plus an OpenAI-compatible adapter (also used for
//!   local OpenAI-style servers)

pub mod http_client;
pub mod openai;
pub mod provider;
pub mod types;

// Re-export main types
pub use http_client::build_http_client;
pub use openai::OpenAIProvider;
pub use provider::{create_provider, LlmProvider};
pub use types::*;
