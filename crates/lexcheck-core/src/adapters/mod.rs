//! Completion backend adapters
//!
//! Adapters implement [`CompletionClient`](crate::llm::CompletionClient) for
//! a concrete wire format.

pub mod openai;

pub use openai::{OpenAiClient, OpenAiConfig};
