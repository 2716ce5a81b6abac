//! LLM Client Layer - vision chat API integration and staged reasoning
//!
//! This module provides:
//! - Message types for multimodal conversations
//! - LlmClient trait for API abstraction
//! - OpenAiClient implementation
//! - ReasoningClient with bounded retries and transcript logging

pub mod client;
pub mod openai;
pub mod reasoner;
pub mod types;

pub use client::{LlmClient, LlmError, MockLlmClient, MockReply};
pub use openai::{OpenAiClient, OpenAiConfig};
pub use reasoner::{Conversation, ReasoningClient};
pub use types::{CompletionRequest, CompletionResponse, ContentPart, Message, Role, Usage};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_exports() {
        let _role = Role::User;
        let _conversation = Conversation::new(vec![Message::user("hi")]);
    }
}
