//! Reasoning stage client: bounded retries over a multi-turn conversation.
//!
//! Each attempt sends the whole conversation as a fresh request. A transport
//! failure, or a reply the caller's parser rejects, spends one attempt. When
//! the budget is spent the caller gets `None` and decides how to abort.

use std::sync::Arc;

use crate::error::Result;
use crate::llm::{CompletionRequest, LlmClient, Message};
use crate::retry::RetryPolicy;
use crate::session::Stage;
use crate::transcript::{AttemptOutcome, EntryContext, Transcript};

/// A complete conversation for one stage.
#[derive(Debug, Clone, Default)]
pub struct Conversation {
    pub messages: Vec<Message>,
    /// Review iteration this conversation belongs to, if any
    pub iteration: Option<u32>,
}

impl Conversation {
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            iteration: None,
        }
    }

    pub fn for_iteration(mut self, iteration: u32) -> Self {
        self.iteration = Some(iteration);
        self
    }
}

#[derive(Debug)]
enum AttemptError {
    Transport(String),
    Parse(String),
}

impl std::fmt::Display for AttemptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AttemptError::Transport(msg) => write!(f, "request failed: {}", msg),
            AttemptError::Parse(msg) => write!(f, "unusable reply: {}", msg),
        }
    }
}

pub struct ReasoningClient<L: LlmClient> {
    llm: Arc<L>,
    policy: RetryPolicy,
    transcript: Arc<Transcript>,
    max_tokens: Option<u32>,
}

impl<L: LlmClient> ReasoningClient<L> {
    pub fn new(llm: Arc<L>, policy: RetryPolicy, transcript: Arc<Transcript>) -> Self {
        Self {
            llm,
            policy,
            transcript,
            max_tokens: None,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Ask for a free-text reply.
    pub async fn ask(&self, stage: Stage, conversation: &Conversation) -> Option<String> {
        self.ask_with(stage, conversation, |text| Ok(text.to_string())).await
    }

    /// Ask and parse; a rejected reply counts as a failed attempt.
    pub async fn ask_with<T, P>(&self, stage: Stage, conversation: &Conversation, parse: P) -> Option<T>
    where
        P: Fn(&str) -> Result<T>,
    {
        let max_attempts = self.policy.max_attempts;
        let parse = &parse;

        self.policy
            .run(
                |attempt| async move {
                    log::info!("{}: attempt {}/{} ({})", stage, attempt, max_attempts, self.llm.model());
                    let context = EntryContext {
                        stage,
                        iteration: conversation.iteration,
                        attempt,
                        max_attempts,
                    };

                    let mut request = CompletionRequest::new(conversation.messages.clone());
                    request.max_tokens = self.max_tokens;

                    let reply = match self.llm.complete(request).await {
                        Ok(response) => response.content,
                        Err(e) => {
                            let err = AttemptError::Transport(e.to_string());
                            self.log_attempt(&context, &conversation.messages, AttemptOutcome::Failed(&err.to_string()));
                            return Err(err);
                        }
                    };

                    self.log_attempt(&context, &conversation.messages, AttemptOutcome::Reply(&reply));
                    parse(&reply).map_err(|e| AttemptError::Parse(e.to_string()))
                },
                |attempt, err| {
                    log::warn!("{}: attempt {}/{} failed: {}", stage, attempt, max_attempts, err);
                },
            )
            .await
    }

    fn log_attempt(&self, context: &EntryContext, messages: &[Message], outcome: AttemptOutcome<'_>) {
        if let Err(e) = self.transcript.record_attempt(context, messages, outcome) {
            log::warn!("Failed to write transcript entry: {}", e);
        }
    }
}
