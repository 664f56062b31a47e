//! Bounded corrective loop around the completion backend.
//!
//! Every failed attempt, whether the backend errored or the reply did not
//! parse, costs one unit of the retry budget. A budget of `n` therefore means
//! at most `n` backend calls for one user message.

use std::sync::Arc;

use log::{error, info, warn};

use crate::config::OrchestratorConfig;
use crate::error::BackendError;
use crate::llm::{
    client::CompletionBackend,
    conversation::Conversation,
    parser::{self, ParseFailure},
};
use crate::models::{command::Command, message::ChatMessage};

enum Attempt {
    Parsed(String, Command),
    Rejected(String, ParseFailure),
    Unreachable(BackendError),
}

pub struct RetryingCompletionProtocol<B> {
    backend: B,
    config: Arc<OrchestratorConfig>,
}

impl<B: CompletionBackend> RetryingCompletionProtocol<B> {
    pub fn new(backend: B, config: Arc<OrchestratorConfig>) -> Self {
        Self { backend, config }
    }

    pub fn resolve(
        &self,
        conversation: &mut Conversation,
        user_message: &str,
        max_retries: u32,
    ) -> Option<Command> {
        conversation.push_request(ChatMessage::user(user_message));

        let mut budget = max_retries;
        while budget > 0 {
            match self.attempt(conversation) {
                Attempt::Parsed(raw, command) => {
                    conversation.push(ChatMessage::assistant(raw));
                    info!(
                        "Resolved intent {} after {} failed attempt(s).",
                        command.intent,
                        max_retries - budget
                    );
                    return Some(command);
                }
                Attempt::Rejected(raw, failure) => {
                    budget -= 1;
                    warn!("Response format error ({} retries left): {}", budget, failure);
                    conversation.push(ChatMessage::assistant(raw));
                    conversation.push(ChatMessage::system(self.corrective_message(&failure)));
                }
                Attempt::Unreachable(e) => {
                    budget -= 1;
                    warn!("Error communicating with LLM ({} retries left): {}", budget, e);
                }
            }
        }

        error!("No valid structured response after {} attempt(s).", max_retries);
        None
    }

    fn attempt(&self, conversation: &Conversation) -> Attempt {
        let raw = match self
            .backend
            .complete(&conversation.messages(), &self.config.llm)
        {
            Ok(raw) => raw,
            Err(e) => return Attempt::Unreachable(e),
        };
        match parser::parse(&raw) {
            Ok(command) => Attempt::Parsed(raw, command),
            Err(failure) => Attempt::Rejected(raw, failure),
        }
    }

    fn corrective_message(&self, failure: &ParseFailure) -> String {
        match failure {
            ParseFailure::MissingKeys(keys) => self.config.prompts.missing_keys_message(keys),
            ParseFailure::MalformedJson(detail) => self.config.prompts.format_error_message(detail),
        }
    }
}
