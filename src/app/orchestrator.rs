use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender};
use log::{info, warn};

use crate::app::journal::InteractionLog;
use crate::config::OrchestratorConfig;
use crate::llm::{
    client::CompletionBackend, conversation::Conversation, retry::RetryingCompletionProtocol,
};
use crate::manager::{
    dispatcher::IntentDispatcher,
    task_registry::{lock_registry, SharedRegistry},
};
use crate::models::message::Role;

pub const NOT_UNDERSTOOD: &str = "Request could not be understood; please rephrase.";

#[derive(Debug, Clone, PartialEq)]
pub enum Turn {
    Reply(String),
    Shutdown,
}

/// Resolves one user message at a time and applies it to the registry.
pub struct Orchestrator<B> {
    protocol: RetryingCompletionProtocol<B>,
    dispatcher: IntentDispatcher,
    registry: SharedRegistry,
    conversation: Conversation,
    journal: Box<dyn InteractionLog>,
    config: Arc<OrchestratorConfig>,
}

impl<B: CompletionBackend> Orchestrator<B> {
    pub fn new(
        backend: B,
        config: Arc<OrchestratorConfig>,
        dispatcher: IntentDispatcher,
        registry: SharedRegistry,
        journal: Box<dyn InteractionLog>,
    ) -> Self {
        let conversation = Conversation::new(
            config.prompts.prologue_messages(),
            config.orchestrator.max_history_turns,
        );
        Self {
            protocol: RetryingCompletionProtocol::new(backend, config.clone()),
            dispatcher,
            registry,
            conversation,
            journal,
            config,
        }
    }

    pub fn handle_message(&mut self, message: &str) -> Turn {
        let message = message.trim();
        let end_marker = self.config.orchestrator.end_marker.as_str();
        if !end_marker.is_empty() && message.contains(end_marker) {
            info!("End of conversation detected.");
            return Turn::Shutdown;
        }
        if message.is_empty() {
            return Turn::Reply("Please enter a request.".to_string());
        }

        let checkpoint = self.conversation.checkpoint();
        let retries = self.config.orchestrator.retry_times;
        let Some(command) = self.protocol.resolve(&mut self.conversation, message, retries) else {
            self.conversation.rollback(checkpoint);
            return Turn::Reply(NOT_UNDERSTOOD.to_string());
        };

        let outcome = {
            let mut registry = lock_registry(&self.registry);
            self.dispatcher.dispatch(&command, &mut registry)
        };

        let model_output = self
            .conversation
            .last()
            .filter(|m| m.role == Role::Assistant)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        if let Err(e) = self.journal.record_exchange(message, &model_output) {
            warn!("Failed to journal exchange: {}", e);
        }
        if outcome.is_success() {
            if let Err(e) = self.journal.record_task(outcome.task_name(), &command.details) {
                warn!("Failed to journal task '{}': {}", outcome.task_name(), e);
            }
        }

        let mut reply = outcome.to_string();
        if let Some(clarifications) = &command.clarifications {
            reply.push_str(" Clarification requested: ");
            reply.push_str(clarifications);
        }
        Turn::Reply(reply)
    }

    /// Drains `inbox` until shutdown or until every producer is gone.
    pub fn run(mut self, inbox: Receiver<String>, replies: Sender<String>) {
        while let Ok(message) = inbox.recv() {
            info!("Received message: {}", message);
            match self.handle_message(&message) {
                Turn::Reply(reply) => {
                    if replies.send(reply).is_err() {
                        break;
                    }
                }
                Turn::Shutdown => {
                    let _ = replies.send("Conversation ended.".to_string());
                    break;
                }
            }
        }
        info!("Orchestration loop stopped.");
    }
}
