//! Completion backend seam and its OpenAI-compatible HTTP implementation.

use std::time::Duration;

use log::{debug, warn};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};

use crate::config::CompletionParams;
use crate::error::BackendError;
use crate::models::message::ChatMessage;

/// Anything that can turn a conversation into one text completion.
pub trait CompletionBackend {
    fn complete(
        &self,
        history: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<String, BackendError>;
}

pub struct HttpCompletionClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl HttpCompletionClient {
    pub fn new(api_key: String, api_url: String, timeout: Duration) -> Result<Self, BackendError> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            api_key,
            api_url,
        })
    }

    /// Builds a client whose key is read from the variable named by
    /// `params.api_key_env`.
    pub fn from_params(params: &CompletionParams) -> Result<Self, BackendError> {
        let api_key = std::env::var(&params.api_key_env)
            .map_err(|_| BackendError::MissingApiKey(params.api_key_env.clone()))?;
        Self::new(
            api_key,
            params.api_url.clone(),
            Duration::from_secs(params.timeout_secs),
        )
    }
}

impl CompletionBackend for HttpCompletionClient {
    fn complete(
        &self,
        history: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<String, BackendError> {
        if params.stream {
            warn!("Streaming completions are not supported, requesting a single response.");
        }
        let request = ChatRequest {
            model: &params.model_name,
            messages: history,
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            frequency_penalty: params.frequency_penalty,
            n: params.n,
            stop: &params.stop,
            stream: false,
        };
        debug!("Requesting completion over {} messages.", history.len());

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(BackendError::Status {
                code: status.as_u16(),
                body,
            });
        }

        let completion: ChatResponse = response.json()?;
        completion
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(BackendError::EmptyResponse)
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
    temperature: f32,
    top_p: f32,
    top_k: u32,
    frequency_penalty: f32,
    n: u32,
    #[serde(skip_serializing_if = "no_stop")]
    stop: &'a [String],
    stream: bool,
}

fn no_stop(stop: &&[String]) -> bool {
    stop.is_empty()
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}
