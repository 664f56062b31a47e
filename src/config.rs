//! Startup configuration, read once from TOML and shared immutably.

use std::{fs, path::Path};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::llm::prompts::PromptSpace;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub llm: CompletionParams,
    pub orchestrator: LoopSettings,
    pub prompts: PromptSpace,
}

/// Parameters sent with every completion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompletionParams {
    pub api_url: String,
    pub api_key_env: String,
    pub model_name: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: u32,
    pub frequency_penalty: f32,
    pub n: u32,
    pub stop: Vec<String>,
    pub stream: bool,
    pub timeout_secs: u64,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            api_url: "https://api.siliconflow.cn/v1/chat/completions".into(),
            api_key_env: "LLM_API_KEY".into(),
            model_name: "Qwen/Qwen2.5-72B-Instruct".into(),
            max_tokens: 1024,
            temperature: 0.7,
            top_p: 0.7,
            top_k: 50,
            frequency_penalty: 0.5,
            n: 1,
            stop: Vec::new(),
            stream: false,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoopSettings {
    /// Attempts allowed per user message before giving up.
    pub retry_times: u32,
    pub queue_capacity: usize,
    /// Priority used when a create request names none. Lower runs first.
    pub default_priority: i64,
    pub max_history_turns: usize,
    pub end_marker: String,
    pub journal_path: Option<String>,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            retry_times: 5,
            queue_capacity: 20,
            default_priority: 10,
            max_history_turns: 40,
            end_marker: "END_OF_CONVERSATION".into(),
            journal_path: None,
        }
    }
}

impl OrchestratorConfig {
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Loads the file at `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            log::warn!("Config {} not found, using defaults.", path.display());
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}
