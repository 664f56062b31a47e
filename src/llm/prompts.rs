use serde::{Deserialize, Serialize};

use crate::models::message::ChatMessage;

const ROLE_PLAY: &str = r#"You analyze user text to find task-related intents. Map every request to exactly one of:
1. Create_Tasks: start a new task. Extract the task name, the model name and all parameters.
2. Supplement_Tasks: add or update parameters of an existing task.
3. Interrupt_Tasks: stop a task that is currently running.
4. Query_Tasks: report the status of a task."#;

const ROLE_STEPS: &str = r#"Reason step by step:
1. Read the input and look for words that reveal the intent.
2. Pick the single best matching intent category.
3. Extract the task name, model name, parameters and priority (a lower number runs earlier) when given.
4. Check that every field required by the intent is present. If something is missing, say what in "clarifications"."#;

const ROLE_RULES: &str = r#"Answer with JSON only, in exactly this shape:
{
  "intent": "Create_Tasks | Supplement_Tasks | Interrupt_Tasks | Query_Tasks",
  "details": {
    "task_name": "<task name>",
    "model_name": "<model name>",
    "parameters": { "<key>": "<value>" },
    "priority": <integer, optional>,
    "task_id": "<task id, optional>"
  },
  "clarifications": "<question for the user, or empty>"
}"#;

const MISSING_KEYS: &str = "Your JSON response is missing the required keys: {keys}. Answer again with every required key. If a value is unknown, set it to null.";

const FORMAT_ERROR: &str = "Your response could not be parsed as JSON: {error}. Answer again with valid JSON in the required shape and nothing else.";

/// Prompt texts used by the completion protocol. Built once at startup and
/// only read afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PromptSpace {
    pub prologue: Vec<String>,
    pub missing_keys: String,
    pub format_error: String,
}

impl Default for PromptSpace {
    fn default() -> Self {
        Self {
            prologue: vec![ROLE_PLAY.into(), ROLE_STEPS.into(), ROLE_RULES.into()],
            missing_keys: MISSING_KEYS.into(),
            format_error: FORMAT_ERROR.into(),
        }
    }
}

impl PromptSpace {
    pub fn prologue_messages(&self) -> Vec<ChatMessage> {
        self.prologue.iter().map(ChatMessage::system).collect()
    }

    pub fn missing_keys_message(&self, keys: &[String]) -> String {
        self.missing_keys.replace("{keys}", &keys.join(", "))
    }

    pub fn format_error_message(&self, error: &str) -> String {
        self.format_error.replace("{error}", error)
    }
}
