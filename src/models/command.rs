//! Typed form of the structured response returned by the completion backend.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Intent {
    Create,
    Supply,
    Interrupt,
    Query,
    Unknown(String),
}

impl Intent {
    /// Maps the wire label onto the closed set of intents. Matching is exact
    /// (ignoring case and surrounding whitespace) against a fixed alias table.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_ascii_lowercase().as_str() {
            "create_tasks" | "create" => Intent::Create,
            "supplement_tasks" | "supply_tasks" | "supplement" | "supply" => Intent::Supply,
            "interrupt_tasks" | "interrupt" => Intent::Interrupt,
            "query_tasks" | "query" => Intent::Query,
            _ => Intent::Unknown(label.to_string()),
        }
    }

    /// Keys of `details` that must be present for this intent.
    pub fn required_detail_keys(&self) -> &'static [&'static str] {
        match self {
            Intent::Create => &["task_name", "model_name", "parameters"],
            Intent::Supply => &["task_name", "parameters"],
            Intent::Interrupt | Intent::Query => &["task_name"],
            Intent::Unknown(_) => &[],
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::Create => f.write_str("Create_Tasks"),
            Intent::Supply => f.write_str("Supplement_Tasks"),
            Intent::Interrupt => f.write_str("Interrupt_Tasks"),
            Intent::Query => f.write_str("Query_Tasks"),
            Intent::Unknown(raw) => f.write_str(raw),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CommandDetails {
    pub task_name: String,
    pub model_name: Option<String>,
    pub parameters: Option<BTreeMap<String, String>>,
    pub priority: Option<i64>,
    pub task_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Command {
    pub intent: Intent,
    pub details: CommandDetails,
    pub clarifications: Option<String>,
}
