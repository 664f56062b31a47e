//! Turns raw completion text into a [`Command`].
//!
//! Decoding is strict JSON. Text that decodes but lacks required keys is
//! reported as [`ParseFailure::MissingKeys`] so the caller can ask the model
//! to correct itself.

use std::collections::BTreeMap;

use serde_json::{Map, Value};
use thiserror::Error;

use crate::models::command::{Command, CommandDetails, Intent};

const REQUIRED_KEYS: [&str; 3] = ["intent", "details", "clarifications"];

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseFailure {
    #[error("malformed JSON: {0}")]
    MalformedJson(String),

    #[error("missing keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),
}

pub fn parse(raw: &str) -> Result<Command, ParseFailure> {
    let text = strip_code_fence(raw.trim());
    let value: Value =
        serde_json::from_str(text).map_err(|e| ParseFailure::MalformedJson(e.to_string()))?;

    let Some(object) = value.as_object() else {
        return Err(ParseFailure::MissingKeys(
            REQUIRED_KEYS.iter().map(|k| k.to_string()).collect(),
        ));
    };

    let intent = object.get("intent").and_then(Value::as_str).map(Intent::from_label);
    let details = object.get("details").and_then(Value::as_object);

    let mut missing = Vec::new();
    if intent.is_none() {
        missing.push("intent".to_string());
    }
    if details.is_none() {
        missing.push("details".to_string());
    }
    if !object.contains_key("clarifications") {
        missing.push("clarifications".to_string());
    }
    if let (Some(intent), Some(details)) = (&intent, details) {
        missing.extend(
            intent
                .required_detail_keys()
                .iter()
                .filter(|key| !has_detail(details, key))
                .map(|key| format!("details.{}", key)),
        );
    }

    match (intent, details) {
        (Some(intent), Some(details)) if missing.is_empty() => Ok(Command {
            intent,
            details: read_details(details),
            clarifications: object
                .get("clarifications")
                .and_then(Value::as_str)
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from),
        }),
        _ => Err(ParseFailure::MissingKeys(missing)),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

fn has_detail(details: &Map<String, Value>, key: &str) -> bool {
    match key {
        "task_name" => details
            .get(key)
            .and_then(Value::as_str)
            .is_some_and(|name| !name.trim().is_empty()),
        _ => details.contains_key(key),
    }
}

fn read_details(details: &Map<String, Value>) -> CommandDetails {
    CommandDetails {
        task_name: details
            .get("task_name")
            .and_then(Value::as_str)
            .map(|s| s.trim().to_string())
            .unwrap_or_default(),
        model_name: details
            .get("model_name")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(String::from),
        parameters: details
            .get("parameters")
            .and_then(Value::as_object)
            .map(read_parameters),
        priority: details.get("priority").and_then(|p| match p {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }),
        task_id: details.get("task_id").and_then(scalar_to_string),
    }
}

fn read_parameters(parameters: &Map<String, Value>) -> BTreeMap<String, String> {
    parameters
        .iter()
        .filter_map(|(key, value)| scalar_to_string(value).map(|v| (key.clone(), v)))
        .collect()
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}
