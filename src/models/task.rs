use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub name: String,
    pub model_name: String,
    pub parameters: BTreeMap<String, String>,
    pub status: TaskStatus,
    pub priority: i64,
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Replenishing,
    Pending,
    Running,
    Completed,
    Failed,
}

impl Task {
    /// Builds a task in the status its fields allow: PENDING when complete,
    /// REPLENISHING otherwise.
    pub fn new(name: String, model_name: String, parameters: BTreeMap<String, String>) -> Self {
        let mut task = Self {
            name,
            model_name,
            parameters,
            status: TaskStatus::Replenishing,
            priority: 0,
            error_message: None,
        };
        task.status = task.readiness();
        task
    }

    pub fn is_complete(&self) -> bool {
        !self.name.trim().is_empty() && !self.model_name.trim().is_empty()
    }

    pub fn readiness(&self) -> TaskStatus {
        if self.is_complete() {
            TaskStatus::Pending
        } else {
            TaskStatus::Replenishing
        }
    }

    pub fn summary(&self) -> String {
        let model = if self.model_name.is_empty() { "<unset>" } else { &self.model_name };
        let params = self
            .parameters
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join(", ");
        let mut line = format!(
            "'{}' [{}] model {} priority {} params {{{}}}",
            self.name, self.status, model, self.priority, params
        );
        if let Some(error) = &self.error_message {
            line.push_str(&format!(" error: {}", error));
        }
        line
    }
}

impl TaskStatus {
    /// Statuses in which SUPPLY may still change the task.
    pub fn accepts_supply(self) -> bool {
        matches!(self, TaskStatus::Replenishing | TaskStatus::Failed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            TaskStatus::Replenishing => "REPLENISHING",
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_task_status_follows_required_fields() {
        let ready = Task::new("train".into(), "yolov8n".into(), BTreeMap::new());
        assert_eq!(ready.status, TaskStatus::Pending);

        let missing_model = Task::new("train".into(), "  ".into(), BTreeMap::new());
        assert_eq!(missing_model.status, TaskStatus::Replenishing);
    }

    #[test]
    fn test_supply_allowed_statuses() {
        assert!(TaskStatus::Replenishing.accepts_supply());
        assert!(TaskStatus::Failed.accepts_supply());
        assert!(!TaskStatus::Pending.accepts_supply());
        assert!(!TaskStatus::Running.accepts_supply());
        assert!(!TaskStatus::Completed.accepts_supply());
    }

    #[test]
    fn test_summary_mentions_error() {
        let mut task = Task::new("eval".into(), "yolov5s".into(), BTreeMap::new());
        task.status = TaskStatus::Failed;
        task.error_message = Some("model not found".into());
        let line = task.summary();
        assert!(line.contains("FAILED"));
        assert!(line.contains("model not found"));
    }
}
