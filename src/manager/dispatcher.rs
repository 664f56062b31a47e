use std::fmt;

use crossbeam_channel::Sender;
use log::{error, info, warn};

use crate::manager::task_registry::TaskRegistry;
use crate::models::{
    command::{Command, Intent},
    message::ExecutorMessage,
    task::{Task, TaskStatus},
};

/// Result of applying one command. Tasks are snapshots taken after the
/// transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Created(Task),
    Supplied(Task),
    Interrupted(Task),
    QueryResult(Task),
    DuplicateTask(String),
    TaskNotFound(String),
    InvalidState(String, TaskStatus),
    StopUndelivered(String),
    UnknownIntent(String),
}

impl Outcome {
    pub fn task_name(&self) -> &str {
        match self {
            Outcome::Created(task)
            | Outcome::Supplied(task)
            | Outcome::Interrupted(task)
            | Outcome::QueryResult(task) => &task.name,
            Outcome::DuplicateTask(name)
            | Outcome::TaskNotFound(name)
            | Outcome::InvalidState(name, _)
            | Outcome::StopUndelivered(name) => name,
            Outcome::UnknownIntent(_) => "",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Outcome::Created(_) | Outcome::Supplied(_) | Outcome::Interrupted(_) | Outcome::QueryResult(_)
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Created(task) if task.status == TaskStatus::Replenishing => write!(
                f,
                "Created task '{}', waiting for more information (status {}).",
                task.name, task.status
            ),
            Outcome::Created(task) => write!(
                f,
                "Created task '{}' on model {} with priority {} (status {}).",
                task.name, task.model_name, task.priority, task.status
            ),
            Outcome::Supplied(task) => {
                write!(f, "Updated task '{}' (status {}).", task.name, task.status)
            }
            Outcome::Interrupted(task) => {
                write!(f, "Sent stop signal for task '{}'.", task.name)
            }
            Outcome::QueryResult(task) => write!(f, "Task {}", task.summary()),
            Outcome::DuplicateTask(name) => write!(
                f,
                "Task '{}' already exists. Choose another name or supplement the existing task.",
                name
            ),
            Outcome::TaskNotFound(name) => {
                write!(f, "Task '{}' not found. Please check the task name.", name)
            }
            Outcome::InvalidState(name, status) => write!(
                f,
                "Task '{}' is {} and cannot accept this request.",
                name, status
            ),
            Outcome::StopUndelivered(name) => write!(
                f,
                "Could not deliver the stop signal for task '{}': the executor is unavailable.",
                name
            ),
            Outcome::UnknownIntent(raw) => {
                write!(f, "Unknown intent '{}'. Please rephrase the request.", raw)
            }
        }
    }
}

/// Applies validated commands to a registry. Holds no tasks of its own.
pub struct IntentDispatcher {
    stop_signals: Sender<ExecutorMessage>,
    default_priority: i64,
}

impl IntentDispatcher {
    pub fn new(stop_signals: Sender<ExecutorMessage>, default_priority: i64) -> Self {
        Self {
            stop_signals,
            default_priority,
        }
    }

    pub fn dispatch(&self, command: &Command, registry: &mut TaskRegistry) -> Outcome {
        let name = command.details.task_name.as_str();
        match &command.intent {
            Intent::Create => self.create(command, registry),
            Intent::Supply => self.supply(command, registry),
            Intent::Interrupt => self.interrupt(name, registry),
            Intent::Query => match registry.get_by_name(name) {
                Some(task) => Outcome::QueryResult(task.clone()),
                None => {
                    error!("[Query] Task not found: {}", name);
                    Outcome::TaskNotFound(name.to_string())
                }
            },
            Intent::Unknown(raw) => {
                error!("[Error] Unknown intent: {}", raw);
                Outcome::UnknownIntent(raw.clone())
            }
        }
    }

    fn create(&self, command: &Command, registry: &mut TaskRegistry) -> Outcome {
        let details = &command.details;
        let task = Task::new(
            details.task_name.clone(),
            details.model_name.clone().unwrap_or_default(),
            details.parameters.clone().unwrap_or_default(),
        );
        let priority = details.priority.unwrap_or(self.default_priority);

        match registry.enqueue(task, priority) {
            Ok(task) => Outcome::Created(task.clone()),
            Err(e) => {
                warn!("[Create] {}", e);
                Outcome::DuplicateTask(details.task_name.clone())
            }
        }
    }

    fn supply(&self, command: &Command, registry: &mut TaskRegistry) -> Outcome {
        let details = &command.details;
        let Some(task) = registry.get_by_name_mut(&details.task_name) else {
            error!("[Supply] Task not found: {}", details.task_name);
            return Outcome::TaskNotFound(details.task_name.clone());
        };
        if !task.status.accepts_supply() {
            info!("Task is not in replenishing or failed status, no need to supply.");
            return Outcome::InvalidState(task.name.clone(), task.status);
        }

        if let Some(parameters) = &details.parameters {
            task.parameters
                .extend(parameters.iter().map(|(k, v)| (k.clone(), v.clone())));
        }
        if let Some(model) = details.model_name.as_deref().filter(|m| !m.trim().is_empty()) {
            task.model_name = model.to_string();
        }
        // A failed task is revived: its old error no longer applies.
        task.error_message = None;
        task.status = task.readiness();
        info!("Task '{}' supplied, status {}.", task.name, task.status);
        Outcome::Supplied(task.clone())
    }

    fn interrupt(&self, name: &str, registry: &TaskRegistry) -> Outcome {
        match registry.get_by_name(name) {
            Some(task) if task.status == TaskStatus::Running => {
                match self.stop_signals.send(ExecutorMessage::Stop(name.to_string())) {
                    Ok(()) => Outcome::Interrupted(task.clone()),
                    Err(e) => {
                        error!("Failed to deliver stop signal for '{}': {}", name, e);
                        Outcome::StopUndelivered(name.to_string())
                    }
                }
            }
            Some(task) => {
                warn!("[Interrupt] Task not Running: {}", name);
                Outcome::InvalidState(name.to_string(), task.status)
            }
            None => {
                error!("[Interrupt] Task not found: {}", name);
                Outcome::TaskNotFound(name.to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crossbeam_channel::{unbounded, Receiver};

    use super::*;
    use crate::models::command::CommandDetails;

    fn dispatcher() -> (IntentDispatcher, Receiver<ExecutorMessage>) {
        let (sender, receiver) = unbounded();
        (IntentDispatcher::new(sender, 10), receiver)
    }

    fn command(intent: Intent, name: &str) -> Command {
        Command {
            intent,
            details: CommandDetails {
                task_name: name.into(),
                ..CommandDetails::default()
            },
            clarifications: None,
        }
    }

    fn create(name: &str, model: Option<&str>) -> Command {
        let mut cmd = command(Intent::Create, name);
        cmd.details.model_name = model.map(String::from);
        cmd.details.parameters = Some(BTreeMap::new());
        cmd
    }

    fn supply(name: &str, key: &str, value: &str) -> Command {
        let mut cmd = command(Intent::Supply, name);
        cmd.details.parameters = Some(BTreeMap::from([(key.to_string(), value.to_string())]));
        cmd
    }

    #[test]
    fn test_query_missing_task() {
        let (dispatcher, _rx) = dispatcher();
        let mut registry = TaskRegistry::new();
        let outcome = dispatcher.dispatch(&command(Intent::Query, "ghost"), &mut registry);
        assert_eq!(outcome, Outcome::TaskNotFound("ghost".into()));
    }

    #[test]
    fn test_create_twice_is_rejected() {
        let (dispatcher, _rx) = dispatcher();
        let mut registry = TaskRegistry::new();

        let first = dispatcher.dispatch(&create("t1", Some("m1")), &mut registry);
        assert!(matches!(first, Outcome::Created(ref t) if t.status == TaskStatus::Pending));

        let second = dispatcher.dispatch(&create("t1", Some("m2")), &mut registry);
        assert_eq!(second, Outcome::DuplicateTask("t1".into()));
        assert_eq!(registry.get_by_name("t1").unwrap().model_name, "m1");
        assert_eq!(registry.size(), 1);
    }

    #[test]
    fn test_create_uses_requested_priority() {
        let (dispatcher, _rx) = dispatcher();
        let mut registry = TaskRegistry::new();
        let mut cmd = create("urgent", Some("m1"));
        cmd.details.priority = Some(1);
        dispatcher.dispatch(&cmd, &mut registry);
        dispatcher.dispatch(&create("routine", Some("m1")), &mut registry);

        assert_eq!(registry.peek().unwrap().name, "urgent");
        assert_eq!(registry.get_by_name("routine").unwrap().priority, 10);
    }

    #[test]
    fn test_supply_completes_replenishing_task() {
        let (dispatcher, _rx) = dispatcher();
        let mut registry = TaskRegistry::new();
        let created = dispatcher.dispatch(&create("t1", None), &mut registry);
        assert!(matches!(created, Outcome::Created(ref t) if t.status == TaskStatus::Replenishing));

        let mut cmd = supply("t1", "epochs", "10");
        cmd.details.model_name = Some("yolov8n".into());
        let outcome = dispatcher.dispatch(&cmd, &mut registry);

        let Outcome::Supplied(task) = outcome else { panic!("expected Supplied") };
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.parameters.get("epochs").map(String::as_str), Some("10"));
    }

    #[test]
    fn test_supply_rejected_outside_replenishing_or_failed() {
        let (dispatcher, _rx) = dispatcher();
        let mut registry = TaskRegistry::new();
        dispatcher.dispatch(&create("t1", Some("m1")), &mut registry);

        let outcome = dispatcher.dispatch(&supply("t1", "lr", "0.1"), &mut registry);
        assert_eq!(outcome, Outcome::InvalidState("t1".into(), TaskStatus::Pending));
        assert!(registry.get_by_name("t1").unwrap().parameters.is_empty());

        registry.transition("t1", TaskStatus::Running, None).unwrap();
        let outcome = dispatcher.dispatch(&supply("t1", "lr", "0.1"), &mut registry);
        assert_eq!(outcome, Outcome::InvalidState("t1".into(), TaskStatus::Running));

        registry.transition("t1", TaskStatus::Completed, None).unwrap();
        let outcome = dispatcher.dispatch(&supply("t1", "lr", "0.1"), &mut registry);
        assert_eq!(outcome, Outcome::InvalidState("t1".into(), TaskStatus::Completed));
        assert!(registry.get_by_name("t1").unwrap().parameters.is_empty());
    }

    #[test]
    fn test_supply_revives_failed_task() {
        let (dispatcher, _rx) = dispatcher();
        let mut registry = TaskRegistry::new();
        dispatcher.dispatch(&create("t1", Some("m1")), &mut registry);
        registry.transition("t1", TaskStatus::Running, None).unwrap();
        registry
            .transition("t1", TaskStatus::Failed, Some("bad input".into()))
            .unwrap();

        let outcome = dispatcher.dispatch(&supply("t1", "input", "/data/fixed.jpg"), &mut registry);
        let Outcome::Supplied(task) = outcome else { panic!("expected Supplied") };
        assert_eq!(task.status, TaskStatus::Pending);
        assert!(task.error_message.is_none());
    }

    #[test]
    fn test_interrupt_only_running() {
        let (dispatcher, rx) = dispatcher();
        let mut registry = TaskRegistry::new();
        dispatcher.dispatch(&create("t1", Some("m1")), &mut registry);

        let outcome = dispatcher.dispatch(&command(Intent::Interrupt, "t1"), &mut registry);
        assert_eq!(outcome, Outcome::InvalidState("t1".into(), TaskStatus::Pending));
        assert!(rx.try_recv().is_err());

        registry.transition("t1", TaskStatus::Running, None).unwrap();
        let outcome = dispatcher.dispatch(&command(Intent::Interrupt, "t1"), &mut registry);
        assert!(matches!(outcome, Outcome::Interrupted(_)));
        assert_eq!(rx.try_recv().unwrap(), ExecutorMessage::Stop("t1".into()));
        // Status stays RUNNING until the executor confirms.
        assert_eq!(registry.get_by_name("t1").unwrap().status, TaskStatus::Running);
    }

    #[test]
    fn test_unknown_intent() {
        let (dispatcher, _rx) = dispatcher();
        let mut registry = TaskRegistry::new();
        let outcome = dispatcher.dispatch(
            &command(Intent::Unknown("Delete_Tasks".into()), "t1"),
            &mut registry,
        );
        assert_eq!(outcome, Outcome::UnknownIntent("Delete_Tasks".into()));
        assert!(outcome.to_string().contains("Delete_Tasks"));
    }

    #[test]
    fn test_supply_and_interrupt_missing_task() {
        let (dispatcher, rx) = dispatcher();
        let mut registry = TaskRegistry::new();

        let outcome = dispatcher.dispatch(&supply("ghost", "lr", "0.1"), &mut registry);
        assert_eq!(outcome, Outcome::TaskNotFound("ghost".into()));

        let outcome = dispatcher.dispatch(&command(Intent::Interrupt, "ghost"), &mut registry);
        assert_eq!(outcome, Outcome::TaskNotFound("ghost".into()));

        assert!(rx.try_recv().is_err());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_interrupt_without_executor() {
        let (dispatcher, rx) = dispatcher();
        let mut registry = TaskRegistry::new();
        dispatcher.dispatch(&create("t1", Some("m1")), &mut registry);
        registry.transition("t1", TaskStatus::Running, None).unwrap();
        drop(rx);

        let outcome = dispatcher.dispatch(&command(Intent::Interrupt, "t1"), &mut registry);
        assert_eq!(outcome, Outcome::StopUndelivered("t1".into()));
        assert!(!outcome.is_success());
        assert!(outcome.to_string().contains("executor is unavailable"));
        assert_eq!(registry.get_by_name("t1").unwrap().status, TaskStatus::Running);
    }
}
