use std::thread::JoinHandle;

use crossbeam_channel::{unbounded, Receiver, Sender};
use log::error;

use crate::manager::{
    dispatcher::IntentDispatcher,
    task_registry::{lock_registry, SharedRegistry, TaskRegistry},
};
use crate::models::{message::ExecutorMessage, task::Task};
use crate::worker::worker::spawn_worker_thread;

pub struct TaskManager {
    registry: SharedRegistry,
    sender: Sender<ExecutorMessage>,
    receiver: Receiver<ExecutorMessage>,
    default_priority: i64,
}

impl TaskManager {
    pub fn new(default_priority: i64) -> Self {
        let (sender, receiver) = unbounded();
        TaskManager {
            registry: TaskRegistry::shared(),
            sender,
            receiver,
            default_priority,
        }
    }

    pub fn start(&self) -> JoinHandle<()> {
        spawn_worker_thread(self.receiver.clone(), self.registry.clone())
    }

    pub fn registry(&self) -> SharedRegistry {
        self.registry.clone()
    }

    pub fn dispatcher(&self) -> IntentDispatcher {
        IntentDispatcher::new(self.sender.clone(), self.default_priority)
    }

    pub fn run_task(&self, name: &str) -> bool {
        self.signal(name, ExecutorMessage::Start(name.to_string()))
    }

    pub fn complete_task(&self, name: &str) -> bool {
        self.signal(name, ExecutorMessage::Complete(name.to_string()))
    }

    pub fn fail_task(&self, name: &str, reason: String) -> bool {
        self.signal(name, ExecutorMessage::Fail(name.to_string(), reason))
    }

    /// Hands the next task to the caller, removing it from the registry.
    pub fn next_task(&self) -> Option<Task> {
        lock_registry(&self.registry).dequeue()
    }

    pub fn task(&self, name: &str) -> Option<Task> {
        lock_registry(&self.registry).get_by_name(name).cloned()
    }

    pub fn list_tasks(&self) -> Vec<Task> {
        lock_registry(&self.registry).snapshot()
    }

    fn signal(&self, name: &str, message: ExecutorMessage) -> bool {
        if lock_registry(&self.registry).get_by_name(name).is_none() {
            return false;
        }
        if let Err(e) = self.sender.send(message) {
            error!("Failed to send executor message: {}", e);
            return false;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::models::task::TaskStatus;

    #[test]
    fn test_signals_require_known_task() {
        let manager = TaskManager::new(10);
        assert!(!manager.run_task("ghost"));

        lock_registry(&manager.registry())
            .enqueue(Task::new("t1".into(), "m1".into(), BTreeMap::new()), 1)
            .unwrap();
        assert!(manager.run_task("t1"));
    }

    #[test]
    fn test_operator_flow_through_worker() {
        let manager = TaskManager::new(10);
        lock_registry(&manager.registry())
            .enqueue(Task::new("t1".into(), "m1".into(), BTreeMap::new()), 1)
            .unwrap();

        // Process the queued signals on this thread instead of the worker.
        assert!(manager.run_task("t1"));
        assert!(manager.fail_task("t1", "oom".into()));
        while let Ok(message) = manager.receiver.try_recv() {
            crate::worker::worker::handle_message(message, &manager.registry);
        }

        let task = manager.task("t1").unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error_message.as_deref(), Some("oom"));
        assert_eq!(manager.next_task().unwrap().name, "t1");
        assert!(manager.list_tasks().is_empty());
    }
}
