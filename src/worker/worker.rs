use std::thread::{self, JoinHandle};

use crossbeam_channel::Receiver;
use log::{error, info, warn};

use crate::error::RegistryError;
use crate::manager::task_registry::{lock_registry, SharedRegistry};
use crate::models::{message::ExecutorMessage, task::TaskStatus};

pub const STOPPED_REASON: &str = "stopped on user request";

/// Bridge between the registry and the outside executor. Runs until every
/// sender is dropped.
pub fn spawn_worker_thread(
    receiver: Receiver<ExecutorMessage>,
    registry: SharedRegistry) -> JoinHandle<()>
{
    thread::spawn(move || {
        loop {
            match receiver.recv() {
                Ok(message) => handle_message(message, &registry),
                Err(_) => {
                    info!("Executor channel closed, worker exiting.");
                    break;
                }
            }
        }
    })
}

pub fn handle_message(message: ExecutorMessage, registry: &SharedRegistry) {
    match message {
        ExecutorMessage::Start(name) => handle_status_update(&name, TaskStatus::Running, None, registry),
        ExecutorMessage::Complete(name) => handle_status_update(&name, TaskStatus::Completed, None, registry),
        ExecutorMessage::Fail(name, reason) => handle_status_update(&name, TaskStatus::Failed, Some(reason), registry),
        ExecutorMessage::Stop(name) => handle_stop_task(&name, registry),
    }
}

fn handle_stop_task(name: &str, registry: &SharedRegistry) {
    info!("Stop requested for task '{}'.", name);
    handle_status_update(name, TaskStatus::Failed, Some(STOPPED_REASON.to_string()), registry);
}

fn handle_status_update(
    name: &str,
    status: TaskStatus,
    reason: Option<String>,
    registry: &SharedRegistry)
{
    let mut guard = lock_registry(registry);
    match guard.transition(name, status, reason) {
        Ok(task) => info!("Task '{}' is now {}.", task.name, task.status),
        Err(e @ RegistryError::NotFound(_)) => error!("{}", e),
        Err(e) => warn!("{}", e),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use crossbeam_channel::unbounded;

    use super::*;
    use crate::manager::task_registry::TaskRegistry;
    use crate::models::task::Task;

    fn registry_with(name: &str) -> SharedRegistry {
        let registry = TaskRegistry::shared();
        lock_registry(&registry)
            .enqueue(Task::new(name.into(), "m1".into(), BTreeMap::new()), 1)
            .unwrap();
        registry
    }

    #[test]
    fn test_stop_confirms_running_task_as_failed() {
        let registry = registry_with("t1");
        handle_message(ExecutorMessage::Start("t1".into()), &registry);
        handle_message(ExecutorMessage::Stop("t1".into()), &registry);

        let guard = lock_registry(&registry);
        let task = guard.get_by_name("t1").unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error_message.as_deref(), Some(STOPPED_REASON));
    }

    #[test]
    fn test_illegal_update_leaves_task_alone() {
        let registry = registry_with("t1");
        handle_message(ExecutorMessage::Complete("t1".into()), &registry);
        assert_eq!(lock_registry(&registry).get_by_name("t1").unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn test_worker_thread_drains_channel() {
        let registry = registry_with("t1");
        let (sender, receiver) = unbounded();
        let handle = spawn_worker_thread(receiver, registry.clone());

        sender.send(ExecutorMessage::Start("t1".into())).unwrap();
        sender.send(ExecutorMessage::Complete("t1".into())).unwrap();
        drop(sender);
        handle.join().unwrap();

        assert_eq!(lock_registry(&registry).get_by_name("t1").unwrap().status, TaskStatus::Completed);
    }
}
