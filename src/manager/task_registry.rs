use std::{
    cmp::Reverse,
    collections::{BinaryHeap, HashMap},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use log::{debug, info};

use crate::error::RegistryError;
use crate::models::task::{Task, TaskStatus};

pub type SharedRegistry = Arc<Mutex<TaskRegistry>>;

/// Locks the shared registry. A poisoned lock still guards a consistent
/// registry because every mutation checks before it writes.
pub fn lock_registry(registry: &SharedRegistry) -> MutexGuard<'_, TaskRegistry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct QueueEntry {
    priority: i64,
    seq: u64,
    name: String,
}

/// Min-heap on `(priority, insertion order)` with a name index over the same
/// live set. A name is in the heap exactly when it is in the index.
#[derive(Debug, Default)]
pub struct TaskRegistry {
    heap: BinaryHeap<Reverse<QueueEntry>>,
    index: HashMap<String, Task>,
    next_seq: u64,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedRegistry {
        Arc::new(Mutex::new(Self::new()))
    }

    pub fn enqueue(&mut self, mut task: Task, priority: i64) -> Result<&Task, RegistryError> {
        if self.index.contains_key(&task.name) {
            return Err(RegistryError::DuplicateName(task.name));
        }
        task.priority = priority;
        let seq = self.next_seq;
        self.next_seq += 1;

        let name = task.name.clone();
        self.heap.push(Reverse(QueueEntry {
            priority,
            seq,
            name: name.clone(),
        }));
        info!("Task '{}' enqueued with priority {}.", name, priority);
        Ok(self.index.entry(name).or_insert(task))
    }

    pub fn dequeue(&mut self) -> Option<Task> {
        let Reverse(entry) = self.heap.pop()?;
        let task = self.index.remove(&entry.name);
        debug!("Task '{}' dequeued.", entry.name);
        task
    }

    pub fn peek(&self) -> Option<&Task> {
        self.heap
            .peek()
            .and_then(|Reverse(entry)| self.index.get(&entry.name))
    }

    pub fn get_by_name(&self, name: &str) -> Option<&Task> {
        self.index.get(name)
    }

    pub(crate) fn get_by_name_mut(&mut self, name: &str) -> Option<&mut Task> {
        self.index.get_mut(name)
    }

    pub fn size(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Applies a transition that only the executor may drive.
    pub fn transition(
        &mut self,
        name: &str,
        to: TaskStatus,
        error_message: Option<String>,
    ) -> Result<&Task, RegistryError> {
        let task = self
            .index
            .get_mut(name)
            .ok_or_else(|| RegistryError::NotFound(name.to_string()))?;

        let allowed = matches!(
            (task.status, to),
            (TaskStatus::Pending, TaskStatus::Running)
                | (TaskStatus::Running, TaskStatus::Completed)
                | (TaskStatus::Running, TaskStatus::Failed)
        );
        if !allowed {
            return Err(RegistryError::IllegalTransition {
                name: name.to_string(),
                from: task.status,
                to,
            });
        }

        task.status = to;
        task.error_message = if to == TaskStatus::Failed { error_message } else { None };
        info!("Task status updated {}: {}", name, to);
        Ok(task)
    }

    /// Live tasks in the order `dequeue` would return them.
    pub fn snapshot(&self) -> Vec<Task> {
        let mut entries: Vec<&QueueEntry> = self.heap.iter().map(|Reverse(e)| e).collect();
        entries.sort();
        entries
            .into_iter()
            .filter_map(|entry| self.index.get(&entry.name).cloned())
            .collect()
    }
}
