pub mod dispatcher;
pub mod task_manager;
pub mod task_registry;
