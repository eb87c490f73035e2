//! Recording publisher for tests and local runs without a broker.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use lessoncast_core::tasks::{TaskMessage, TaskType};

use crate::{PublishError, TaskPublisher};

/// Keeps every published message in order. Can be switched to fail.
#[derive(Default)]
pub struct MemoryTaskPublisher {
    published: Mutex<Vec<TaskMessage>>,
    failing: AtomicBool,
}

impl MemoryTaskPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// While set, every publish fails with [`PublishError::Rejected`].
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn published(&self) -> Vec<TaskMessage> {
        self.lock().clone()
    }

    pub fn published_of(&self, task_type: TaskType) -> Vec<TaskMessage> {
        self.published()
            .into_iter()
            .filter(|m| m.task_type == task_type)
            .collect()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<TaskMessage>> {
        self.published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TaskPublisher for MemoryTaskPublisher {
    async fn publish(&self, message: &TaskMessage) -> Result<(), PublishError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(PublishError::Rejected("broker unavailable".into()));
        }
        self.lock().push(message.clone());
        Ok(())
    }
}
