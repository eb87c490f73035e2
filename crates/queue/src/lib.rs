//! Task Publisher: hands typed task messages to the broker for AI workers.
//!
//! Publishing is fire-and-forget. A successful [`TaskPublisher::publish`]
//! means the broker accepted the message, nothing more. Failures are always
//! surfaced so the caller can roll back or report them.

use async_trait::async_trait;
use lessoncast_core::tasks::TaskMessage;

pub mod memory;
pub mod redis_streams;

pub use memory::MemoryTaskPublisher;
pub use redis_streams::RedisTaskPublisher;

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Broker connection error: {0}")]
    Connection(String),

    #[error("Broker command error: {0}")]
    Command(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The publisher refused the message without contacting a broker.
    #[error("Publish rejected: {0}")]
    Rejected(String),
}

#[async_trait]
pub trait TaskPublisher: Send + Sync {
    /// Make `message` visible to worker consumers.
    async fn publish(&self, message: &TaskMessage) -> Result<(), PublishError>;
}
