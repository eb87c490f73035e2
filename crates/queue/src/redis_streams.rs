//! Redis Streams publisher.
//!
//! - **Stream key**: `<prefix>:<task_type>`, e.g. `lessoncast:tasks:generate_content`
//! - **Entry fields**: `job_id`, `task_type`, `payload` (the JSON envelope)
//!
//! Workers read with consumer groups; delivery and acknowledgement are the
//! broker's concern.

use async_trait::async_trait;
use lessoncast_core::tasks::{TaskMessage, TaskType};
use redis::aio::ConnectionManager;
use tracing::instrument;

use crate::{PublishError, TaskPublisher};

/// Default stream key prefix.
pub const DEFAULT_STREAM_PREFIX: &str = "lessoncast:tasks";

/// Stream a task type is published on.
pub fn stream_key(prefix: &str, task_type: TaskType) -> String {
    format!("{prefix}:{task_type}")
}

#[derive(Clone)]
pub struct RedisTaskPublisher {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisTaskPublisher {
    /// Connect to Redis. The connection manager reconnects on its own after
    /// transient failures.
    pub async fn connect(redis_url: &str, prefix: impl Into<String>) -> Result<Self, PublishError> {
        let client =
            redis::Client::open(redis_url).map_err(|e| PublishError::Connection(e.to_string()))?;
        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| PublishError::Connection(e.to_string()))?;

        Ok(Self {
            conn,
            prefix: prefix.into(),
        })
    }

    pub fn stream_for(&self, task_type: TaskType) -> String {
        stream_key(&self.prefix, task_type)
    }
}

#[async_trait]
impl TaskPublisher for RedisTaskPublisher {
    #[instrument(
        skip(self, message),
        fields(job_id = %message.job_id, task_type = %message.task_type),
        err
    )]
    async fn publish(&self, message: &TaskMessage) -> Result<(), PublishError> {
        let payload = serde_json::to_string(message)
            .map_err(|e| PublishError::Serialization(e.to_string()))?;
        let stream = self.stream_for(message.task_type);

        let mut conn = self.conn.clone();
        let entry_id: String = redis::cmd("XADD")
            .arg(&stream)
            .arg("*")
            .arg("job_id")
            .arg(message.job_id.to_string())
            .arg("task_type")
            .arg(message.task_type.as_str())
            .arg("payload")
            .arg(&payload)
            .query_async(&mut conn)
            .await
            .map_err(|e| {
                if e.is_io_error() || e.is_connection_dropped() || e.is_connection_refusal() {
                    PublishError::Connection(e.to_string())
                } else {
                    PublishError::Command(format!("XADD failed: {e}"))
                }
            })?;

        tracing::debug!(stream = %stream, entry_id = %entry_id, "Task published");
        Ok(())
    }
}
