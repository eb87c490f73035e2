//! Real-time event payloads and their wire frames.
//!
//! Every frame pushed to a client has the shape
//! `{ "event": <name>, "data": <payload>, "timestamp": <rfc3339> }`.
//!
//! Accepted events:
//!
//! | Event          | Channel              | `data`                                  |
//! |----------------|----------------------|-----------------------------------------|
//! | `JobUpdated`   | job-status           | [`JobStatusEvent`] after a state change |
//! | `JobProgress`  | job-status           | [`JobStatusEvent`] for a worker heartbeat |
//! | any other name | content/discussion   | opaque JSON supplied by the caller      |

use serde::Serialize;

use crate::channels::ChannelKind;
use crate::status::{JobStatus, ProductType};
use crate::types::{JobId, Timestamp};

/// A job changed status or artifacts.
pub const EVENT_JOB_UPDATED: &str = "JobUpdated";

/// A worker reported progress without changing the job.
pub const EVENT_JOB_PROGRESS: &str = "JobProgress";

/// Job-status payload: `{ job_id, status, ...fields }`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JobStatusEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub product_type: Option<ProductType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_ref: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub product_refs: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_count: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub last_modified_at: Timestamp,
}

/// Content/discussion payload whose shape is owned by the producing feature.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContentEvent {
    pub name: String,
    pub payload: serde_json::Value,
}

impl ContentEvent {
    pub fn new(name: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }
}

/// Closed set of notifications understood by the router.
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    JobUpdated(JobStatusEvent),
    JobProgress(JobStatusEvent),
    Content(ContentEvent),
}

impl Notification {
    /// The channel this notification travels on.
    pub fn channel(&self) -> ChannelKind {
        match self {
            Self::JobUpdated(_) | Self::JobProgress(_) => ChannelKind::JobStatus,
            Self::Content(_) => ChannelKind::ContentDiscussion,
        }
    }

    pub fn event_name(&self) -> &str {
        match self {
            Self::JobUpdated(_) => EVENT_JOB_UPDATED,
            Self::JobProgress(_) => EVENT_JOB_PROGRESS,
            Self::Content(event) => &event.name,
        }
    }

    /// Serialize into the text frame pushed over the socket.
    pub fn to_frame(&self, timestamp: Timestamp) -> Result<String, serde_json::Error> {
        let data = match self {
            Self::JobUpdated(event) | Self::JobProgress(event) => serde_json::to_value(event)?,
            Self::Content(event) => event.payload.clone(),
        };
        let frame = serde_json::json!({
            "event": self.event_name(),
            "data": data,
            "timestamp": timestamp,
        });
        serde_json::to_string(&frame)
    }
}
