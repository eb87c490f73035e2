//! Real-time delivery channels and addressing.
//!
//! Job-status traffic is high-frequency and per-user; classroom content and
//! discussion traffic is per-group or broadcast. They travel on separate
//! channels so a client can subscribe to either without the other.

use serde::{Deserialize, Serialize};

use crate::types::UserId;

/// Logical real-time channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelKind {
    /// Per-user job progress and completion updates.
    JobStatus,
    /// Group-addressed or broadcast content and discussion events.
    ContentDiscussion,
}

impl ChannelKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::JobStatus => "job_status",
            Self::ContentDiscussion => "content_discussion",
        }
    }
}

/// Who an event is addressed to.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Target {
    /// Every connection authenticated as this user.
    User(UserId),
    /// Every connection that joined this named group.
    Group(String),
}

impl std::fmt::Display for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{id}"),
            Self::Group(name) => write!(f, "group:{name}"),
        }
    }
}
