//! Dispatches notifications to the hub of their channel.
//!
//! The channel is decided by the [`Notification`] variant at the call site,
//! never inferred from event or group names. Delivery is best-effort: with
//! no subscriber the event is dropped, and a reconnecting client re-fetches
//! job state over HTTP.

use std::sync::Arc;

use axum::extract::ws::Message;
use lessoncast_core::channels::{ChannelKind, Target};
use lessoncast_core::job_events::{ContentEvent, Notification};

use crate::ws::WsManager;

pub struct NotificationRouter {
    job_hub: Arc<WsManager>,
    content_hub: Arc<WsManager>,
}

impl NotificationRouter {
    pub fn new(job_hub: Arc<WsManager>, content_hub: Arc<WsManager>) -> Self {
        Self {
            job_hub,
            content_hub,
        }
    }

    fn hub(&self, channel: ChannelKind) -> &WsManager {
        match channel {
            ChannelKind::JobStatus => &self.job_hub,
            ChannelKind::ContentDiscussion => &self.content_hub,
        }
    }

    /// Deliver `notification` to `target` on the notification's channel.
    ///
    /// Returns the number of connections reached.
    pub async fn notify(&self, target: &Target, notification: &Notification) -> usize {
        let channel = notification.channel();
        let Some(message) = frame(notification) else {
            return 0;
        };

        let hub = self.hub(channel);
        let delivered = match target {
            Target::User(user_id) => hub.send_to_user(*user_id, message).await,
            Target::Group(group) => hub.send_to_group(group, message).await,
        };

        if delivered == 0 {
            tracing::debug!(
                channel = channel.as_str(),
                target = %target,
                event = notification.event_name(),
                "No subscribers, notification dropped"
            );
        }
        delivered
    }

    /// Broadcast a content event to every content-channel connection.
    ///
    /// Job-status traffic is never broadcast.
    pub async fn notify_all(&self, event: ContentEvent) -> usize {
        let notification = Notification::Content(event);
        let Some(message) = frame(&notification) else {
            return 0;
        };
        self.content_hub.broadcast(message).await
    }
}

fn frame(notification: &Notification) -> Option<Message> {
    match notification.to_frame(chrono::Utc::now()) {
        Ok(text) => Some(Message::Text(text.into())),
        Err(e) => {
            tracing::error!(
                event = notification.event_name(),
                error = %e,
                "Failed to serialize notification"
            );
            None
        }
    }
}
