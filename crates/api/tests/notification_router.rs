//! Tests for channel separation in `NotificationRouter`.

use std::sync::Arc;

use axum::extract::ws::Message;
use lessoncast_api::notifications::NotificationRouter;
use lessoncast_api::ws::WsManager;
use lessoncast_core::channels::Target;
use lessoncast_core::job_events::{ContentEvent, JobStatusEvent, Notification};
use lessoncast_core::status::JobStatus;
use tokio::sync::mpsc::UnboundedReceiver;

struct Hubs {
    router: NotificationRouter,
    job_hub: Arc<WsManager>,
    content_hub: Arc<WsManager>,
}

fn hubs() -> Hubs {
    let job_hub = Arc::new(WsManager::new("job_status"));
    let content_hub = Arc::new(WsManager::new("content_discussion"));
    Hubs {
        router: NotificationRouter::new(Arc::clone(&job_hub), Arc::clone(&content_hub)),
        job_hub,
        content_hub,
    }
}

fn job_updated(status: JobStatus) -> Notification {
    Notification::JobUpdated(JobStatusEvent {
        job_id: uuid::Uuid::now_v7(),
        status,
        product_type: None,
        content_ref: None,
        product_refs: Vec::new(),
        word_count: None,
        failure_reason: None,
        last_modified_at: chrono::Utc::now(),
    })
}

fn event_name(rx: &mut UnboundedReceiver<Message>) -> Option<String> {
    match rx.try_recv().ok()? {
        Message::Text(text) => {
            let json: serde_json::Value = serde_json::from_str(text.as_str()).ok()?;
            json["event"].as_str().map(str::to_string)
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Test: job-status notifications never reach the content hub
// ---------------------------------------------------------------------------

#[tokio::test]
async fn job_updates_stay_on_the_job_channel() {
    let h = hubs();
    let user = uuid::Uuid::new_v4();
    let mut job_rx = h.job_hub.add("job".into(), Some(user)).await;
    let mut content_rx = h.content_hub.add("content".into(), Some(user)).await;

    let delivered = h
        .router
        .notify(&Target::User(user), &job_updated(JobStatus::ContentGenerated))
        .await;

    assert_eq!(delivered, 1);
    assert_eq!(event_name(&mut job_rx).as_deref(), Some("JobUpdated"));
    assert_eq!(event_name(&mut content_rx), None);
}

// ---------------------------------------------------------------------------
// Test: a content event with a job-like name is still content traffic
// ---------------------------------------------------------------------------

#[tokio::test]
async fn content_events_stay_on_the_content_channel() {
    let h = hubs();
    let mut job_rx = h.job_hub.add("job".into(), None).await;
    let mut content_rx = h.content_hub.add("content".into(), None).await;
    h.content_hub.join_group("content", "class-7b").await;
    h.job_hub.join_group("job", "class-7b").await;

    let note = Notification::Content(ContentEvent::new(
        "JobFairAnnounced",
        serde_json::json!({ "room": "B12" }),
    ));
    let delivered = h
        .router
        .notify(&Target::Group("class-7b".into()), &note)
        .await;

    assert_eq!(delivered, 1);
    assert_eq!(event_name(&mut content_rx).as_deref(), Some("JobFairAnnounced"));
    assert_eq!(event_name(&mut job_rx), None);
}

// ---------------------------------------------------------------------------
// Test: notify_all() broadcasts on the content hub only
// ---------------------------------------------------------------------------

#[tokio::test]
async fn notify_all_broadcasts_content_only() {
    let h = hubs();
    let mut job_rx = h.job_hub.add("job".into(), Some(uuid::Uuid::new_v4())).await;
    let mut first = h.content_hub.add("c1".into(), None).await;
    let mut second = h.content_hub.add("c2".into(), Some(uuid::Uuid::new_v4())).await;

    let delivered = h
        .router
        .notify_all(ContentEvent::new("NewLesson", serde_json::json!({})))
        .await;

    assert_eq!(delivered, 2);
    assert_eq!(event_name(&mut first).as_deref(), Some("NewLesson"));
    assert_eq!(event_name(&mut second).as_deref(), Some("NewLesson"));
    assert_eq!(event_name(&mut job_rx), None);
}

// ---------------------------------------------------------------------------
// Test: no subscribers means nothing delivered and no error
// ---------------------------------------------------------------------------

#[tokio::test]
async fn missing_subscriber_is_dropped_silently() {
    let h = hubs();

    let delivered = h
        .router
        .notify(
            &Target::User(uuid::Uuid::new_v4()),
            &job_updated(JobStatus::Failed),
        )
        .await;

    assert_eq!(delivered, 0);
}
