#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use lessoncast_api::auth::jwt::JwtConfig;
use lessoncast_api::config::{PipelineConfig, ServerConfig};
use lessoncast_api::router::build_app_router;
use lessoncast_api::state::AppState;
use lessoncast_api::storage::MemoryBlobStore;
use lessoncast_core::types::UserId;
use lessoncast_db::MemoryJobStore;
use lessoncast_queue::MemoryTaskPublisher;
use tower::ServiceExt;

pub const WORKER_KEY: &str = "test-worker-key";
pub const BOUNDARY: &str = "lessoncast-test-boundary";

/// The router plus handles on every in-memory collaborator behind it.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub store: Arc<MemoryJobStore>,
    pub publisher: Arc<MemoryTaskPublisher>,
    pub blobs: Arc<MemoryBlobStore>,
}

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hs256".to_string(),
            leeway_secs: 0,
        },
        pipeline: PipelineConfig {
            worker_api_key: WORKER_KEY.to_string(),
            max_upload_bytes: 1024 * 1024,
            job_expiry_secs: 3600,
            job_sweep_interval_secs: 60,
            store_conflict_retries: 3,
        },
    }
}

/// Build the full application router over in-memory collaborators.
///
/// Uses the same `build_app_router` as `main.rs`, so tests exercise the
/// production middleware stack.
pub fn build_test_app() -> TestApp {
    let config = test_config();
    let store = Arc::new(MemoryJobStore::new());
    let publisher = Arc::new(MemoryTaskPublisher::new());
    let blobs = Arc::new(MemoryBlobStore::new());

    let state = AppState::new(
        store.clone(),
        publisher.clone(),
        blobs.clone(),
        config.clone(),
    );
    let router = build_app_router(state.clone(), &config);

    TestApp {
        router,
        state,
        store,
        publisher,
        blobs,
    }
}

/// Sign an HS256 access token for `user_id`, as the identity service would.
pub fn token_for(user_id: UserId, role: &str) -> String {
    let claims = serde_json::json!({
        "sub": user_id,
        "role": role,
        "exp": chrono::Utc::now().timestamp() + 15 * 60,
    });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(test_config().jwt.secret.as_bytes()),
    )
    .unwrap()
}

/// Encode a multipart form with a `topic` field and one `files` part per
/// `(file_name, contents)` pair.
pub fn multipart_body(topic: Option<&str>, files: &[(&str, &str)]) -> Vec<u8> {
    let mut body = Vec::new();
    if let Some(topic) = topic {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"topic\"\r\n\r\n{topic}\r\n"
            )
            .as_bytes(),
        );
    }
    for (name, data) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"files\"; filename=\"{name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data.as_bytes());
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

/// `POST /api/v1/jobs` as `user_id`.
pub fn create_request(user_id: UserId, topic: Option<&str>, files: &[(&str, &str)]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/jobs")
        .header("authorization", format!("Bearer {}", token_for(user_id, "user")))
        .header(
            "content-type",
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(multipart_body(topic, files)))
        .unwrap()
}

/// An authenticated JSON request.
pub fn user_request(
    method: &str,
    uri: &str,
    user_id: UserId,
    role: &str,
    body: Option<serde_json::Value>,
) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token_for(user_id, role)));
    match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

/// A worker progress callback carrying `key` in `X-API-Key`.
pub fn progress_request(job_id: &str, key: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("PUT")
        .uri(format!("/api/v1/jobs/{job_id}/progress"))
        .header("x-api-key", key)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

/// Send a request and parse the JSON body (`Null` when empty).
pub async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, serde_json::Value) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}

/// Insert a `Processing` job for `owner_id` directly into the store.
pub async fn seed_job(app: &TestApp, owner_id: UserId) -> lessoncast_db::models::job::Job {
    use lessoncast_db::JobStore;

    app.store
        .create(&lessoncast_db::models::job::NewJob {
            owner_id,
            topic: "Photosynthesis".to_string(),
            source_refs: vec!["sources/f1.pdf".to_string()],
        })
        .await
        .unwrap()
}

/// Report `ContentGenerated` for `job_id` through the webhook.
pub async fn report_content(app: &TestApp, job_id: &str, content_ref: &str) {
    let (status, _) = send(
        app,
        progress_request(
            job_id,
            WORKER_KEY,
            serde_json::json!({
                "status": "ContentGenerated",
                "content_ref": content_ref,
                "word_count": 500,
            }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}
