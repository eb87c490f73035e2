use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lessoncast_api::config::ServerConfig;
use lessoncast_api::router::build_app_router;
use lessoncast_api::storage::local::LocalBlobStore;
use lessoncast_api::{background, state, ws};
use lessoncast_db::PgJobStore;
use lessoncast_queue::redis_streams::{RedisTaskPublisher, DEFAULT_STREAM_PREFIX};

use state::AppState;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lessoncast_api=debug,lessoncast_queue=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Job Store ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = lessoncast_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    lessoncast_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    lessoncast_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store = Arc::new(PgJobStore::new(pool));

    // --- Task Publisher ---
    let redis_url = std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://127.0.0.1:6379".into());
    let stream_prefix =
        std::env::var("TASK_STREAM_PREFIX").unwrap_or_else(|_| DEFAULT_STREAM_PREFIX.into());
    let publisher = RedisTaskPublisher::connect(&redis_url, stream_prefix)
        .await
        .expect("Failed to connect to Redis");
    tracing::info!("Task publisher connected");

    // --- Blob storage ---
    let storage_root = std::env::var("STORAGE_ROOT").unwrap_or_else(|_| "./storage".into());
    tracing::info!(root = %storage_root, "Using local blob storage");
    let blobs = Arc::new(LocalBlobStore::new(storage_root));

    // --- App state ---
    let state = AppState::new(store, Arc::new(publisher), blobs, config.clone());

    // --- Heartbeat ---
    let heartbeat_handle = ws::start_heartbeat(vec![
        Arc::clone(&state.job_hub),
        Arc::clone(&state.content_hub),
    ]);

    // --- Job expiry sweep ---
    let sweep_cancel = CancellationToken::new();
    let sweep_handle = tokio::spawn(background::job_expiry::run(
        state.clone(),
        sweep_cancel.clone(),
    ));

    // --- Router ---
    let app = build_app_router(state.clone(), &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    sweep_cancel.cancel();
    let _ = tokio::time::timeout(Duration::from_secs(5), sweep_handle).await;
    tracing::info!("Job expiry sweep stopped");

    for hub in [&state.job_hub, &state.content_hub] {
        let ws_count = hub.connection_count().await;
        tracing::info!(channel = hub.name(), ws_count, "Closing remaining WebSocket connections");
        hub.shutdown_all().await;
    }

    heartbeat_handle.abort();
    tracing::info!("Heartbeat task stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM to initiate graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
