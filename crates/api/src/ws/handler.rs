use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use lessoncast_core::error::CoreError;
use lessoncast_core::types::UserId;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::WsAuthParams;
use crate::state::AppState;
use crate::ws::manager::WsManager;

/// Longest accepted group name.
const MAX_GROUP_NAME_LEN: usize = 128;

/// Inbound control frames on the content channel.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(tag = "action", rename_all = "lowercase")]
enum ClientAction {
    Join { group: String },
    Leave { group: String },
}

/// GET /api/v1/ws/jobs?token=
///
/// Job-status channel. Pushes are addressed per user; the connection only
/// needs to authenticate.
pub async fn job_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsAuthParams>,
) -> AppResult<impl IntoResponse> {
    let user = authenticate(&state, &params)?;
    let hub = Arc::clone(&state.job_hub);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, hub, user.user_id, false)))
}

/// GET /api/v1/ws/content?token=
///
/// Content/discussion channel. Clients send
/// `{"action":"join","group":"<name>"}` or `{"action":"leave",...}` to
/// select the groups they receive.
pub async fn content_ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<WsAuthParams>,
) -> AppResult<impl IntoResponse> {
    let user = authenticate(&state, &params)?;
    let hub = Arc::clone(&state.content_hub);
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, hub, user.user_id, true)))
}

fn authenticate(state: &AppState, params: &WsAuthParams) -> Result<AuthUser, AppError> {
    let token = params
        .token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AppError::Core(CoreError::Unauthorized("Missing token".into())))?;
    AuthUser::from_token(token, &state.config.jwt)
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with the hub.
///   2. Spawns a sender task that forwards messages from the hub channel.
///   3. Processes inbound messages on the current task.
///   4. Cleans up on disconnect.
async fn handle_socket(socket: WebSocket, hub: Arc<WsManager>, user_id: UserId, groups: bool) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, user_id = %user_id, channel = hub.name(), "WebSocket connected");

    let mut rx = hub.add(conn_id.clone(), Some(user_id)).await;

    let (mut sink, mut stream) = socket.split();

    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Text(text)) if groups => {
                handle_action(&hub, &conn_id, text.as_str()).await;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    hub.remove(&conn_id).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, channel = hub.name(), "WebSocket disconnected");
}

async fn handle_action(hub: &WsManager, conn_id: &str, text: &str) {
    let action = match serde_json::from_str::<ClientAction>(text) {
        Ok(action) => action,
        Err(e) => {
            tracing::debug!(conn_id = %conn_id, error = %e, "Ignoring malformed client frame");
            return;
        }
    };

    match action {
        ClientAction::Join { group } if valid_group_name(&group) => {
            hub.join_group(conn_id, &group).await;
            tracing::debug!(conn_id = %conn_id, group = %group, "Joined group");
        }
        ClientAction::Leave { group } => {
            hub.leave_group(conn_id, &group).await;
            tracing::debug!(conn_id = %conn_id, group = %group, "Left group");
        }
        ClientAction::Join { group } => {
            tracing::debug!(conn_id = %conn_id, group = %group, "Rejected invalid group name");
        }
    }
}

fn valid_group_name(group: &str) -> bool {
    !group.trim().is_empty() && group.len() <= MAX_GROUP_NAME_LEN
}
