//! Realtime push channel.
//!
//! A client opens `GET /realtime` (token in the `Authorization` header or the
//! `access_token` query parameter) and upgrades to a WebSocket. The auth
//! middleware has already verified the credential, so the connection is
//! registered under the verified identity and its roles.
//!
//! Frames are JSON `{"event": ..., "payload": ...}`. The first frame is
//! `connected`, carrying the connection id and the unread count. A text
//! `ping` is answered with `pong`; anything else from the client is ignored.

use std::sync::Arc;

use axum::{
    extract::{
        Extension,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};

use tourbook_core::ConnectionId;
use tourbook_events::PushMessage;
use tourbook_infra::NotificationStore;

use crate::app::services::AppServices;
use crate::context::PrincipalContext;

/// Event name of the first frame sent on every connection.
pub const CONNECTED_EVENT: &str = "connected";

pub async fn realtime(
    ws: WebSocketUpgrade,
    Extension(services): Extension<Arc<AppServices>>,
    Extension(principal): Extension<PrincipalContext>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, services, principal))
}

async fn handle_socket(socket: WebSocket, services: Arc<AppServices>, principal: PrincipalContext) {
    let connection_id = ConnectionId::new();
    let user_id = principal.user_id();
    let mut subscription = services
        .registry
        .register(connection_id, user_id, principal.roles().to_vec());

    let (mut sender, mut receiver) = socket.split();

    let unread = match services.notifications.unread_count(user_id).await {
        Ok(n) => n,
        Err(err) => {
            tracing::warn!(%connection_id, error = %err, "unread count unavailable for greeting");
            0
        }
    };
    let greeting = PushMessage::new(
        CONNECTED_EVENT,
        serde_json::json!({
            "connection_id": connection_id,
            "unread": unread,
        }),
    );

    if send_frame(&mut sender, &greeting).await.is_ok() {
        loop {
            tokio::select! {
                pushed = subscription.recv() => {
                    let Some(message) = pushed else { break };
                    if send_frame(&mut sender, &message).await.is_err() {
                        break;
                    }
                }
                incoming = receiver.next() => {
                    match incoming {
                        Some(Ok(Message::Text(text))) if text.trim() == "ping" => {
                            if sender.send(Message::Text("pong".to_string())).await.is_err() {
                                break;
                            }
                        }
                        Some(Ok(Message::Close(_))) | None => break,
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            tracing::debug!(%connection_id, error = %err, "websocket receive failed");
                            break;
                        }
                    }
                }
            }
        }
    }

    services.registry.unregister(connection_id);
    tracing::debug!(%connection_id, %user_id, "realtime connection closed");
}

async fn send_frame<S>(sender: &mut S, message: &PushMessage) -> Result<(), ()>
where
    S: futures::Sink<Message> + Unpin,
{
    let text = match serde_json::to_string(message) {
        Ok(text) => text,
        Err(err) => {
            tracing::warn!(event = %message.event, error = %err, "push frame not serializable");
            return Ok(());
        }
    };
    sender.send(Message::Text(text)).await.map_err(|_| ())
}
