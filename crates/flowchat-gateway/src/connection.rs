use std::sync::{Arc, RwLock};

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{error, warn};
use uuid::Uuid;

use flowchat_types::events::{ClientEvent, ServerEvent};

use crate::error::GatewayError;
use crate::registry::ClientHandle;
use crate::router::Router;

/// Handle one WebSocket connection for its whole lifetime.
///
/// The connection starts unauthenticated; an `auth` event binds its identity
/// exactly once. Outbound events flow through a per-connection channel into a
/// dedicated send task, so the router never blocks on this peer's socket.
pub async fn handle_socket(socket: WebSocket, router: Router) {
    let (mut sink, mut stream) = socket.split();

    let conn_id = Uuid::new_v4();
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerEvent>();

    // Identity is bound by the recv task and read at teardown.
    let identity: Arc<RwLock<Option<String>>> = Arc::new(RwLock::new(None));

    // Forward queued outbound events to the socket.
    let mut send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let text = match serde_json::to_string(&event) {
                Ok(text) => text,
                Err(e) => {
                    error!("failed to serialize outbound event: {}", e);
                    continue;
                }
            };
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
    });

    // Read framed events off the socket and feed the router.
    let router_recv = router.clone();
    let recv_identity = identity.clone();
    let mut recv_task = tokio::spawn(async move {
        while let Some(Ok(msg)) = stream.next().await {
            match msg {
                Message::Text(text) => {
                    let event = match serde_json::from_str::<ClientEvent>(&text) {
                        Ok(event) => event,
                        Err(e) => {
                            warn!(
                                "dropping event: {} -- raw: {}",
                                GatewayError::MalformedEvent(e),
                                truncate_for_log(&text, 200)
                            );
                            continue;
                        }
                    };
                    handle_event(&router_recv, &recv_identity, conn_id, &tx, event).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    // Either side finishing tears down the other.
    tokio::select! {
        _ = &mut send_task => recv_task.abort(),
        _ = &mut recv_task => send_task.abort(),
    }

    let bound = identity.read().expect("identity lock poisoned").clone();
    if let Some(identity) = bound {
        router.connection_closed(&identity, conn_id).await;
    }
}

/// Truncate a frame for logging without splitting a UTF-8 character.
fn truncate_for_log(text: &str, max: usize) -> &str {
    if text.len() <= max {
        return text;
    }
    let mut end = max;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Dispatch one inbound event against the connection's bound identity.
/// Events before authentication are dropped; the connection stays open.
pub(crate) async fn handle_event(
    router: &Router,
    identity: &RwLock<Option<String>>,
    conn_id: Uuid,
    tx: &mpsc::UnboundedSender<ServerEvent>,
    event: ClientEvent,
) {
    match event {
        ClientEvent::Auth { username } => {
            let accepted = {
                let mut bound = identity.write().expect("identity lock poisoned");
                match bound.as_deref() {
                    // Identity is immutable once bound; a re-auth with a
                    // different name is ignored.
                    Some(current) if current != username => {
                        warn!(
                            "connection {} already bound to {}, ignoring auth as {}",
                            conn_id, current, username
                        );
                        false
                    }
                    _ => {
                        *bound = Some(username.clone());
                        true
                    }
                }
            };
            if accepted {
                router
                    .handle_auth(&username, ClientHandle::new(conn_id, tx.clone()))
                    .await;
            }
        }
        ClientEvent::Message { text, recipient } => {
            if let Some(sender) = authenticated_sender(identity) {
                if let Err(e) = router.handle_message(&sender, text, recipient).await {
                    error!("dropping message from {}: {}", sender, e);
                }
            }
        }
        ClientEvent::Typing { is_typing, recipient } => {
            if let Some(sender) = authenticated_sender(identity) {
                router.handle_typing(&sender, is_typing, recipient).await;
            }
        }
        ClientEvent::Reaction { message_id, emoji } => {
            if let Some(sender) = authenticated_sender(identity) {
                router.handle_reaction(&sender, message_id, emoji).await;
            }
        }
    }
}

/// The connection's bound identity, or `None` (logged) for a connection that
/// has not authenticated yet.
fn authenticated_sender(identity: &RwLock<Option<String>>) -> Option<String> {
    let sender = identity.read().expect("identity lock poisoned").clone();
    if sender.is_none() {
        warn!("dropping event: {}", GatewayError::Unauthenticated);
    }
    sender
}
