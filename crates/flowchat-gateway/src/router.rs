use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use tracing::{debug, info, warn};
use uuid::Uuid;

use flowchat_db::Database;
use flowchat_types::api::ReactionGroup;
use flowchat_types::events::ServerEvent;

use crate::error::GatewayError;
use crate::reactions::ReactionBoard;
use crate::registry::{ClientHandle, Registry};
use crate::typing::{Scope, TypingTracker};

/// A typing indicator goes stale after this much silence from the sender.
const TYPING_TTL: Duration = Duration::from_secs(3);

/// The routing core: decides, for each inbound event, what gets persisted
/// and which live connections the outbound event goes to.
#[derive(Clone)]
pub struct Router {
    inner: Arc<RouterInner>,
}

struct RouterInner {
    registry: Registry,
    typing: TypingTracker,
    reactions: ReactionBoard,
    db: Arc<Database>,
}

impl Router {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            inner: Arc::new(RouterInner {
                registry: Registry::new(),
                typing: TypingTracker::new(),
                reactions: ReactionBoard::new(),
                db,
            }),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.inner.registry
    }

    /// Read-only reaction view for the history path.
    pub async fn reaction_groups(&self, message_id: i64) -> Vec<ReactionGroup> {
        self.inner.reactions.groups(message_id).await
    }

    /// Bind an identity to a live connection. Replaces any previous mapping
    /// for the identity (last register wins); idempotent on resend.
    pub async fn handle_auth(&self, identity: &str, handle: ClientHandle) {
        info!("{} authenticated on connection {}", identity, handle.conn_id());
        self.inner.registry.register(identity, handle).await;
    }

    /// Persist a message, clear the sender's typing state for the scope, and
    /// deliver to the fanout set. The append completes before any delivery is
    /// attempted; if it fails, nothing is delivered.
    pub async fn handle_message(
        &self,
        sender: &str,
        text: String,
        recipient: Option<String>,
    ) -> Result<(), GatewayError> {
        let record = {
            let db = self.inner.db.clone();
            let sender = sender.to_string();
            let recipient = recipient.clone();
            let text = text.clone();
            tokio::task::spawn_blocking(move || {
                db.append_message(&sender, recipient.as_deref(), &text)
            })
            .await
            .map_err(|e| GatewayError::Persistence(anyhow!("append task failed: {e}")))??
        };

        // The message supersedes the typing indicator; cleared without a
        // typing:false event since recipients see the message itself.
        let scope = Scope::from_recipient(recipient.as_deref());
        self.inner.typing.disarm(sender, &scope).await;

        let event = ServerEvent::Message {
            id: record.id,
            text: record.text,
            sender: record.sender,
            recipient: record.recipient,
        };

        match recipient.as_deref() {
            // Private: the target plus the sender's own echo.
            Some(target) => {
                self.deliver_to(target, event.clone()).await;
                if target != sender {
                    self.deliver_to(sender, event).await;
                }
            }
            // Global: everyone, sender included.
            None => {
                for (identity, handle) in self.inner.registry.all_live().await {
                    if let Err(e) = handle.deliver(&identity, event.clone()) {
                        debug!("{}", e);
                    }
                }
            }
        }

        Ok(())
    }

    /// Set or clear the typing indicator for `(sender, scope)` and notify the
    /// scope's other participants. A set arms a fresh expiry timer, replacing
    /// any previous one for the key.
    pub async fn handle_typing(&self, sender: &str, is_typing: bool, recipient: Option<String>) {
        let scope = Scope::from_recipient(recipient.as_deref());

        if is_typing {
            let generation = self.inner.typing.next_generation();
            let timer = {
                let router = self.clone();
                let sender = sender.to_string();
                let scope = scope.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(TYPING_TTL).await;
                    router.typing_expired(&sender, &scope, generation).await;
                })
                .abort_handle()
            };
            self.inner.typing.arm(sender, scope.clone(), generation, timer).await;
        } else {
            self.inner.typing.disarm(sender, &scope).await;
        }

        self.fanout_typing(sender, &scope, is_typing).await;
    }

    /// Expiry path: emits the same cleared fanout as an explicit
    /// `isTyping:false`, but only if the entry is still the one this timer
    /// was armed for.
    async fn typing_expired(&self, sender: &str, scope: &Scope, generation: u64) {
        if self.inner.typing.expire(sender, scope, generation).await {
            debug!("typing state for {} expired", sender);
            self.fanout_typing(sender, scope, false).await;
        }
    }

    /// Toggle a reaction and broadcast the change to every live connection.
    /// Reaction visibility is deliberately not scoped to the conversation;
    /// this mirrors the observed source behavior.
    pub async fn handle_reaction(&self, sender: &str, message_id: i64, emoji: String) {
        let added = self.inner.reactions.toggle(message_id, sender, &emoji).await;
        debug!(
            "{} {} reaction {} on message {}",
            sender,
            if added { "added" } else { "removed" },
            emoji,
            message_id
        );

        let event = ServerEvent::Reaction {
            message_id,
            emoji,
            user: sender.to_string(),
        };
        for (identity, handle) in self.inner.registry.all_live().await {
            if let Err(e) = handle.deliver(&identity, event.clone()) {
                debug!("{}", e);
            }
        }
    }

    /// Teardown for a closing connection. The registry entry is removed only
    /// if it still belongs to this connection; a stale close after a
    /// reconnect must not evict the replacement. Typing timers owned by the
    /// identity are cancelled, with the cleared fanout emitted so no peer is
    /// left showing a stale indicator.
    pub async fn connection_closed(&self, identity: &str, conn_id: Uuid) {
        let was_current = self.inner.registry.unregister(identity, conn_id).await;
        if !was_current {
            // A newer connection took over the identity; nothing to clean up.
            return;
        }

        for scope in self.inner.typing.disarm_all(identity).await {
            self.fanout_typing(identity, &scope, false).await;
        }
        info!("{} disconnected", identity);
    }

    /// Typing fanout: scope participants only, never echoed to the sender.
    async fn fanout_typing(&self, sender: &str, scope: &Scope, is_typing: bool) {
        let event = ServerEvent::Typing {
            sender: sender.to_string(),
            is_typing,
        };

        match scope {
            Scope::Global => {
                for (identity, handle) in self.inner.registry.all_live().await {
                    if identity == sender {
                        continue;
                    }
                    if let Err(e) = handle.deliver(&identity, event.clone()) {
                        debug!("{}", e);
                    }
                }
            }
            Scope::Direct(counterpart) => {
                if counterpart != sender {
                    self.deliver_to(counterpart, event).await;
                }
            }
        }
    }

    /// Deliver to a single identity if it is connected; an absent or closed
    /// peer is skipped, never an error for the caller.
    async fn deliver_to(&self, identity: &str, event: ServerEvent) {
        match self.inner.registry.resolve(identity).await {
            Some(handle) => {
                if let Err(e) = handle.deliver(identity, event) {
                    warn!("{}", e);
                }
            }
            None => debug!("{} not connected, skipping delivery", identity),
        }
    }
}
