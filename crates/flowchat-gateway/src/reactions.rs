use std::collections::{BTreeMap, HashSet};

use tokio::sync::Mutex;

use flowchat_types::api::ReactionGroup;

/// In-memory set of `(message_id, user, emoji)` reaction entries.
///
/// Set membership only: toggling an existing triple removes it, so at most
/// one entry per exact triple exists at any time. Not persisted.
#[derive(Default)]
pub struct ReactionBoard {
    entries: Mutex<HashSet<(i64, String, String)>>,
}

impl ReactionBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle a reaction. Returns true if the entry was inserted, false if an
    /// existing entry was removed.
    pub async fn toggle(&self, message_id: i64, user: &str, emoji: &str) -> bool {
        let mut entries = self.entries.lock().await;
        let key = (message_id, user.to_string(), emoji.to_string());
        if entries.remove(&key) {
            false
        } else {
            entries.insert(key);
            true
        }
    }

    /// Derived per-emoji view for one message, computed on read. Groups are
    /// ordered by emoji and users within a group are sorted, so output is
    /// deterministic.
    pub async fn groups(&self, message_id: i64) -> Vec<ReactionGroup> {
        let entries = self.entries.lock().await;
        let mut by_emoji: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for (id, user, emoji) in entries.iter() {
            if *id == message_id {
                by_emoji.entry(emoji).or_default().push(user);
            }
        }

        by_emoji
            .into_iter()
            .map(|(emoji, mut users)| {
                users.sort_unstable();
                ReactionGroup {
                    emoji: emoji.to_string(),
                    count: users.len(),
                    users: users.into_iter().map(str::to_string).collect(),
                }
            })
            .collect()
    }
}
