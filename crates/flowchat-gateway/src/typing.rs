use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::Mutex;
use tokio::task::AbortHandle;

/// Conversation scope: the global room or a private counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Scope {
    Global,
    Direct(String),
}

impl Scope {
    pub fn from_recipient(recipient: Option<&str>) -> Self {
        match recipient {
            Some(counterpart) => Scope::Direct(counterpart.to_string()),
            None => Scope::Global,
        }
    }

    pub fn recipient(&self) -> Option<&str> {
        match self {
            Scope::Global => None,
            Scope::Direct(counterpart) => Some(counterpart.as_str()),
        }
    }
}

struct Entry {
    generation: u64,
    timer: AbortHandle,
}

/// Ephemeral typing state, keyed by `(sender, scope)`.
///
/// Each armed entry owns a scheduled expiry task; re-arming aborts and
/// replaces it. Generations disambiguate a replaced timer that already woke
/// and is waiting on the lock: its `expire` call no longer matches and does
/// nothing, so a refresh can never race into a duplicate clear.
#[derive(Default)]
pub struct TypingTracker {
    entries: Mutex<HashMap<(String, Scope), Entry>>,
    generation: AtomicU64,
}

impl TypingTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserve a generation for a timer about to be spawned.
    pub fn next_generation(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::Relaxed)
    }

    /// Mark `sender` as typing in `scope`, owning the given expiry timer.
    /// Any previous timer for the key is cancelled and replaced.
    pub async fn arm(&self, sender: &str, scope: Scope, generation: u64, timer: AbortHandle) {
        let mut entries = self.entries.lock().await;
        if let Some(previous) = entries.insert(
            (sender.to_string(), scope),
            Entry { generation, timer },
        ) {
            previous.timer.abort();
        }
    }

    /// Explicit clear: drop the entry and cancel its timer. Returns whether
    /// an entry existed.
    pub async fn disarm(&self, sender: &str, scope: &Scope) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.remove(&(sender.to_string(), scope.clone())) {
            Some(entry) => {
                entry.timer.abort();
                true
            }
            None => false,
        }
    }

    /// Clear from the expiry timer itself. Removes the entry only if it still
    /// belongs to `generation`; the timer must not abort itself, hence no
    /// `abort` here. Returns whether the entry was removed.
    pub async fn expire(&self, sender: &str, scope: &Scope, generation: u64) -> bool {
        let mut entries = self.entries.lock().await;
        let key = (sender.to_string(), scope.clone());
        match entries.get(&key) {
            Some(entry) if entry.generation == generation => {
                entries.remove(&key);
                true
            }
            _ => false,
        }
    }

    /// Drop every entry owned by `sender`, cancelling the timers. Returns the
    /// scopes that were active so their clears can be fanned out.
    pub async fn disarm_all(&self, sender: &str) -> Vec<Scope> {
        let mut entries = self.entries.lock().await;
        let keys: Vec<(String, Scope)> = entries
            .keys()
            .filter(|(owner, _)| owner == sender)
            .cloned()
            .collect();

        let mut scopes = Vec::with_capacity(keys.len());
        for key in keys {
            if let Some(entry) = entries.remove(&key) {
                entry.timer.abort();
                scopes.push(key.1);
            }
        }
        scopes
    }
}
