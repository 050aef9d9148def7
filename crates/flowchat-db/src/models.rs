/// Database row types — these map directly to SQLite rows.

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub created_at: String,
}

/// A persisted chat message. `recipient` is `None` for the global scope.
/// Immutable once appended.
#[derive(Debug, Clone)]
pub struct MessageRecord {
    pub id: i64,
    pub sender: String,
    pub recipient: Option<String>,
    pub text: String,
    pub timestamp: String,
}
