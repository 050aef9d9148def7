use crate::Database;
use crate::models::{MessageRecord, UserRow};
use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use rusqlite::Connection;

impl Database {
    // -- Users --

    /// Insert a new user. Returns false if the username is already taken;
    /// the UNIQUE constraint decides, so concurrent registers cannot both win.
    pub fn create_user(&self, username: &str, password_hash: &str) -> Result<bool> {
        self.with_conn(|conn| {
            match conn.execute(
                "INSERT INTO users (username, password) VALUES (?1, ?2)",
                (username, password_hash),
            ) {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user_by_username(conn, username))
    }

    /// Substring search over usernames, capped at `limit` rows.
    pub fn search_users(&self, query: &str, limit: u32) -> Result<Vec<String>> {
        self.with_conn(|conn| {
            // Escape the escape character itself before the LIKE wildcards.
            let pattern = format!(
                "%{}%",
                query
                    .replace('\\', "\\\\")
                    .replace('%', "\\%")
                    .replace('_', "\\_")
            );
            let mut stmt = conn.prepare(
                "SELECT username FROM users
                 WHERE username LIKE ?1 ESCAPE '\\'
                 ORDER BY username
                 LIMIT ?2",
            )?;
            let rows = stmt
                .query_map(rusqlite::params![pattern, limit], |row| row.get(0))?
                .collect::<std::result::Result<Vec<String>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    /// Append a message to the log. The id and timestamp are assigned here;
    /// ids are monotonic rowids, timestamps non-decreasing in insert order.
    pub fn append_message(
        &self,
        sender: &str,
        recipient: Option<&str>,
        text: &str,
    ) -> Result<MessageRecord> {
        self.with_conn(|conn| {
            let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
            conn.execute(
                "INSERT INTO messages (sender, recipient, text, timestamp) VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![sender, recipient, text, timestamp],
            )?;
            let id = conn.last_insert_rowid();
            Ok(MessageRecord {
                id,
                sender: sender.to_string(),
                recipient: recipient.map(str::to_string),
                text: text.to_string(),
                timestamp,
            })
        })
    }

    /// History read. With a conversation: both directions between `user` and
    /// `conversation`. Without: global messages only (no recipient).
    /// Ascending by timestamp, ids break ties.
    pub fn query_messages(
        &self,
        user: &str,
        conversation: Option<&str>,
    ) -> Result<Vec<MessageRecord>> {
        self.with_conn(|conn| match conversation {
            Some(other) => {
                let mut stmt = conn.prepare(
                    "SELECT id, sender, recipient, text, timestamp FROM messages
                     WHERE (sender = ?1 AND recipient = ?2)
                        OR (sender = ?2 AND recipient = ?1)
                     ORDER BY timestamp, id",
                )?;
                let rows = stmt
                    .query_map(rusqlite::params![user, other], map_message)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            }
            None => {
                let mut stmt = conn.prepare(
                    "SELECT id, sender, recipient, text, timestamp FROM messages
                     WHERE recipient IS NULL
                     ORDER BY timestamp, id",
                )?;
                let rows = stmt
                    .query_map([], map_message)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(rows)
            }
        })
    }
}

fn map_message(row: &rusqlite::Row<'_>) -> std::result::Result<MessageRecord, rusqlite::Error> {
    Ok(MessageRecord {
        id: row.get(0)?,
        sender: row.get(1)?,
        recipient: row.get(2)?,
        text: row.get(3)?,
        timestamp: row.get(4)?,
    })
}

fn query_user_by_username(conn: &Connection, username: &str) -> Result<Option<UserRow>> {
    let mut stmt =
        conn.prepare("SELECT id, username, password, created_at FROM users WHERE username = ?1")?;

    let row = stmt
        .query_row([username], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                username: row.get(1)?,
                password: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .optional()?;

    Ok(row)
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
