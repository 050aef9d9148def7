use serde::{Deserialize, Serialize};

// -- Auth --

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub username: String,
}

// -- Messages --

/// A persisted message as returned by the history read path.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub id: i64,
    pub sender: String,
    pub recipient: Option<String>,
    pub text: String,
    pub timestamp: String,
}

// -- Reactions --

/// Derived per-emoji view of a message's reactions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionGroup {
    pub emoji: String,
    pub count: usize,
    pub users: Vec<String>,
}

// -- Users --

#[derive(Debug, Serialize, Deserialize)]
pub struct UserSearchResult {
    pub username: String,
}
