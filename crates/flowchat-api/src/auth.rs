use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
    password_hash::{SaltString, rand_core::OsRng},
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use tracing::info;

use flowchat_db::Database;
use flowchat_gateway::Router;
use flowchat_types::api::{LoginRequest, LoginResponse, RegisterRequest};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Arc<Database>,
    pub router: Router,
}

pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    if req.username.trim().is_empty() || req.password.is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    // Hash password with Argon2id
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let password_hash = argon2
        .hash_password(req.password.as_bytes(), &salt)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .to_string();

    // The UNIQUE constraint arbitrates concurrent registers; a taken
    // username is a client error on this surface, not a conflict.
    let created = state
        .db
        .create_user(&req.username, &password_hash)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;
    if !created {
        return Err(StatusCode::BAD_REQUEST);
    }

    info!("registered user {}", req.username);

    Ok(Json(LoginResponse {
        username: req.username,
    }))
}

pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, StatusCode> {
    let user = state
        .db
        .get_user_by_username(&req.username)
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?
        .ok_or(StatusCode::UNAUTHORIZED)?;

    // Verify password
    let parsed_hash =
        PasswordHash::new(&user.password).map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    Ok(Json(LoginResponse {
        username: user.username,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flowchat_gateway::Router;

    fn test_state() -> AppState {
        let db = Arc::new(Database::open_in_memory().unwrap());
        Arc::new(AppStateInner {
            router: Router::new(db.clone()),
            db,
        })
    }

    fn request(username: &str, password: &str) -> Json<RegisterRequest> {
        Json(RegisterRequest {
            username: username.into(),
            password: password.into(),
        })
    }

    #[tokio::test]
    async fn duplicate_register_is_a_client_error() {
        let state = test_state();

        assert!(register(State(state.clone()), request("alice", "hunter22")).await.is_ok());
        let second = register(State(state.clone()), request("alice", "other-pass")).await;
        assert_eq!(second.err(), Some(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn login_checks_the_password() {
        let state = test_state();
        assert!(register(State(state.clone()), request("alice", "hunter22")).await.is_ok());

        let ok = login(
            State(state.clone()),
            Json(LoginRequest {
                username: "alice".into(),
                password: "hunter22".into(),
            }),
        )
        .await;
        assert!(ok.is_ok());

        let wrong = login(
            State(state.clone()),
            Json(LoginRequest {
                username: "alice".into(),
                password: "wrong".into(),
            }),
        )
        .await;
        assert_eq!(wrong.err(), Some(StatusCode::UNAUTHORIZED));

        let unknown = login(
            State(state),
            Json(LoginRequest {
                username: "nobody".into(),
                password: "hunter22".into(),
            }),
        )
        .await;
        assert_eq!(unknown.err(), Some(StatusCode::UNAUTHORIZED));
    }
}
