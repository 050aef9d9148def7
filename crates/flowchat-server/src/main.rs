use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Router as HttpRouter,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::{get, post},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;

use flowchat_api::{AppState, AppStateInner, auth, messages, users};
use flowchat_gateway::Router;
use flowchat_gateway::connection;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "flowchat=debug,tower_http=debug".into()),
        )
        .init();

    // Config
    let db_path = std::env::var("FLOWCHAT_DB_PATH").unwrap_or_else(|_| "flowchat.db".into());
    let host = std::env::var("FLOWCHAT_HOST").unwrap_or_else(|_| "0.0.0.0".into());
    let port: u16 = std::env::var("FLOWCHAT_PORT")
        .unwrap_or_else(|_| "8080".into())
        .parse()?;

    // Init database
    let db = Arc::new(flowchat_db::Database::open(&PathBuf::from(&db_path))?);

    // Shared state
    let router = Router::new(db.clone());
    let state: AppState = Arc::new(AppStateInner {
        db,
        router: router.clone(),
    });

    // Routes
    let app = HttpRouter::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/messages", get(messages::get_messages))
        .route("/messages/{message_id}/reactions", get(messages::get_reactions))
        .route("/users/search", get(users::search))
        .route("/ws", get(ws_upgrade))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = format!("{}:{}", host, port).parse()?;
    info!("FlowChat server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

async fn ws_upgrade(State(state): State<AppState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    let router = state.router.clone();
    ws.on_upgrade(move |socket| connection::handle_socket(socket, router))
}
