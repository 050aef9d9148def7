pub mod auth;
pub mod messages;
pub mod users;

pub use auth::{AppState, AppStateInner};
