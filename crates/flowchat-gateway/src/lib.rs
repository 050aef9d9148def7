pub mod connection;
pub mod error;
pub mod reactions;
pub mod registry;
pub mod router;
pub mod typing;

pub use error::GatewayError;
pub use registry::{ClientHandle, Registry};
pub use router::Router;
pub use typing::Scope;
