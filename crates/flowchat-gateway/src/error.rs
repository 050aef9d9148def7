use thiserror::Error;

/// Failure taxonomy for the real-time core.
///
/// None of these are fatal: every variant is logged and the offending event
/// dropped. A connection is never closed in response to a bad event, and a
/// single connection's failure only removes its own registry entry.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Event arrived on a connection with no bound identity. Dropped, no reply.
    #[error("event from unauthenticated connection")]
    Unauthenticated,

    /// Unparseable payload or missing required field. Dropped and logged.
    #[error("malformed event: {0}")]
    MalformedEvent(#[from] serde_json::Error),

    /// Outbound queue for one recipient is gone. That recipient is skipped;
    /// the rest of the fanout proceeds.
    #[error("delivery to {identity} failed: connection closed")]
    Transport { identity: String },

    /// The append to the message log failed. Live delivery is skipped so an
    /// unpersisted message is never handed out.
    #[error("persistence failure: {0}")]
    Persistence(#[from] anyhow::Error),
}
