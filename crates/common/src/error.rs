use thiserror::Error;

/// The one message every gate rejection produces. Denials must not reveal
/// which rule failed (unknown id, wrong access code, insufficient privilege).
pub const DENIED_MESSAGE: &str = "Access denied";

/// Gateway error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or out-of-range input. Rejected before any side effect.
    #[error("invalid request: {0}")]
    Validation(String),

    /// An external probe/tool failed, returned nothing, or timed out.
    /// Read paths degrade to an empty or stale cached payload instead of
    /// surfacing this to the caller.
    #[error("upstream probe failed: {0}")]
    Upstream(String),

    /// Durable-store I/O failure. Fatal at startup; afterwards surfaced to
    /// the caller as a failed action.
    #[error("store i/o failed: {0}")]
    Persistence(#[from] std::io::Error),

    /// Access gate rejection. Always rendered as [`DENIED_MESSAGE`].
    #[error("{}", DENIED_MESSAGE)]
    Denied,
}

pub type Result<T> = std::result::Result<T, Error>;
