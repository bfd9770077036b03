//! Crate-level error type.

use thiserror::Error;

/// Errors surfaced by the battle client.
///
/// Each variant carries enough context to diagnose the failure without
/// needing to inspect the originating error directly.
#[derive(Debug, Error)]
pub enum BattleError {
    /// The server replied with a non-2xx HTTP status code.
    #[error("HTTP {status} from {url}")]
    Http { status: u16, url: String },

    /// A TCP-level connection could not be established or was dropped.
    #[error("connection failed to {url}: {detail}")]
    Connect { url: String, detail: String },

    /// A body or event payload could not be parsed as the expected JSON shape.
    #[error("JSON parse error in {context}: {detail}")]
    Json { context: String, detail: String },

    /// The server answered with a structured `{ "error": ... }` payload.
    #[error("{0}")]
    Api(String),

    /// User input was rejected before any request was made.
    #[error("{0}")]
    Validation(String),

    /// A configuration file or value could not be used.
    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl BattleError {
    /// True for failures that happened below the application protocol
    /// (connect, HTTP status, I/O).
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BattleError::Http { .. } | BattleError::Connect { .. } | BattleError::Io(_)
        )
    }
}
