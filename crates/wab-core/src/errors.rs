use crate::domain::BotStatus;

/// Core error type for the bulk-send client.
///
/// Adapter crates map their specific errors into this type so the orchestrator
/// can tell a remote rejection apart from a transport failure and report both
/// consistently.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("config error: {0}")]
    Config(String),

    #[error("{0}")]
    Validation(String),

    #[error("bot is not connected ({0})")]
    NotConnected(BotStatus),

    #[error("a send is already in progress")]
    Busy,

    #[error("attachment upload failed: {0}")]
    Upload(String),

    /// The backend answered `{success: false, error}`.
    #[error("{0}")]
    Rejected(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("external error: {0}")]
    External(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
