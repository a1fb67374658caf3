use thiserror::Error;

use crate::models::DoubtId;

/// Failure talking to the backend. The `Display` text is what the user sees.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status. `message` is the body's `error` field when present,
    /// otherwise the operation's fallback text.
    #[error("{message}")]
    Backend { status: u16, message: String },

    #[error("Unexpected response from server: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum DoubtError {
    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("{0}")]
    Validation(String),

    #[error("Select a doubt first")]
    NoSelection,

    #[error("Doubt #{0} is already resolved")]
    AlreadyResolved(DoubtId),
}

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Not logged in. Run `novard login --email <email>` first.")]
    NotLoggedIn,

    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Session file error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Session file is corrupt: {0}")]
    Format(#[from] serde_json::Error),
}
