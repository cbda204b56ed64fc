use thiserror::Error;

#[derive(Debug, Error)]
pub enum CerebroError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Model provider error: {0}")]
    Provider(String),

    #[error("Malformed model reply: {0}")]
    MalformedReply(String),

    #[error("Identity service error: {0}")]
    Identity(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },
}

impl CerebroError {
    /// Errors caused by the upstream model rather than by the caller or by us.
    /// Every one of these surfaces as a terminal 500 for the turn.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self,
            Self::Http(_) | Self::Provider(_) | Self::MalformedReply(_)
        )
    }
}

impl From<rusqlite::Error> for CerebroError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Storage(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CerebroError>;
