use thiserror::Error;

/// Errors surfaced by the assistant core
#[derive(Error, Debug)]
pub enum AssistError {
    #[error("generation failed: {0}")]
    Generation(String),

    #[error("embedding failed: {0}")]
    Embedding(String),

    #[error("vector index unavailable: {0}")]
    IndexUnavailable(String),

    #[error("invalid vector: {0}")]
    InvalidVector(String),

    #[error("claim dialogue error: {0}")]
    Dialogue(String),

    #[error("profile error: {0}")]
    Profile(String),

    #[error("session error: {0}")]
    Session(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, AssistError>;
