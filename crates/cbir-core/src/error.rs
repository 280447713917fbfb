use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Invalid feedback: {0}")]
    InvalidFeedback(String),

    #[error("Operation failed: {0}")]
    Operation(String),
}

pub type Result<T> = std::result::Result<T, Error>;
