use thiserror::Error;

#[derive(Debug, Error)]
pub enum FormdeskError {
    #[error("invalid filename: {0}")]
    InvalidName(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}
