use thiserror::Error;

#[derive(Error, Debug)]
pub enum LanguageModelError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// The request to the provider failed or the parsing of the response
    /// failed.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    /// The request returns a non-OK status code (authentication, quota,
    /// server failure)
    #[error("Status error: {1} (Status {0})")]
    StatusCode(reqwest::StatusCode, String),
    /// The input is not supported by or is incompatible with the model
    #[error("Unsupported by {0}: {1}")]
    Unsupported(&'static str, String),
    /// The response from the provider was unexpected. (e.g. no candidates
    /// returned by Gemini)
    #[error("Invariant from {0}: {1}")]
    Invariant(&'static str, String),
    /// The model refused to process the input. (e.g. a safety block)
    #[error("Refusal: {0}")]
    Refusal(String),
}

pub type LanguageModelResult<T> = Result<T, LanguageModelError>;

#[derive(Error, Debug)]
pub enum VectorStoreError {
    /// The vector store could not be reached or its response could not be
    /// decoded.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Status error: {1} (Status {0})")]
    StatusCode(reqwest::StatusCode, String),
    /// A vector or collection did not have the expected shape.
    #[error("Invariant from {0}: {1}")]
    Invariant(&'static str, String),
}

pub type VectorStoreResult<T> = Result<T, VectorStoreError>;

/// Errors raised by the shared HTTP helpers before they are mapped into a
/// capability-specific error.
#[derive(Error, Debug)]
pub(crate) enum HttpError {
    #[error(transparent)]
    Transport(#[from] reqwest::Error),
    #[error("Status error: {1} (Status {0})")]
    StatusCode(reqwest::StatusCode, String),
}

impl From<HttpError> for LanguageModelError {
    fn from(error: HttpError) -> Self {
        match error {
            HttpError::Transport(e) => Self::Transport(e),
            HttpError::StatusCode(status, body) => Self::StatusCode(status, body),
        }
    }
}

impl From<HttpError> for VectorStoreError {
    fn from(error: HttpError) -> Self {
        match error {
            HttpError::Transport(e) => Self::Transport(e),
            HttpError::StatusCode(status, body) => Self::StatusCode(status, body),
        }
    }
}
