use protoforge_sdk::{Distance, LanguageModelError, VectorStoreError};
use thiserror::Error;

/// Failures of the style memory. The generation pipeline never surfaces
/// these; a failed lookup degrades to "no style".
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Style store unavailable: {0}")]
    Unavailable(#[from] VectorStoreError),
    #[error("Embedding failed: {0}")]
    Embedding(#[source] LanguageModelError),
    #[error("Embedding dimension mismatch: store expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("Collection distance mismatch: expected {expected:?}, found {actual:?}")]
    DistanceMismatch { expected: Distance, actual: Distance },
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("Generation backend error: {0}")]
    Backend(#[from] LanguageModelError),
    #[error("Malformed backend response: {0}")]
    MalformedResponse(String),
}

/// Failures of the local rule file, asset ledger and asset directories.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Corrupt JSON in {path}: {source}")]
    Json {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

impl PersistenceError {
    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    pub(crate) fn json(path: &std::path::Path, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.display().to_string(),
            source,
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable {0}")]
    Missing(&'static str),
    #[error("Invalid value for {name}: {value}")]
    Invalid { name: &'static str, value: String },
}

/// Errors returned by [`crate::Studio`] operations.
#[derive(Debug, Error)]
pub enum StudioError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error(transparent)]
    Generation(#[from] GenerationError),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("Style memory is not configured")]
    StyleMemoryDisabled,
}

pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;
