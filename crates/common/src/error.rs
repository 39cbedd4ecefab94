use thiserror::Error;

/// Closed set of error kinds for the storage/embedding/LLM coordination layer.
///
/// Every variant carries a human message, a stable [`CogneeError::name`], and
/// an HTTP-style [`CogneeError::status_hint`] used by an outer API shell this
/// crate does not implement.
#[derive(Debug, Error)]
pub enum CogneeError {
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),

    #[error("Missing query parameter: {0}")]
    MissingQueryParameter(String),

    #[error("Embedding error: {0}")]
    EmbeddingException(String),

    #[error("Lock acquisition timed out after {0:?}")]
    LockAcquisitionTimeout(std::time::Duration),

    #[error("Cache connection error: {0}")]
    CacheConnectionError(String),

    #[error("No data: {0}")]
    NoDataError(String),

    #[error("Session parameter validation error: {0}")]
    SessionParameterValidationError(String),

    #[error("Session QA entry validation error: {0}")]
    SessionQAEntryValidationError(String),

    #[error("Invalid value: {0}")]
    InvalidValueError(String),

    #[error("Schema validation error: {0}")]
    SchemaValidationError(String),

    #[error("Context window exceeded: {0}")]
    ContextWindowExceeded(String),

    #[error("Missing system prompt path: {0}")]
    MissingSystemPromptPathError(String),
}

impl CogneeError {
    /// Stable machine-readable name, independent of the display message.
    pub fn name(&self) -> &'static str {
        match self {
            Self::CollectionNotFound(_) => "CollectionNotFound",
            Self::MissingQueryParameter(_) => "MissingQueryParameter",
            Self::EmbeddingException(_) => "EmbeddingException",
            Self::LockAcquisitionTimeout(_) => "LockAcquisitionTimeout",
            Self::CacheConnectionError(_) => "CacheConnectionError",
            Self::NoDataError(_) => "NoDataError",
            Self::SessionParameterValidationError(_) => "SessionParameterValidationError",
            Self::SessionQAEntryValidationError(_) => "SessionQAEntryValidationError",
            Self::InvalidValueError(_) => "InvalidValueError",
            Self::SchemaValidationError(_) => "SchemaValidationError",
            Self::ContextWindowExceeded(_) => "ContextWindowExceeded",
            Self::MissingSystemPromptPathError(_) => "MissingSystemPromptPathError",
        }
    }

    /// HTTP-style status hint for an outer API shell.
    pub fn status_hint(&self) -> u16 {
        match self {
            Self::CollectionNotFound(_) => 404,
            Self::MissingQueryParameter(_) => 400,
            Self::EmbeddingException(_) => 502,
            Self::LockAcquisitionTimeout(_) => 423,
            Self::CacheConnectionError(_) => 503,
            Self::NoDataError(_) => 404,
            Self::SessionParameterValidationError(_) => 400,
            Self::SessionQAEntryValidationError(_) => 400,
            Self::InvalidValueError(_) => 400,
            Self::SchemaValidationError(_) => 502,
            Self::ContextWindowExceeded(_) => 413,
            Self::MissingSystemPromptPathError(_) => 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, CogneeError>;
