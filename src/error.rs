use thiserror::Error;
use uuid::Uuid;

/// Coarse classification used when logging recovered errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    InvalidReference,
    ExhaustedPool,
    OutOfRangeInput,
}

impl ErrorKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidReference => "INVALID_REFERENCE",
            ErrorKind::ExhaustedPool => "EXHAUSTED_POOL",
            ErrorKind::OutOfRangeInput => "OUT_OF_RANGE_INPUT",
        }
    }
}

/// Errors raised inside the engine. The public command surface recovers from
/// every variant and never hands them to the presentation layer.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("session not found: {0}")]
    UnknownSession(Uuid),
    #[error("session already retired: {0}")]
    RetiredSession(Uuid),
    #[error("word not found: {0}")]
    UnknownWord(String),
    #[error("word {word_id} is not part of session {session_id}")]
    WordNotInSession { session_id: Uuid, word_id: String },
    #[error("subject not in catalog: {0}")]
    UnknownSubject(String),
    #[error("no content left for subject {0}")]
    ExhaustedPool(String),
    #[error("value out of range: {0}")]
    OutOfRange(String),
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::UnknownSession(_)
            | EngineError::RetiredSession(_)
            | EngineError::UnknownWord(_)
            | EngineError::WordNotInSession { .. }
            | EngineError::UnknownSubject(_) => ErrorKind::InvalidReference,
            EngineError::ExhaustedPool(_) => ErrorKind::ExhaustedPool,
            EngineError::OutOfRange(_) => ErrorKind::OutOfRangeInput,
        }
    }
}

/// Errors loading the content catalog
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog parse failed: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("catalog io failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("duplicate catalog item: {0}")]
    DuplicateItem(String),
    #[error("invalid catalog item {item_id}: {reason}")]
    InvalidItem { item_id: String, reason: String },
}

pub type EngineResult<T> = Result<T, EngineError>;
