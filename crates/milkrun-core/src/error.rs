// crates/milkrun-core/src/error.rs

use thiserror::Error;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum IngestError {
    /// A value is present but cannot be coerced to its column type, or the
    /// store rejected the row's contents.
    #[error("malformed input for `{field}`: {reason}")]
    MalformedInput { field: &'static str, reason: String },

    #[error("event `{0}` has already been recorded")]
    DuplicateKey(String),

    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] BoxError),
}

impl IngestError {
    pub fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        IngestError::MalformedInput {
            field,
            reason: reason.into(),
        }
    }

    pub fn unavailable(source: impl Into<BoxError>) -> Self {
        IngestError::StorageUnavailable(source.into())
    }

    /// Whether a caller may reasonably retry the same delivery.
    pub fn is_transient(&self) -> bool {
        matches!(self, IngestError::StorageUnavailable(_))
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
