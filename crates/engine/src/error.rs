use storage::error::StorageError;
use thiserror::Error;
use validator::ValidationErrors;

pub type Result<T> = std::result::Result<T, EngineError>;

/// Expected, recoverable outcomes of engine operations. Every variant except
/// `Internal` is surfaced verbatim to the caller and never logged as a fault.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("quota exceeded: {0}")]
    QuotaExceeded(String),

    #[error("rate limited: retry in {wait_minutes} minute(s)")]
    RateLimited { wait_minutes: i64 },

    #[error("precondition failed: {0}")]
    Precondition(String),

    #[error("validation failed: {0}")]
    Validation(String),

    /// Unexpected failure in a collaborator; detail is logged, not echoed.
    #[error("internal error")]
    Internal,
}

impl EngineError {
    /// Stable machine-readable tag for the error kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "not_found",
            Self::Forbidden(_) => "forbidden",
            Self::Conflict(_) => "conflict",
            Self::InvalidState(_) => "invalid_state",
            Self::QuotaExceeded(_) => "quota_exceeded",
            Self::RateLimited { .. } => "rate_limited",
            Self::Precondition(_) => "precondition",
            Self::Validation(_) => "validation",
            Self::Internal => "internal",
        }
    }
}

impl From<StorageError> for EngineError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotFound => Self::NotFound("resource not found".to_string()),
            StorageError::ConstraintViolation(msg) => Self::Conflict(msg),
            other => {
                tracing::error!("storage failure: {other:?}");
                Self::Internal
            }
        }
    }
}

impl From<ValidationErrors> for EngineError {
    fn from(errors: ValidationErrors) -> Self {
        let details: Vec<String> = errors
            .field_errors()
            .iter()
            .flat_map(|(field, errors)| {
                errors.iter().map(move |e| {
                    format!(
                        "{}: {}",
                        field,
                        e.message
                            .as_ref()
                            .map(|m| m.to_string())
                            .unwrap_or_else(|| e.code.to_string())
                    )
                })
            })
            .collect();

        Self::Validation(details.join("; "))
    }
}

impl From<serde_json::Error> for EngineError {
    fn from(error: serde_json::Error) -> Self {
        tracing::error!("serialization failure: {error}");
        Self::Internal
    }
}
