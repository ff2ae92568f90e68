use thiserror::Error;

/// Error taxonomy for all engine operations.
///
/// Each kind maps 1:1 onto a conventional HTTP status family at the service
/// boundary (404, 422, 409, 400) — that mapping lives outside this crate.
#[derive(Debug, Error)]
pub enum EngineError {
    /// The referenced process instance does not exist in the registry.
    #[error("process instance not found: {0}")]
    NotFound(String),

    /// The process definition cannot be compiled into a runnable instance.
    #[error("invalid process definition: {0}")]
    Definition(String),

    /// The operation is not allowed in the instance's current state.
    #[error("invalid instance state: {0}")]
    InvalidState(String),

    /// A caller-supplied value is outside its enumerated domain.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl EngineError {
    /// Short machine-readable code for structured logs and API payloads.
    pub fn code(&self) -> &'static str {
        match self {
            EngineError::NotFound(_) => "NOT_FOUND",
            EngineError::Definition(_) => "DEFINITION_ERROR",
            EngineError::InvalidState(_) => "INVALID_STATE",
            EngineError::Validation(_) => "VALIDATION_ERROR",
        }
    }
}
