//! Structured error types for engine operations.

use serde::Serialize;
use std::fmt;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors
    MissingRequiredField,
    InvalidFieldValue,
    InvalidTaskId,

    // Not found errors
    TaskNotFound,
    SubtaskNotFound,
    TagNotFound,
    FileNotFound,

    // Conflict errors
    TagAlreadyExists,
    ReservedTagName,
    ActiveTagDeletion,
    DependencyCycle,

    // Provider errors
    ProviderOverloaded,
    FallbackExhausted,
    ProviderFailure,

    // Reconciliation errors
    ReconciliationFailed,

    // Internal errors
    InternalError,
}

/// Structured error returned by every pipeline.
///
/// Programmatic callers receive the `{code, message}` pair; the CLI renders
/// the message and exits non-zero.
#[derive(Debug, Serialize)]
pub struct EngineError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl EngineError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    // Convenience constructors

    pub fn missing_field(field: &str) -> Self {
        Self::new(
            ErrorCode::MissingRequiredField,
            format!("{} is required", field),
        )
        .with_field(field)
    }

    pub fn invalid_value(field: &str, reason: &str) -> Self {
        Self::new(ErrorCode::InvalidFieldValue, reason).with_field(field)
    }

    pub fn invalid_task_id(raw: &str) -> Self {
        Self::new(ErrorCode::InvalidTaskId, format!("Invalid task id: {}", raw))
    }

    pub fn task_not_found(task_id: u64) -> Self {
        Self::new(
            ErrorCode::TaskNotFound,
            format!("Task not found: {}", task_id),
        )
    }

    pub fn subtask_not_found(parent_id: u64, subtask_id: u64) -> Self {
        Self::new(
            ErrorCode::SubtaskNotFound,
            format!("Subtask not found: {}.{}", parent_id, subtask_id),
        )
    }

    pub fn tag_not_found(tag: &str) -> Self {
        Self::new(ErrorCode::TagNotFound, format!("Tag not found: {}", tag))
    }

    pub fn file_not_found(path: &str) -> Self {
        Self::new(ErrorCode::FileNotFound, format!("File not found: {}", path))
    }

    pub fn tag_exists(tag: &str) -> Self {
        Self::new(
            ErrorCode::TagAlreadyExists,
            format!("Tag already exists: {}", tag),
        )
    }

    pub fn reserved_tag(tag: &str) -> Self {
        Self::new(
            ErrorCode::ReservedTagName,
            format!("Tag name is reserved: {}", tag),
        )
    }

    pub fn active_tag_deletion(tag: &str) -> Self {
        Self::new(
            ErrorCode::ActiveTagDeletion,
            format!(
                "Cannot delete the active tag \"{}\"; switch to another tag first",
                tag
            ),
        )
    }

    pub fn dependency_cycle(from: &str, to: &str) -> Self {
        Self::new(
            ErrorCode::DependencyCycle,
            format!("Adding dependency {} -> {} would create a cycle", from, to),
        )
    }

    pub fn fallback_exhausted(attempts: u32) -> Self {
        Self::new(
            ErrorCode::FallbackExhausted,
            format!(
                "All providers overloaded after {} attempt(s); giving up",
                attempts
            ),
        )
    }

    pub fn provider_failure(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::ProviderFailure, err.to_string())
    }

    pub fn reconciliation(reason: impl fmt::Display) -> Self {
        Self::new(ErrorCode::ReconciliationFailed, reason.to_string())
    }

    pub fn internal(err: impl fmt::Display) -> Self {
        Self::new(ErrorCode::InternalError, err.to_string())
    }
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for EngineError {}

// Allow using ? with anyhow errors by converting them
impl From<anyhow::Error> for EngineError {
    fn from(err: anyhow::Error) -> Self {
        match err.downcast::<EngineError>() {
            Ok(engine_err) => engine_err,
            Err(err) => EngineError::internal(err),
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = std::result::Result<T, EngineError>;
