//! Common result and error types for the Kairos toolchain.

/// The standard result type for fallible internal operations.
///
/// `Err` indicates an unrecoverable internal error (a bug in Kairos), not a
/// user-facing error. Expected failures such as an infeasible period or a
/// scheduling stall are explicit error variants of the engine crate.
pub type KairosResult<T> = Result<T, InternalError>;

/// An internal error indicating a bug in Kairos, not a user input problem.
///
/// These errors should never occur during normal operation. If one does occur,
/// an invariant was broken by an earlier phase and the invocation is aborted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("internal retiming error: {message}")]
pub struct InternalError {
    /// Description of the internal error.
    pub message: String,
}

impl InternalError {
    /// Creates a new internal error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<String> for InternalError {
    fn from(message: String) -> Self {
        Self { message }
    }
}
