//! Selection error types.

use thiserror::Error;

/// Errors that end a selection call.
///
/// Zero-survivor outcomes are not errors; they are reported through
/// [`crate::SelectionReport`]. A failed utilization fetch for one
/// candidate is not an error either: that candidate is excluded.
#[derive(Debug, Error)]
pub enum SelectionError {
    #[error("invalid selection criteria: {0}")]
    InvalidCriteria(String),

    #[error("inventory retrieval failed: {0}")]
    Inventory(#[from] CollaboratorError),
}

pub type SelectionResult<T> = Result<T, SelectionError>;

/// Failure reported by an external collaborator (inventory, metrics,
/// health probe).
#[derive(Debug, Clone, Error, PartialEq)]
pub enum CollaboratorError {
    #[error("collaborator unreachable: {0}")]
    Unreachable(String),

    #[error("collaborator rejected credentials: {0}")]
    Unauthorized(String),

    #[error("unexpected response status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed collaborator payload: {0}")]
    Malformed(String),

    #[error("no data: {0}")]
    NoData(String),
}
