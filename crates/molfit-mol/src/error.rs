//! Error types for structure construction

use thiserror::Error;

/// Errors that can occur when building labelled structures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MolError {
    /// A per-atom label list does not line up with the coordinate list
    #[error("{what} size mismatch: expected {expected}, got {actual}")]
    ShapeMismatch {
        what: &'static str,
        expected: usize,
        actual: usize,
    },
}

/// Result type for structure construction
pub type MolResult<T> = Result<T, MolError>;
