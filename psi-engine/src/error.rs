//! Error types for the PSI engine.

use thiserror::Error;

/// Errors that can occur while running the PSI protocol.
///
/// The variants separate programmer errors (bad arguments, wrong mode),
/// data corruption (malformed wire bytes) and environment failures
/// (no secure randomness).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PsiError {
    /// Key bytes could not be restored into a valid private key.
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// A caller-supplied argument or message was out of range or corrupt.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// An encrypted element did not decode to a curve point.
    #[error("Invalid element at index {index}: {reason}")]
    InvalidElement {
        /// Position of the first (lowest-index) offending element in its batch.
        index: usize,
        reason: String,
    },

    /// The random source failed while generating a key.
    #[error("Entropy source failure: {0}")]
    Entropy(String),
}

impl PsiError {
    /// Re-target an element error at its position inside a batch.
    pub(crate) fn at_index(self, index: usize) -> Self {
        match self {
            PsiError::InvalidElement { reason, .. } => PsiError::InvalidElement { index, reason },
            other => other,
        }
    }
}

/// Result type for PSI operations.
pub type Result<T> = std::result::Result<T, PsiError>;
