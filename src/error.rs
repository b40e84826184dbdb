//! Error types for loopfuse operations

use thiserror::Error;

use crate::Backend;

/// Result type for loopfuse operations
pub type Result<T> = std::result::Result<T, LoopfuseError>;

/// Errors that can occur during loopfuse operations
#[derive(Debug, Clone, Error, PartialEq)]
pub enum LoopfuseError {
    /// Backend not supported on this platform
    #[error("Backend not supported on this platform: {0:?}")]
    UnsupportedBackend(Backend),

    /// Size mismatch between operands
    #[error("Size mismatch: expected {expected}, got {actual}")]
    SizeMismatch {
        /// Expected size
        expected: usize,
        /// Actual size
        actual: usize,
    },

    /// Input value outside the transformation's domain (`1 + x <= 0` or non-finite)
    #[error("Domain error at index {index}: ln(1 + x) undefined for x = {value}")]
    Domain {
        /// Position of the offending element
        index: usize,
        /// The offending value
        value: f64,
    },

    /// Two result sequences diverge beyond tolerance
    #[error(
        "Not close: {mismatched}/{total} elements differ (max abs diff {max_abs_diff:e}, \
         max rel diff {max_rel_diff:e}) at indices {indices:?}"
    )]
    NotClose {
        /// Number of elements outside tolerance
        mismatched: usize,
        /// Number of elements compared
        total: usize,
        /// Offending indices (truncated to the first few)
        indices: Vec<usize>,
        /// Largest absolute divergence among offending elements
        max_abs_diff: f64,
        /// Largest relative divergence among offending elements
        max_rel_diff: f64,
    },

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
