//! Unified error type for flow-based domain computation
//!
//! Configuration mistakes (missing or ambiguous base case, malformed domain
//! axes, unknown identifiers) are surfaced as [`FbmcError`] before any
//! numerical work happens. Failures reported by the grid model or the
//! constraint-reduction collaborator are wrapped and propagated unchanged.
//!
//! Degenerate numerics (non-positive margins or right-hand sides) are not
//! errors; they are clamped and recorded in [`crate::Diagnostics`].
//!
//! # Example
//!
//! ```ignore
//! use fbmc_core::{FbmcError, FbmcResult};
//!
//! fn run(store: &ResultStore) -> FbmcResult<()> {
//!     let basecase = store.select_basecase(None)?;
//!     compute_domain(basecase)?;
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// Unified error type for all FBMC operations.
#[derive(Error, Debug)]
pub enum FbmcError {
    /// No market results were supplied to pick a base case from
    #[error("No results available to select a base case from")]
    NoBaseCase,

    /// Several results available and none was named
    #[error("{0} results available, a base case name must be given (available: {1})")]
    AmbiguousBaseCase(usize, String),

    /// The named base case does not exist
    #[error("Base case '{0}' not found in results")]
    UnknownBaseCase(String),

    /// Timestep missing from the base-case injection table
    #[error("Timestep '{0}' has no injection records")]
    UnknownTimestep(String),

    /// Line identifier not part of the topology
    #[error("Line '{0}' not found")]
    UnknownLine(String),

    /// Zone identifier not part of the topology
    #[error("Zone '{0}' not found")]
    UnknownZone(String),

    /// Domain axis configuration must name exactly two zones
    #[error("Domain axis must contain exactly 2 zones, got {0}")]
    InvalidDomainAxis(usize),

    /// Matrix or vector dimensions disagree
    #[error("Dimension mismatch in {context}: expected {expected}, got {actual}")]
    DimensionMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Data validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Failures from the grid model collaborator
    #[error("Grid model error: {0}")]
    Grid(String),

    /// Failures from the constraint-reduction collaborator
    #[error("Constraint reduction error: {0}")]
    Reduction(String),

    /// I/O errors while reading configuration
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Parsing/deserialization errors
    #[error("Parse error: {0}")]
    Parse(String),

    /// Generic errors (for wrapping external errors)
    #[error("{0}")]
    Other(String),
}

/// Convenience type alias for Results using FbmcError.
pub type FbmcResult<T> = Result<T, FbmcError>;

impl FbmcError {
    pub fn dimension(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        FbmcError::DimensionMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}

impl From<anyhow::Error> for FbmcError {
    fn from(err: anyhow::Error) -> Self {
        FbmcError::Other(err.to_string())
    }
}

impl From<serde_json::Error> for FbmcError {
    fn from(err: serde_json::Error) -> Self {
        FbmcError::Parse(err.to_string())
    }
}

impl From<serde_yaml::Error> for FbmcError {
    fn from(err: serde_yaml::Error) -> Self {
        FbmcError::Parse(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = FbmcError::AmbiguousBaseCase(2, "a, b".into());
        assert!(err.to_string().contains("base case name"));
        assert!(err.to_string().contains("a, b"));

        let err = FbmcError::dimension("ptdf columns", 3, 2);
        assert_eq!(
            err.to_string(),
            "Dimension mismatch in ptdf columns: expected 3, got 2"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: FbmcError = io_err.into();
        assert!(matches!(err, FbmcError::Io(_)));
    }

    #[test]
    fn test_question_mark_operator() {
        fn inner() -> FbmcResult<()> {
            Err(FbmcError::InvalidDomainAxis(3))
        }

        fn outer() -> FbmcResult<()> {
            inner()?;
            Ok(())
        }

        assert!(matches!(outer(), Err(FbmcError::InvalidDomainAxis(3))));
    }
}
