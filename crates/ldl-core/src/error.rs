use std::fmt;

/// Errors that can occur while validating or running a block factorization.
#[derive(Debug, Clone, PartialEq)]
pub enum FactorError {
    /// A pivot block failed its Cholesky factorization: the reduced diagonal
    /// entry at `column` (local to the block) was not positive within
    /// tolerance. The decomposition does not exist under the current
    /// ordering; the run is aborted and the buffer contents make no claim
    /// of being a valid factorization.
    NotPositiveDefinite {
        /// Elimination step at which the failure occurred
        step: usize,
        /// Block position of the failing pivot
        block: usize,
        /// Column within the pivot block
        column: usize,
    },
    /// The block collections, index sets, reordering, or value buffer are
    /// inconsistent with each other. These are caller-contract violations,
    /// not runtime conditions the kernel recovers from.
    InvalidStructure { reason: String },
}

impl fmt::Display for FactorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FactorError::NotPositiveDefinite {
                step,
                block,
                column,
            } => write!(
                f,
                "pivot block {} is not positive definite at column {} (elimination step {})",
                block, column, step
            ),
            FactorError::InvalidStructure { reason } => {
                write!(f, "invalid block structure: {}", reason)
            }
        }
    }
}

impl std::error::Error for FactorError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_not_positive_definite() {
        let err = FactorError::NotPositiveDefinite {
            step: 3,
            block: 7,
            column: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("block 7"), "got: {}", msg);
        assert!(msg.contains("column 2"), "got: {}", msg);
        assert!(msg.contains("step 3"), "got: {}", msg);
    }

    #[test]
    fn test_display_invalid_structure() {
        let err = FactorError::InvalidStructure {
            reason: "value buffer too short".to_string(),
        };
        assert!(err.to_string().contains("value buffer too short"));
    }
}
