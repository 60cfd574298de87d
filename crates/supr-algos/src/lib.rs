//! Least-squares superposition of corresponding 3D point sets
//!
//! This crate provides the McLachlan superposition kernel and the small
//! fixed-size linear algebra it is built on:
//! - Closed-form eigenvalues of a symmetric 3×3 matrix
//! - Null-space bases by pivoted elimination
//! - Optimal proper rotation and RMSD between two point sets
//! - Helpers for applying a superposition and measuring RMSD directly

pub mod align;
pub mod linalg;

pub use align::{
    apply_transform, rmsd, superpose, superpose_with, Rmsd, SuperposeParams, Superposition,
    DEGENERATE_RMSD, INSUFFICIENT_POINTS_RMSD,
};

/// Errors from superposition input validation
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AlignError {
    #[error("Coordinate arrays have different lengths: {0} vs {1}")]
    LengthMismatch(usize, usize),

    #[error("Not enough points for superposition (need at least 2, got {0})")]
    InsufficientPoints(usize),

    #[error("Weight count does not match point count: {0} vs {1}")]
    WeightMismatch(usize, usize),

    #[error("Weights must be non-negative with a positive sum")]
    InvalidWeights,
}

impl AlignError {
    /// Scalar RMSD marker for callers that only carry a number.
    ///
    /// Every input error maps to [`INSUFFICIENT_POINTS_RMSD`] (999.0): a
    /// mismatched or invalid input leaves no usable pair set, same as too
    /// few points. The degenerate-fit marker is a separate value, see
    /// [`DEGENERATE_RMSD`].
    pub fn sentinel_rmsd(&self) -> f64 {
        match self {
            AlignError::LengthMismatch(..)
            | AlignError::InsufficientPoints(_)
            | AlignError::WeightMismatch(..)
            | AlignError::InvalidWeights => INSUFFICIENT_POINTS_RMSD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_input_error_reads_as_999() {
        let errors = [
            AlignError::LengthMismatch(3, 4),
            AlignError::InsufficientPoints(1),
            AlignError::WeightMismatch(2, 5),
            AlignError::InvalidWeights,
        ];
        for err in errors {
            assert_eq!(err.sentinel_rmsd(), 999.0, "{}", err);
            assert_ne!(err.sentinel_rmsd(), DEGENERATE_RMSD);
        }
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            AlignError::LengthMismatch(3, 4).to_string(),
            "Coordinate arrays have different lengths: 3 vs 4"
        );
        assert_eq!(
            AlignError::InsufficientPoints(1).to_string(),
            "Not enough points for superposition (need at least 2, got 1)"
        );
    }
}
