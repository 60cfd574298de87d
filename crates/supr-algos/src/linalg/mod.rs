//! Linear algebra for the superposition kernel
//!
//! Fixed-size 3×3 building blocks, no general N×N solving:
//!
//! - [`mat3`]: row-major 3×3 matrix and 3-vector helpers
//! - [`eigen3`]: closed-form eigenvalues of a symmetric 3×3 matrix
//! - [`null_space`]: orthonormal null-space basis by pivoted elimination

pub mod eigen3;
pub mod mat3;
pub mod null_space;

pub use eigen3::symmetric_eigenvalues;
pub use mat3::{
    determinant_3x3, is_identity_3x3, mat3x3_to_mat4, multiply_3x3, transform_3x3,
    transpose_3x3, IDENTITY_3X3,
};
pub use null_space::{null_basis, NullBasis, ZERO_MATRIX_THRESHOLD};
