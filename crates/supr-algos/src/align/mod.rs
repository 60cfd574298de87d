//! Structural superposition
//!
//! - McLachlan eigenvector superposition with proper-rotation correction
//! - Applying a superposition and RMSD without fitting

pub mod mclachlan;
pub mod transform;

pub use mclachlan::{
    superpose, superpose_with, Rmsd, SuperposeParams, Superposition, DEGENERATE_RMSD,
    INSUFFICIENT_POINTS_RMSD,
};
pub use transform::{apply_transform, rmsd};
