//! Orthonormal null-space basis of a 3×3 matrix
//!
//! Gaussian elimination with complete pivoting. The matrix is first
//! divided by its largest absolute entry so that `epsilon` acts as a
//! relative tolerance; the returned rank is the *numerical* null-space
//! dimension under that tolerance, not the exact algebraic one.
//!
//! The matrix is taken by value: elimination runs on a local copy.

use super::mat3::orthonormalize;

/// Below this largest absolute entry the matrix is treated as all zeros
pub const ZERO_MATRIX_THRESHOLD: f64 = 1.0e-10;

/// Null-space basis of a 3×3 matrix
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NullBasis {
    /// Dimension of the null space (0..=3)
    pub rank: usize,
    /// Orthonormal basis vectors; only the first `rank` are meaningful
    pub vectors: [[f64; 3]; 3],
}

impl NullBasis {
    /// The meaningful basis vectors
    pub fn basis(&self) -> &[[f64; 3]] {
        &self.vectors[..self.rank]
    }

    /// Only the zero vector
    fn trivial() -> Self {
        Self {
            rank: 0,
            vectors: [[0.0; 3]; 3],
        }
    }

    /// The whole space, with the standard basis
    fn full() -> Self {
        Self {
            rank: 3,
            vectors: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
        }
    }
}

/// Compute an orthonormal basis for the null space of a row-major 3×3 matrix.
///
/// `epsilon` is the tolerance (relative to the largest entry) below which a
/// pivot or residual counts as zero, e.g. `1e-10`.
pub fn null_basis(m: [f64; 9], epsilon: f64) -> NullBasis {
    let mx0 = m.iter().fold(0.0f64, |acc, x| acc.max(x.abs()));
    if mx0 < ZERO_MATRIX_THRESHOLD {
        return NullBasis::full();
    }

    let mut a = [[0.0f64; 3]; 3];
    for row in 0..3 {
        for col in 0..3 {
            a[row][col] = m[row * 3 + col] / mx0;
        }
    }

    // First pivot: the largest entry overall
    let (r0, c0) = largest_entry(&a);
    let rows = others(r0);
    let cols = others(c0);

    // 2×2 Schur complement over the remaining rows and columns
    let mut b = [[0.0f64; 2]; 2];
    for (i, &row) in rows.iter().enumerate() {
        let factor = a[row][c0] / a[r0][c0];
        for (j, &col) in cols.iter().enumerate() {
            b[i][j] = a[row][col] - factor * a[r0][col];
        }
    }

    // Solve the pivot row for the pivot variable
    let back_substitute = |free: [f64; 2]| -> [f64; 3] {
        let mut x = [0.0f64; 3];
        x[cols[0]] = free[0];
        x[cols[1]] = free[1];
        x[c0] = -(a[r0][cols[0]] * free[0] + a[r0][cols[1]] * free[1]) / a[r0][c0];
        x
    };

    let (bi, bj) = largest_entry(&b);
    let (vectors, rank) = if b[bi][bj].abs() < epsilon {
        // Both remaining variables are free
        (
            [
                back_substitute([1.0, 0.0]),
                back_substitute([0.0, 1.0]),
                [0.0; 3],
            ],
            2,
        )
    } else {
        let (oi, oj) = (1 - bi, 1 - bj);
        let residual = b[oi][oj] - b[oi][bj] / b[bi][bj] * b[bi][oj];
        if !(residual.abs() < epsilon) {
            return NullBasis::trivial();
        }
        // The non-pivot variable is free
        let mut free = [0.0f64; 2];
        free[oj] = 1.0;
        free[bj] = -b[bi][oj] / b[bi][bj];
        ([back_substitute(free), [0.0; 3], [0.0; 3]], 1)
    };

    let mut vectors = vectors;
    if !orthonormalize(&mut vectors[..rank]) {
        return NullBasis::trivial();
    }

    NullBasis { rank, vectors }
}

/// Position of the largest |entry|, first one on ties
fn largest_entry<const R: usize, const C: usize>(a: &[[f64; C]; R]) -> (usize, usize) {
    let mut best = (0, 0);
    for row in 0..R {
        for col in 0..C {
            if a[row][col].abs() > a[best.0][best.1].abs() {
                best = (row, col);
            }
        }
    }
    best
}

/// The two indices in 0..3 other than `i`, in order
fn others(i: usize) -> [usize; 2] {
    match i {
        0 => [1, 2],
        1 => [0, 2],
        _ => [0, 1],
    }
}
