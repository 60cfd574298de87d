//! 3×3 row-major matrix and 3-vector helpers
//!
//! Matrices are `[f64; 9]` with `m[row * 3 + col]`, vectors are `[f64; 3]`.
//! Everything here is a small stack value; nothing allocates.

/// Row-major 3×3 identity
pub const IDENTITY_3X3: [f64; 9] = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];

/// Vectors shorter than this are treated as zero when normalizing
const NORM_EPSILON: f64 = 1e-12;

/// Transpose a 3×3 row-major matrix
pub fn transpose_3x3(m: &[f64; 9]) -> [f64; 9] {
    [m[0], m[3], m[6], m[1], m[4], m[7], m[2], m[5], m[8]]
}

/// Multiply: result = a * b (row-major 3×3)
pub fn multiply_3x3(a: &[f64; 9], b: &[f64; 9]) -> [f64; 9] {
    let mut out = [0.0f64; 9];
    for row in 0..3 {
        for col in 0..3 {
            out[row * 3 + col] = a[row * 3] * b[col]
                + a[row * 3 + 1] * b[3 + col]
                + a[row * 3 + 2] * b[6 + col];
        }
    }
    out
}

/// Determinant of a 3×3 row-major matrix (cofactor expansion on row 0)
pub fn determinant_3x3(m: &[f64; 9]) -> f64 {
    m[0] * (m[4] * m[8] - m[5] * m[7]) - m[1] * (m[3] * m[8] - m[5] * m[6])
        + m[2] * (m[3] * m[7] - m[4] * m[6])
}

/// Transform a vector by a 3×3 row-major matrix: result = m · v
pub fn transform_3x3(m: &[f64; 9], v: [f64; 3]) -> [f64; 3] {
    [
        m[0] * v[0] + m[1] * v[1] + m[2] * v[2],
        m[3] * v[0] + m[4] * v[1] + m[5] * v[2],
        m[6] * v[0] + m[7] * v[1] + m[8] * v[2],
    ]
}

/// Check if a 3×3 row-major matrix is the identity within `tolerance`
pub fn is_identity_3x3(m: &[f64; 9], tolerance: f64) -> bool {
    m.iter()
        .zip(IDENTITY_3X3.iter())
        .all(|(a, b)| (a - b).abs() <= tolerance)
}

/// Expand a 3×3 rotation and a translation into a 4×4 homogeneous matrix
/// (row-major: top-left 3×3 from `m`, column 3 = translation,
/// row 3 = [0,0,0,1]).
pub fn mat3x3_to_mat4(m: &[f64; 9], translation: [f64; 3]) -> [f64; 16] {
    [
        m[0], m[1], m[2], translation[0], // row 0
        m[3], m[4], m[5], translation[1], // row 1
        m[6], m[7], m[8], translation[2], // row 2
        0.0, 0.0, 0.0, 1.0, // row 3
    ]
}

// ============================================================================
// Vector helpers
// ============================================================================

pub(crate) fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

pub(crate) fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

pub(crate) fn sub(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [a[0] - b[0], a[1] - b[1], a[2] - b[2]]
}

pub(crate) fn scale(v: [f64; 3], factor: f64) -> [f64; 3] {
    [v[0] * factor, v[1] * factor, v[2] * factor]
}

/// Unit vector along `v`, or `None` if `v` is (numerically) zero or not finite
pub(crate) fn normalize(v: [f64; 3]) -> Option<[f64; 3]> {
    let len = dot(v, v).sqrt();
    if len > NORM_EPSILON && len.is_finite() {
        Some(scale(v, 1.0 / len))
    } else {
        None
    }
}

/// Remove the component of `v` along the unit vector `axis`
pub(crate) fn reject(v: [f64; 3], axis: [f64; 3]) -> [f64; 3] {
    sub(v, scale(axis, dot(v, axis)))
}

/// Triple product a · (b × c), i.e. the determinant of the rows a, b, c
pub(crate) fn triple_product(a: [f64; 3], b: [f64; 3], c: [f64; 3]) -> f64 {
    dot(a, cross(b, c))
}

/// Some unit vector perpendicular to `v` (crossed with the axis `v` is
/// least aligned with)
pub(crate) fn arbitrary_perpendicular(v: [f64; 3]) -> [f64; 3] {
    let candidate = if v[0].abs() < v[1].abs() && v[0].abs() < v[2].abs() {
        [1.0, 0.0, 0.0]
    } else if v[1].abs() < v[2].abs() {
        [0.0, 1.0, 0.0]
    } else {
        [0.0, 0.0, 1.0]
    };
    normalize(cross(v, candidate)).unwrap_or([0.0, 0.0, 1.0])
}

/// Gram–Schmidt in place: the first vector is normalized, each later one
/// is projected off the earlier ones and normalized.
///
/// Returns `false` if some vector has no component left.
pub(crate) fn orthonormalize(vectors: &mut [[f64; 3]]) -> bool {
    for i in 0..vectors.len() {
        let mut v = vectors[i];
        for j in 0..i {
            v = reject(v, vectors[j]);
        }
        match normalize(v) {
            Some(unit) => vectors[i] = unit,
            None => return false,
        }
    }
    true
}
