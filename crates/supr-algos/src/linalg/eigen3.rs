//! Closed-form eigenvalues of a 3×3 symmetric matrix
//!
//! Solves the characteristic cubic analytically: the trigonometric form
//! when it has three distinct real roots, Cardano's formula otherwise.
//! One root is taken from the cubic, the other two from the deflated
//! quadratic. No iteration.
//!
//! The cubic is set up on the trace-free part `V - (tr V / 3)·I`, so its
//! coefficients carry no cancellation against the trace and roots are
//! accurate relative to the eigenvalue spread rather than to `‖V‖`.
//! That part is also divided by its largest entry before the cubic
//! coefficients are formed, since they grow with the sixth power of the
//! entries.

/// Eigenvalues of a symmetric row-major 3×3 matrix, sorted descending.
///
/// All three roots are real for symmetric input; round-off that would push
/// the quadratic discriminant or the `acos` argument out of range is
/// clamped, so the result is never NaN for finite input.
pub fn symmetric_eigenvalues(v: &[f64; 9]) -> [f64; 3] {
    let shift = (v[0] + v[4] + v[8]) / 3.0;
    let entries = [v[0] - shift, v[4] - shift, v[8] - shift, v[1], v[2], v[5]];
    let size = entries.iter().fold(0.0f64, |acc, x| acc.max(x.abs()));
    if size == 0.0 {
        return [shift; 3];
    }
    let [d00, d11, d22, d01, d02, d12] = entries.map(|x| x / size);

    // det(yI - D) = y^3 + p*y + q for trace-free symmetric D
    let p = -(0.5 * (d00 * d00 + d11 * d11 + d22 * d22) + d01 * d01 + d02 * d02 + d12 * d12);
    let det = d00 * (d11 * d22 - d12 * d12) - d01 * (d01 * d22 - d12 * d02)
        + d02 * (d01 * d12 - d11 * d02);
    let q = -det;
    let t = 0.25 * q * q + p * p * p / 27.0;

    let y1 = if t < 0.0 {
        let r = (0.25 * q * q - t).sqrt();
        let theta = (-0.5 * q / r).clamp(-1.0, 1.0).acos();
        2.0 * r.cbrt() * (theta / 3.0).cos()
    } else {
        let root_t = t.sqrt();
        (-0.5 * q + root_t).cbrt() + (-0.5 * q - root_t).cbrt()
    };

    // Synthetic division by (y - y1): y^2 + a2*y + c2
    let a2 = y1;
    let c2 = p + y1 * a2;
    let disc = (a2 * a2 - 4.0 * c2).max(0.0).sqrt();

    let mut d = [
        y1 * size + shift,
        0.5 * (-a2 + disc) * size + shift,
        0.5 * (-a2 - disc) * size + shift,
    ];

    // d1 >= d2 >= d3
    if d[1] < d[2] {
        d.swap(1, 2);
    }
    if d[0] < d[1] {
        d.swap(0, 1);
    }
    if d[1] < d[2] {
        d.swap(1, 2);
    }
    d
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn assert_eigenvalues(m: &[f64; 9], expected: [f64; 3], tol: f64) {
        let d = symmetric_eigenvalues(m);
        for i in 0..3 {
            assert_abs_diff_eq!(d[i], expected[i], epsilon = tol);
        }
    }

    #[test]
    fn test_diagonal() {
        assert_eigenvalues(&[3.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0], [3.0, 2.0, 1.0], 1e-12);
    }

    #[test]
    fn test_unsorted_diagonal() {
        assert_eigenvalues(&[1.0, 0.0, 0.0, 0.0, 3.0, 0.0, 0.0, 0.0, 2.0], [3.0, 2.0, 1.0], 1e-12);
    }

    #[test]
    fn test_known_symmetric() {
        let m = [2.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 2.0];
        assert_eigenvalues(&m, [4.0, 2.0, 1.0], 1e-12);
    }

    #[test]
    fn test_negative_eigenvalues() {
        let m = [-1.0, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, -7.0];
        assert_eigenvalues(&m, [5.0, -1.0, -7.0], 1e-12);
    }

    #[test]
    fn test_double_root_low() {
        // Simple root is the smallest: the quadratic yields the pair
        let m = [2.0, 0.0, 0.0, 0.0, 2.0, 0.0, 0.0, 0.0, 1.0];
        assert_eigenvalues(&m, [2.0, 2.0, 1.0], 1e-6);
    }

    #[test]
    fn test_double_root_high() {
        let m = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 2.0];
        assert_eigenvalues(&m, [2.0, 1.0, 1.0], 1e-6);
    }

    #[test]
    fn test_triple_root() {
        let m = [1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0];
        let d = symmetric_eigenvalues(&m);
        for x in d {
            assert!(!x.is_nan());
            assert_abs_diff_eq!(x, 1.0, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_near_triple_root() {
        // Spread of 1e-6 around 5: resolved relative to the spread, not to 5
        let m = [5.0 + 1e-6, 0.0, 0.0, 0.0, 5.0, 0.0, 0.0, 0.0, 5.0 - 1e-6];
        assert_eigenvalues(&m, [5.0 + 1e-6, 5.0, 5.0 - 1e-6], 1e-12);
    }

    #[test]
    fn test_extreme_magnitudes() {
        // Unscaled, p³ and q² would overflow (1e200) or underflow (1e-200)
        for scale in [1e200, 1e-200] {
            let m = [2.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 2.0].map(|x| x * scale);
            let d = symmetric_eigenvalues(&m);
            for (x, expected) in d.iter().zip([4.0, 2.0, 1.0]) {
                assert!(x.is_finite(), "scale {}: {:?}", scale, d);
                assert_abs_diff_eq!(x / scale, expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_non_finite_input() {
        let mut m = [2.0, 1.0, 0.0, 1.0, 3.0, 1.0, 0.0, 1.0, 2.0];
        m[4] = f64::NAN;
        assert!(symmetric_eigenvalues(&m).iter().any(|x| !x.is_finite()));
    }

    #[test]
    fn test_zero_matrix() {
        assert_eigenvalues(&[0.0; 9], [0.0, 0.0, 0.0], 0.0);
    }

    #[test]
    fn test_rank_one() {
        // (1,2,3)(1,2,3)ᵀ has eigenvalues 14, 0, 0
        let m = [1.0, 2.0, 3.0, 2.0, 4.0, 6.0, 3.0, 6.0, 9.0];
        assert_eigenvalues(&m, [14.0, 0.0, 0.0], 1e-5);
    }

    #[test]
    fn test_trace_and_determinant_preserved() {
        let m = [4.0, -2.0, 0.5, -2.0, 3.0, 1.5, 0.5, 1.5, 6.0];
        let d = symmetric_eigenvalues(&m);
        assert!(d[0] >= d[1] && d[1] >= d[2]);
        assert_abs_diff_eq!(d[0] + d[1] + d[2], 13.0, epsilon = 1e-10);
        let det = crate::linalg::mat3::determinant_3x3(&m);
        assert_abs_diff_eq!(d[0] * d[1] * d[2], det, epsilon = 1e-8);
    }
}
