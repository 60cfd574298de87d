//! Applying a superposition and measuring RMSD without fitting

use super::mclachlan::Superposition;
use crate::linalg::mat3::{dot, sub};
use crate::AlignError;

/// RMSD between two equal-length coordinate sets as they stand, without
/// fitting.
///
/// Point `i` of `coords_a` is compared with point `i` of `coords_b`. Two
/// empty sets have nothing to deviate and give `Ok(0.0)`; sets of different
/// length are an [`AlignError::LengthMismatch`].
pub fn rmsd(coords_a: &[[f64; 3]], coords_b: &[[f64; 3]]) -> Result<f64, AlignError> {
    if coords_a.len() != coords_b.len() {
        return Err(AlignError::LengthMismatch(coords_a.len(), coords_b.len()));
    }
    if coords_a.is_empty() {
        return Ok(0.0);
    }
    let sum: f64 = coords_a
        .iter()
        .zip(coords_b)
        .map(|(a, b)| {
            let diff = sub(*a, *b);
            dot(diff, diff)
        })
        .sum();
    Ok((sum / coords_a.len() as f64).sqrt())
}

/// Apply a superposition to coordinates in place
pub fn apply_transform(coords: &mut [[f64; 3]], sup: &Superposition) {
    let r = &sup.rotation;
    let t = sup.translation();
    // rotation is row-major: r[row*3 + col]
    for coord in coords.iter_mut() {
        let x = coord[0];
        let y = coord[1];
        let z = coord[2];
        coord[0] = r[0] * x + r[1] * y + r[2] * z + t.x;
        coord[1] = r[3] * x + r[4] * y + r[5] * z + t.y;
        coord[2] = r[6] * x + r[7] * y + r[8] * z + t.z;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::align::mclachlan::superpose;
    use approx::assert_abs_diff_eq;

    fn tetrahedron() -> Vec<[f64; 3]> {
        vec![
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ]
    }

    #[test]
    fn test_rmsd_known_value() {
        let a = tetrahedron();
        let b: Vec<[f64; 3]> = a.iter().map(|p| [p[0] + 3.0, p[1] - 4.0, p[2]]).collect();
        assert_abs_diff_eq!(rmsd(&a, &b).unwrap(), 5.0, epsilon = 1e-12);
        assert_eq!(rmsd(&a, &a).unwrap(), 0.0);
    }

    #[test]
    fn test_rmsd_empty() {
        assert_eq!(rmsd(&[], &[]).unwrap(), 0.0);
        let a = tetrahedron();
        assert_eq!(rmsd(&[], &a).unwrap_err(), AlignError::LengthMismatch(0, 4));
    }

    #[test]
    fn test_rmsd_length_mismatch() {
        let a = tetrahedron();
        let err = rmsd(&a, &a[..3]).unwrap_err();
        assert_eq!(err, AlignError::LengthMismatch(4, 3));
    }

    #[test]
    fn test_apply_transform_translation() {
        let source = tetrahedron();
        let target: Vec<[f64; 3]> = source
            .iter()
            .map(|p| [p[0] + 5.0, p[1] + 3.0, p[2] + 1.0])
            .collect();
        let sup = superpose(&source, &target).unwrap();

        let mut moved = source.clone();
        apply_transform(&mut moved, &sup);
        for (m, t) in moved.iter().zip(target.iter()) {
            for k in 0..3 {
                assert_abs_diff_eq!(m[k], t[k], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_apply_transform_matches_reported_rmsd() {
        // 90° about z plus a shift, with one point perturbed
        let source = vec![
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [-1.0, 0.0, 0.0],
            [0.0, -1.0, 0.0],
            [0.0, 0.0, 1.0],
        ];
        let mut target: Vec<[f64; 3]> = source
            .iter()
            .map(|p| [-p[1] + 2.0, p[0] - 1.0, p[2] + 0.5])
            .collect();
        target[4][2] += 0.3;

        let sup = superpose(&source, &target).unwrap();
        let mut moved = source.clone();
        apply_transform(&mut moved, &sup);
        let measured = rmsd(&moved, &target).unwrap();
        assert_abs_diff_eq!(sup.rmsd.to_f64(), measured, epsilon = 1e-9);
        assert!(measured > 0.0);
    }

    #[test]
    fn test_apply_transform_agrees_with_transform_point() {
        let source = tetrahedron();
        let target = vec![
            [2.0, 1.0, 0.0],
            [2.0, 2.0, 0.1],
            [1.0, 1.0, 0.0],
            [2.0, 1.0, 1.0],
        ];
        let sup = superpose(&source, &target).unwrap();
        let mut moved = source.clone();
        apply_transform(&mut moved, &sup);
        for (m, p) in moved.iter().zip(source.iter()) {
            let q = sup.transform_point(lin_alg::f64::Vec3::new(p[0], p[1], p[2]));
            assert_abs_diff_eq!(m[0], q.x, epsilon = 1e-12);
            assert_abs_diff_eq!(m[1], q.y, epsilon = 1e-12);
            assert_abs_diff_eq!(m[2], q.z, epsilon = 1e-12);
        }
    }
}
