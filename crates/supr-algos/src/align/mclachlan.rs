//! McLachlan least-squares superposition
//!
//! Optimal rotation between two corresponding point sets, built from the
//! eigenvectors of UUᵀ and UᵀU where U is the cross-covariance of the
//! centered sets (A.D. McLachlan, "Gene Duplications in the Structural
//! Evolution of Chymotrypsin", J. Mol. Biol. 128 (1979) 49-79, appendix).
//!
//! Eigenvalues come from the closed-form cubic solver and eigenvectors from
//! null spaces of the shifted matrices, so no general SVD is involved.
//! A repeated eigenvalue is handled through its whole eigenspace, which is
//! then split so that the images under U are orthogonal.
//!
//! The singular values entering the RMSD are read back as `|Uᵀhᵢ|` rather
//! than `√dᵢ`: forming UUᵀ squares the condition number, and the square
//! roots of its small eigenvalues carry far more round-off than the
//! projections do.

use lin_alg::f64::Vec3;
use log::{debug, trace};

use crate::linalg::eigen3::symmetric_eigenvalues;
use crate::linalg::mat3::{
    arbitrary_perpendicular, cross, determinant_3x3, dot, mat3x3_to_mat4, multiply_3x3,
    normalize, reject, scale, sub, transform_3x3, transpose_3x3, triple_product, IDENTITY_3X3,
};
use crate::linalg::null_space::null_basis;
use crate::AlignError;

/// RMSD marker for fewer than two point pairs (see [`AlignError::sentinel_rmsd`])
pub const INSUFFICIENT_POINTS_RMSD: f64 = 999.0;

/// RMSD marker for a fit where no reliable eigenvector set was found
pub const DEGENERATE_RMSD: f64 = 100.0;

/// RMSD of a superposition
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Rmsd {
    /// Computed RMSD after optimal alignment
    Value(f64),
    /// The residual `ra + rb - 2Σσᵢ` was not positive. Happens only through
    /// round-off at (or extremely near) a perfect fit.
    Undefined,
    /// Eigenvectors could not be isolated on either UUᵀ or UᵀU; the rotation
    /// is the identity.
    Degenerate,
}

impl Rmsd {
    /// The computed value, `None` for both sentinels
    pub fn value(self) -> Option<f64> {
        match self {
            Rmsd::Value(v) => Some(v),
            Rmsd::Undefined | Rmsd::Degenerate => None,
        }
    }

    /// Flatten to a scalar: `Undefined` reads as 0.0 and `Degenerate` as
    /// [`DEGENERATE_RMSD`].
    pub fn to_f64(self) -> f64 {
        match self {
            Rmsd::Value(v) => v,
            Rmsd::Undefined => 0.0,
            Rmsd::Degenerate => DEGENERATE_RMSD,
        }
    }

    /// `true` unless the eigenstructure was degenerate
    pub fn is_reliable(self) -> bool {
        !matches!(self, Rmsd::Degenerate)
    }
}

/// Numerical tolerances for [`superpose_with`]
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SuperposeParams {
    /// Relative tolerance for "numerically zero" pivots and residuals when
    /// extracting the eigenvector of an isolated eigenvalue.
    /// Default: 1e-10
    pub null_space_epsilon: f64,
    /// Eigenvalues of UUᵀ whose gap is below this fraction of the largest
    /// eigenvalue are treated as one repeated root.
    /// Default: 1e-4
    pub degeneracy_tolerance: f64,
    /// Singular values of U below this fraction of the largest are treated
    /// as zero (collinear or planar point sets).
    /// Default: 1e-12
    pub rank_tolerance: f64,
}

impl Default for SuperposeParams {
    fn default() -> Self {
        Self {
            null_space_epsilon: 1e-10,
            degeneracy_tolerance: 1e-4,
            rank_tolerance: 1e-12,
        }
    }
}

/// Result of a superposition
///
/// `R · (p - source_centroid) + target_centroid` maps the source set onto
/// the target set.
#[derive(Debug, Clone)]
pub struct Superposition {
    /// Proper rotation, row-major 3×3
    pub rotation: [f64; 9],
    /// Centroid of the source set
    pub source_centroid: Vec3,
    /// Centroid of the target set
    pub target_centroid: Vec3,
    /// RMSD after superposition
    pub rmsd: Rmsd,
    /// Number of point pairs used
    pub n_points: usize,
}

impl Superposition {
    /// `true` if no reliable eigenvector set was found
    pub fn is_degenerate(&self) -> bool {
        !self.rmsd.is_reliable()
    }

    /// Translation applied after rotation: `target_centroid - R · source_centroid`
    pub fn translation(&self) -> Vec3 {
        let rc = transform_3x3(&self.rotation, vec3_to_array(self.source_centroid));
        Vec3::new(
            self.target_centroid.x - rc[0],
            self.target_centroid.y - rc[1],
            self.target_centroid.z - rc[2],
        )
    }

    /// Map a source-frame point into the target frame
    pub fn transform_point(&self, p: Vec3) -> Vec3 {
        let centered = sub(vec3_to_array(p), vec3_to_array(self.source_centroid));
        let r = transform_3x3(&self.rotation, centered);
        Vec3::new(
            r[0] + self.target_centroid.x,
            r[1] + self.target_centroid.y,
            r[2] + self.target_centroid.z,
        )
    }

    /// The whole transform as a 4×4 row-major homogeneous matrix
    pub fn to_homogeneous(&self) -> [f64; 16] {
        mat3x3_to_mat4(&self.rotation, vec3_to_array(self.translation()))
    }

    /// The superposition of the target set onto the source set
    pub fn inverse(&self) -> Superposition {
        Superposition {
            rotation: transpose_3x3(&self.rotation),
            source_centroid: self.target_centroid,
            target_centroid: self.source_centroid,
            rmsd: self.rmsd,
            n_points: self.n_points,
        }
    }
}

/// Superpose `source` onto `target` with unit weights and default tolerances.
///
/// Both slices must have the same length (≥ 2); point `i` of one set
/// corresponds to point `i` of the other.
pub fn superpose(source: &[[f64; 3]], target: &[[f64; 3]]) -> Result<Superposition, AlignError> {
    superpose_with(source, target, None, &SuperposeParams::default())
}

/// Superpose `source` onto `target` with optional per-pair weights.
///
/// Input problems are errors. A degenerate eigenstructure is not: it comes
/// back as `Ok` with [`Rmsd::Degenerate`] and the identity rotation.
pub fn superpose_with(
    source: &[[f64; 3]],
    target: &[[f64; 3]],
    weights: Option<&[f64]>,
    params: &SuperposeParams,
) -> Result<Superposition, AlignError> {
    let n = source.len();
    if n != target.len() {
        return Err(AlignError::LengthMismatch(n, target.len()));
    }
    if n <= 1 {
        return Err(AlignError::InsufficientPoints(n));
    }
    if let Some(w) = weights {
        if w.len() != n {
            return Err(AlignError::WeightMismatch(w.len(), n));
        }
        if w.iter().any(|x| !(*x >= 0.0)) || !(w.iter().sum::<f64>() > 0.0) {
            return Err(AlignError::InvalidWeights);
        }
    }

    let Moments { ca, cb, ra, rb, u } = moments(source, target, weights);

    let finish = |rotation: [f64; 9], rmsd: Rmsd| Superposition {
        rotation,
        source_centroid: array_to_vec3(ca),
        target_centroid: array_to_vec3(cb),
        rmsd,
        n_points: n,
    };

    if !u.iter().chain([ra, rb].iter()).all(|x| x.is_finite()) {
        debug!("non-finite coordinates or weights, no superposition");
        return Ok(finish(IDENTITY_3X3, Rmsd::Degenerate));
    }

    let u_scale = u.iter().fold(0.0f64, |acc, x| acc.max(x.abs()));
    if !(u_scale > 0.0) {
        // U = 0: every rotation is equally good
        debug!("correlation matrix vanishes, using identity rotation");
        return Ok(finish(IDENTITY_3X3, residual_rmsd(ra + rb)));
    }

    // 5. V1 = UUᵀ and V2 = UᵀU share their eigenvalues. U is divided by its
    // largest entry first so that V stays in range at any coordinate scale.
    let u = u.map(|x| x / u_scale);
    let ut = transpose_3x3(&u);
    let v1 = multiply_3x3(&u, &ut);
    let v2 = multiply_3x3(&ut, &u);
    let d = symmetric_eigenvalues(&v1);
    trace!("eigenvalues of UUᵀ / max|U|²: {:?}", d);

    if !(d.iter().all(|x| x.is_finite()) && d[0] > 0.0) {
        debug!("eigenvalue solve failed: {:?}", d);
        return Ok(finish(IDENTITY_3X3, Rmsd::Degenerate));
    }
    let d = d.map(|x| x.max(0.0));

    // 6. Normalize so tolerances are relative to the largest eigenvalue
    let spectrum = Spectrum::new(&d, d[0], params.degeneracy_tolerance);
    let v1 = v1.map(|x| x / d[0]);
    let v2 = v2.map(|x| x / d[0]);

    // 7-8. Eigenvectors of UUᵀ, falling back to UᵀU
    let frames = eigenvectors(&v1, &spectrum, params)
        .map(|h| (Side::Left, h))
        .or_else(|| {
            debug!("no eigenvector set for UUᵀ, retrying with UᵀU");
            eigenvectors(&v2, &spectrum, params).map(|k| (Side::Right, k))
        });

    let Some((side, frame)) = frames else {
        debug!("no eigenvector set for UUᵀ or UᵀU, eigenvalues {:?}", d);
        return Ok(finish(IDENTITY_3X3, Rmsd::Degenerate));
    };

    // 9-10. Partners, rotation and singular values
    let fit = assemble(&u, side, frame, params);
    let sigma = fit.singular_values.map(|x| x * u_scale);
    trace!("singular values of U: {:?}, s = {}", sigma, fit.sign);

    // 11. e = ra + rb - 2(σ1 + σ2 + s·σ3)
    let e = ra + rb - 2.0 * (sigma[0] + sigma[1] + fit.sign * sigma[2]);

    Ok(finish(fit.rotation, residual_rmsd(e)))
}

/// Weighted centroids, radii of gyration and correlation matrix
/// `U = Σ wᵢ aᵢ ⊗ bᵢ / Σ wᵢ` of the centered sets
#[derive(Debug, Clone, Copy)]
struct Moments {
    ca: [f64; 3],
    cb: [f64; 3],
    ra: f64,
    rb: f64,
    u: [f64; 9],
}

fn moments(source: &[[f64; 3]], target: &[[f64; 3]], weights: Option<&[f64]>) -> Moments {
    let n = source.len();
    let weight = |i: usize| weights.map_or(1.0, |w| w[i]);
    let total_weight = weights.map_or(n as f64, |w| w.iter().sum());

    // 1. Centroids
    let mut ca = [0.0f64; 3];
    let mut cb = [0.0f64; 3];
    for i in 0..n {
        let w = weight(i);
        for k in 0..3 {
            ca[k] += w * source[i][k];
            cb[k] += w * target[i][k];
        }
    }
    let ca = scale(ca, 1.0 / total_weight);
    let cb = scale(cb, 1.0 / total_weight);

    // 2-3. Radii of gyration and correlation matrix
    let mut ra = 0.0f64;
    let mut rb = 0.0f64;
    let mut u = [0.0f64; 9];
    for i in 0..n {
        let w = weight(i);
        let a = sub(source[i], ca);
        let b = sub(target[i], cb);
        ra += w * dot(a, a);
        rb += w * dot(b, b);
        for row in 0..3 {
            for col in 0..3 {
                u[row * 3 + col] += w * a[row] * b[col];
            }
        }
    }
    for x in u.iter_mut() {
        *x /= total_weight;
    }

    Moments {
        ca,
        cb,
        ra: ra / total_weight,
        rb: rb / total_weight,
        u,
    }
}

/// Rotation built from one eigenframe, with the singular values of U it
/// carries and the sign applied to the third pair
#[derive(Debug, Clone, Copy)]
struct Fit {
    rotation: [f64; 9],
    singular_values: [f64; 3],
    sign: f64,
}

/// Complete an eigenframe of UUᵀ (`Side::Left`, h-vectors) or UᵀU
/// (`Side::Right`, k-vectors) into `R = k1⊗h1 + k2⊗h2 + s·k3⊗h3`.
fn assemble(u: &[f64; 9], side: Side, mut frame: Frame, params: &SuperposeParams) -> Fit {
    // 4. Proper vs. improper alignment
    let det_sign = if determinant_3x3(u) < 0.0 { -1.0 } else { 1.0 };

    // 9. Partners on the other side: k ∝ Uᵀh or h ∝ Uk
    let [f0, f1, f2] = frame.vectors;
    let orientation = det_sign * triple_product(f0, f1, f2).signum();
    let m = match side {
        Side::Left => transpose_3x3(u),
        Side::Right => *u,
    };
    let pairing = pair_vectors(&m, &mut frame, orientation, params);
    let (h, k) = match side {
        Side::Left => (frame.vectors, pairing.partners),
        Side::Right => (pairing.partners, frame.vectors),
    };

    // 10. s = sign(det U) read off the two frames, which stays consistent
    // when det(U) itself is round-off
    let sign = (triple_product(k[0], k[1], k[2]) * triple_product(h[0], h[1], h[2])).signum();
    let mut rotation = [0.0f64; 9];
    for i in 0..3 {
        let s = if i == 2 { sign } else { 1.0 };
        for row in 0..3 {
            for col in 0..3 {
                rotation[row * 3 + col] += s * k[i][row] * h[i][col];
            }
        }
    }

    Fit {
        rotation,
        singular_values: pairing.singular_values,
        sign,
    }
}

/// Below this (relative) size the trace-free part of a nearly isotropic
/// matrix is round-off and any frame is an eigenframe
const ISOTROPY_FLOOR: f64 = 1e-13;

/// Which matrix the eigenvectors were extracted from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Side {
    /// UUᵀ: the h-vectors
    Left,
    /// UᵀU: the k-vectors
    Right,
}

/// Eigenvalues normalized to the largest, with near-equal neighbours merged
/// into one repeated root.
#[derive(Debug, Clone, Copy)]
struct Spectrum {
    values: [f64; 3],
    merged: [bool; 3],
}

impl Spectrum {
    fn new(d: &[f64; 3], scale_factor: f64, tolerance: f64) -> Self {
        let mut values = d.map(|x| x / scale_factor);
        let mut merged = [false; 3];

        if values[0] - values[2] <= tolerance {
            let mean = (values[0] + values[1] + values[2]) / 3.0;
            return Self {
                values: [mean; 3],
                merged: [true; 3],
            };
        }

        let upper = values[0] - values[1];
        let lower = values[1] - values[2];
        let pair = if upper <= tolerance && upper <= lower {
            Some(0)
        } else if lower <= tolerance {
            Some(1)
        } else {
            None
        };

        if let Some(i) = pair {
            let mean = 0.5 * (values[i] + values[i + 1]);
            values[i] = mean;
            values[i + 1] = mean;
            merged[i] = true;
            merged[i + 1] = true;
        }

        Self { values, merged }
    }

    fn is_isotropic(&self) -> bool {
        self.merged.iter().all(|&m| m)
    }

    /// First slot of a merged pair
    fn pair(&self) -> Option<usize> {
        if self.is_isotropic() {
            return None;
        }
        (0..2).find(|&i| self.merged[i] && self.merged[i + 1])
    }
}

/// Orthonormal eigenframe, one vector per eigenvalue slot
#[derive(Debug, Clone, Copy)]
struct Frame {
    vectors: [[f64; 3]; 3],
    /// First slot of a repeated root whose two vectors are not yet split
    pair: Option<usize>,
}

impl Frame {
    fn identity() -> Self {
        Self {
            vectors: [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]],
            pair: None,
        }
    }
}

/// Orthonormal eigenvectors of a (normalized) symmetric matrix.
///
/// Slot `i` of an isolated eigenvalue is filled from the null space of
/// `V - dᵢI`; a k-dimensional null space fills slots i, i+1, ... (mod 3) in
/// order and those slots are skipped. A merged pair gets the orthogonal
/// complement of the isolated vector. Returns `None` when a solve comes back
/// empty or would overwrite an already filled slot.
fn eigenvectors(v: &[f64; 9], spectrum: &Spectrum, params: &SuperposeParams) -> Option<Frame> {
    if spectrum.is_isotropic() {
        return Some(isotropic_frame(v, params));
    }

    let mut slots: [Option<[f64; 3]>; 3] = [None; 3];
    for i in 0..3 {
        if slots[i].is_some() || spectrum.merged[i] {
            continue;
        }

        let mut shifted = *v;
        for j in 0..3 {
            shifted[j * 4] -= spectrum.values[i];
        }

        let basis = null_basis(shifted, params.null_space_epsilon);
        trace!("slot {}: null space rank {}", i, basis.rank);
        if basis.rank == 0 {
            return None;
        }

        for (j, vector) in basis.basis().iter().enumerate() {
            let slot = &mut slots[(i + j) % 3];
            if slot.is_some() {
                return None;
            }
            *slot = Some(*vector);
        }
    }

    let pair = spectrum.pair();
    if let Some(i) = pair {
        let axis = slots[if i == 0 { 2 } else { 0 }]?;
        if slots[i].is_some() || slots[i + 1].is_some() {
            return None;
        }
        let p = arbitrary_perpendicular(axis);
        slots[i] = Some(p);
        slots[i + 1] = Some(cross(axis, p));
    }

    let [Some(first), Some(second), Some(third)] = slots else {
        return None;
    };

    // Vectors from different solves are orthogonal only up to round-off
    let first = normalize(first)?;
    let second = normalize(reject(second, first))?;
    let third = normalize(reject(reject(third, first), second))
        .unwrap_or_else(|| cross(first, second));
    Some(Frame {
        vectors: [first, second, third],
        pair,
    })
}

/// Eigenframe of a matrix whose three eigenvalues were merged, taken from
/// its rescaled trace-free part. The identity when that part is round-off.
fn isotropic_frame(v: &[f64; 9], params: &SuperposeParams) -> Frame {
    let mean = (v[0] + v[4] + v[8]) / 3.0;
    let mut deviation = *v;
    for j in 0..3 {
        deviation[j * 4] -= mean;
    }

    let size = deviation.iter().fold(0.0f64, |acc, x| acc.max(x.abs()));
    if !(size > ISOTROPY_FLOOR) {
        return Frame::identity();
    }

    let deviation = deviation.map(|x| x / size);
    let spectrum = Spectrum::new(
        &symmetric_eigenvalues(&deviation),
        1.0,
        params.degeneracy_tolerance,
    );
    if spectrum.is_isotropic() {
        return Frame::identity();
    }
    eigenvectors(&deviation, &spectrum, params).unwrap_or_else(Frame::identity)
}

/// Partner vectors of a frame and the singular values of U they carry
#[derive(Debug, Clone, Copy)]
struct Pairing {
    partners: [[f64; 3]; 3],
    singular_values: [f64; 3],
}

/// Singular-vector partners of `frame` under `m` (Uᵀ for h → k, U for k → h).
///
/// Partner `i` is `m · fᵢ` with the earlier partners projected out, so
/// leakage from a slightly tilted `fᵢ` does not reach the small singular
/// values. An unsplit pair is first rotated within its plane so that its
/// two images are orthogonal. Partners of (numerically) zero singular
/// values are not determined by `m`: the second becomes any perpendicular
/// vector, the third `orientation · (p1 × p2)`.
fn pair_vectors(
    m: &[f64; 9],
    frame: &mut Frame,
    orientation: f64,
    params: &SuperposeParams,
) -> Pairing {
    let mut partners = [[0.0f64; 3]; 3];
    let mut singular_values = [0.0f64; 3];

    for i in 0..3 {
        if frame.pair == Some(i) {
            split_pair(m, frame, i, &partners[..i]);
        }

        let image = settle(transform_3x3(m, frame.vectors[i]), &partners[..i]);
        let length = dot(image, image).sqrt();
        singular_values[i] = length;

        let resolved = length.is_finite()
            && length > 0.0
            && length > params.rank_tolerance * singular_values[0];
        partners[i] = if resolved {
            scale(image, 1.0 / length)
        } else {
            match i {
                0 => frame.vectors[0],
                1 => arbitrary_perpendicular(partners[0]),
                _ => scale(cross(partners[0], partners[1]), orientation),
            }
        };
    }

    frame.pair = None;
    Pairing {
        partners,
        singular_values,
    }
}

/// Rotate slots `i` and `i + 1` within their plane so that their images
/// under `m` are orthogonal, the longer one first
fn split_pair(m: &[f64; 9], frame: &mut Frame, i: usize, settled: &[[f64; 3]]) {
    let a = settle(transform_3x3(m, frame.vectors[i]), settled);
    let b = settle(transform_3x3(m, frame.vectors[i + 1]), settled);
    let theta = 0.5 * (2.0 * dot(a, b)).atan2(dot(a, a) - dot(b, b));
    let (sin, cos) = theta.sin_cos();

    let x = frame.vectors[i];
    let y = frame.vectors[i + 1];
    for c in 0..3 {
        frame.vectors[i][c] = cos * x[c] + sin * y[c];
        frame.vectors[i + 1][c] = cos * y[c] - sin * x[c];
    }
}

/// Project out the components along already settled (orthonormal) partners
fn settle(v: [f64; 3], partners: &[[f64; 3]]) -> [f64; 3] {
    partners.iter().fold(v, |acc, p| reject(acc, *p))
}

fn residual_rmsd(e: f64) -> Rmsd {
    if e > 0.0 {
        Rmsd::Value(e.sqrt())
    } else {
        Rmsd::Undefined
    }
}

fn vec3_to_array(v: Vec3) -> [f64; 3] {
    [v.x, v.y, v.z]
}

fn array_to_vec3(v: [f64; 3]) -> Vec3 {
    Vec3::new(v[0], v[1], v[2])
}
