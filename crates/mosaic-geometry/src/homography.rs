use crate::{
    linalg::{self, Mat33, IDENTITY33},
    HomographyError,
};

const SINGULAR_DET_EPS: f64 = 1e-12;

/// A planar projective transform, stored row-major and scaled so that `H[2][2] == 1`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography(Mat33);

impl Default for Homography {
    fn default() -> Self {
        Self::identity()
    }
}

impl Homography {
    /// The identity transform.
    pub fn identity() -> Self {
        Self(IDENTITY33)
    }

    /// A pure translation by `(tx, ty)`.
    pub fn translation(tx: f64, ty: f64) -> Self {
        Self([[1.0, 0.0, tx], [0.0, 1.0, ty], [0.0, 0.0, 1.0]])
    }

    /// Build a homography from a 3x3 matrix, rescaling it so that its last element is one.
    ///
    /// # Errors
    ///
    /// Returns [`HomographyError::DegenerateGeometry`] when the last element is zero or the
    /// matrix is not finite.
    pub fn from_matrix(mut m: Mat33) -> Result<Self, HomographyError> {
        if !linalg::normalize_mat33_inplace(&mut m) {
            return Err(HomographyError::DegenerateGeometry(
                "the matrix cannot be scaled to H[2][2] = 1".into(),
            ));
        }
        Ok(Self(m))
    }

    /// The underlying row-major matrix.
    pub fn matrix(&self) -> &Mat33 {
        &self.0
    }

    /// The matrix flattened row-major in single precision, as consumed by the image warps.
    pub fn to_row_major_f32(&self) -> [f32; 9] {
        let m = &self.0;
        [
            m[0][0] as f32,
            m[0][1] as f32,
            m[0][2] as f32,
            m[1][0] as f32,
            m[1][1] as f32,
            m[1][2] as f32,
            m[2][0] as f32,
            m[2][1] as f32,
            m[2][2] as f32,
        ]
    }

    /// The matrix flattened row-major.
    pub fn to_row_major(&self) -> [f64; 9] {
        let m = &self.0;
        [
            m[0][0], m[0][1], m[0][2], m[1][0], m[1][1], m[1][2], m[2][0], m[2][1], m[2][2],
        ]
    }

    /// Determinant of the matrix.
    pub fn determinant(&self) -> f64 {
        linalg::det_mat33(&self.0)
    }

    /// Whether the transform collapses the plane and cannot be used for warping.
    pub fn is_singular(&self) -> bool {
        let det = self.determinant();
        !det.is_finite() || det.abs() < SINGULAR_DET_EPS
    }

    /// Map an `[x, y]` point, returning `None` when it is sent to infinity.
    pub fn transform_point(&self, p: &[f64; 2]) -> Option<[f64; 2]> {
        let [x, y, w] = linalg::mat33_mul_vec3(&self.0, &[p[0], p[1], 1.0]);
        let out = [x / w, y / w];
        (w != 0.0 && out[0].is_finite() && out[1].is_finite()).then_some(out)
    }

    /// The transform applying `other` first and then `self`, i.e. `self * other`.
    ///
    /// # Errors
    ///
    /// Returns [`HomographyError::DegenerateGeometry`] when the product cannot be normalized.
    pub fn compose(&self, other: &Homography) -> Result<Homography, HomographyError> {
        Self::from_matrix(linalg::matmul33(&self.0, &other.0))
    }

    /// The inverse transform.
    ///
    /// # Errors
    ///
    /// Returns [`HomographyError::DegenerateGeometry`] for a singular matrix.
    pub fn inverse(&self) -> Result<Homography, HomographyError> {
        let inv = linalg::inverse_mat33(&self.0).ok_or_else(|| {
            HomographyError::DegenerateGeometry("the homography is not invertible".into())
        })?;
        Self::from_matrix(inv)
    }
}

/// Isotropic similarity moving the centroid to the origin with a mean distance of sqrt(2).
///
/// Returns the transform and its inverse.
fn normalization_transform(points: &[[f64; 2]]) -> Result<(Mat33, Mat33), HomographyError> {
    let n = points.len() as f64;
    let cx = points.iter().map(|p| p[0]).sum::<f64>() / n;
    let cy = points.iter().map(|p| p[1]).sum::<f64>() / n;
    let mean_dist = points
        .iter()
        .map(|p| ((p[0] - cx).powi(2) + (p[1] - cy).powi(2)).sqrt())
        .sum::<f64>()
        / n;

    if !(mean_dist > 0.0) || !mean_dist.is_finite() {
        return Err(HomographyError::DegenerateGeometry(
            "all points are coincident".into(),
        ));
    }

    let s = std::f64::consts::SQRT_2 / mean_dist;
    let t = [[s, 0.0, -s * cx], [0.0, s, -s * cy], [0.0, 0.0, 1.0]];
    let t_inv = [[1.0 / s, 0.0, cx], [0.0, 1.0 / s, cy], [0.0, 0.0, 1.0]];

    Ok((t, t_inv))
}

/// Estimate the homography mapping `src` onto `dst` with the normalized Direct Linear
/// Transform.
///
/// Both point sets are first moved to their centroid and scaled to a mean distance of
/// sqrt(2). The 2N x 9 constraint matrix is then solved in the least-squares sense by SVD
/// and the solution is denormalized and scaled so that `H[2][2] == 1`.
///
/// Collinear configurations still produce a matrix; use [`Homography::is_singular`] or the
/// reprojection residuals to validate it.
///
/// # Arguments
///
/// * `src` - The source `[x, y]` points.
/// * `dst` - The corresponding destination `[x, y]` points.
///
/// # Errors
///
/// * [`HomographyError::MismatchedLengths`] when the sets differ in length.
/// * [`HomographyError::InsufficientFeatures`] with fewer than 4 correspondences.
/// * [`HomographyError::DegenerateGeometry`] when a set is coincident or the solution
///   cannot be normalized.
///
/// # Example
///
/// ```
/// use mosaic_geometry::estimate_homography;
///
/// let src = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
/// let dst = [[2.0, 3.0], [3.0, 3.0], [2.0, 4.0], [3.0, 4.0]];
///
/// let h = estimate_homography(&src, &dst).unwrap();
/// let p = h.transform_point(&[0.5, 0.5]).unwrap();
/// assert!((p[0] - 2.5).abs() < 1e-9 && (p[1] - 3.5).abs() < 1e-9);
/// ```
pub fn estimate_homography(
    src: &[[f64; 2]],
    dst: &[[f64; 2]],
) -> Result<Homography, HomographyError> {
    if src.len() != dst.len() {
        return Err(HomographyError::MismatchedLengths {
            src: src.len(),
            dst: dst.len(),
        });
    }

    let n = src.len();
    if n < 4 {
        return Err(HomographyError::InsufficientFeatures {
            required: 4,
            actual: n,
        });
    }

    let (t_src, _) = normalization_transform(src)?;
    let (t_dst, t_dst_inv) = normalization_transform(dst)?;

    // construct matrix A from the normalized correspondences
    let mut mat_a = faer::Mat::<f64>::zeros(2 * n, 9);
    for (i, (ps, pd)) in src.iter().zip(dst.iter()).enumerate() {
        let [x, y, _] = linalg::mat33_mul_vec3(&t_src, &[ps[0], ps[1], 1.0]);
        let [u, v, _] = linalg::mat33_mul_vec3(&t_dst, &[pd[0], pd[1], 1.0]);

        let (r0, r1) = (2 * i, 2 * i + 1);
        mat_a.write(r0, 0, -x);
        mat_a.write(r0, 1, -y);
        mat_a.write(r0, 2, -1.0);
        mat_a.write(r0, 6, x * u);
        mat_a.write(r0, 7, y * u);
        mat_a.write(r0, 8, u);

        mat_a.write(r1, 3, -x);
        mat_a.write(r1, 4, -y);
        mat_a.write(r1, 5, -1.0);
        mat_a.write(r1, 6, x * v);
        mat_a.write(r1, 7, y * v);
        mat_a.write(r1, 8, v);
    }

    // the right singular vector of the smallest singular value
    let svd = mat_a.svd();
    let h = svd.v().col(8);
    let h_norm = [[h[0], h[1], h[2]], [h[3], h[4], h[5]], [h[6], h[7], h[8]]];

    let m = linalg::matmul33(&linalg::matmul33(&t_dst_inv, &h_norm), &t_src);

    Homography::from_matrix(m)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn project(h: &Mat33, points: &[[f64; 2]]) -> Vec<[f64; 2]> {
        points
            .iter()
            .map(|p| {
                let [x, y, w] = linalg::mat33_mul_vec3(h, &[p[0], p[1], 1.0]);
                [x / w, y / w]
            })
            .collect()
    }

    fn assert_mat33_eq(a: &Mat33, b: &Mat33, eps: f64) {
        for i in 0..3 {
            for j in 0..3 {
                assert_relative_eq!(a[i][j], b[i][j], epsilon = eps);
            }
        }
    }

    #[test]
    fn test_estimate_homography_identity() -> Result<(), HomographyError> {
        let x = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let h = estimate_homography(&x, &x)?;
        assert_mat33_eq(h.matrix(), &IDENTITY33, 1e-9);
        Ok(())
    }

    #[test]
    fn test_estimate_homography_perspective() -> Result<(), HomographyError> {
        let expected = [
            [0.9, -0.12, 25.0],
            [0.08, 1.1, -13.0],
            [2.0e-4, -1.5e-4, 1.0],
        ];
        let src = [
            [10.0, 12.0],
            [250.0, 20.0],
            [30.0, 190.0],
            [260.0, 210.0],
            [140.0, 95.0],
            [75.0, 160.0],
            [200.0, 60.0],
        ];
        let dst = project(&expected, &src);

        let h = estimate_homography(&src, &dst)?;
        assert_mat33_eq(h.matrix(), &expected, 1e-6);
        assert_eq!(h.matrix()[2][2], 1.0);

        // four points are enough
        let h4 = estimate_homography(&src[..4], &dst[..4])?;
        assert_mat33_eq(h4.matrix(), &expected, 1e-6);

        Ok(())
    }

    #[test]
    fn test_estimate_homography_errors() {
        let pts = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]];
        assert_eq!(
            estimate_homography(&pts, &pts),
            Err(HomographyError::InsufficientFeatures {
                required: 4,
                actual: 3
            })
        );

        let four = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        assert_eq!(
            estimate_homography(&four, &pts),
            Err(HomographyError::MismatchedLengths { src: 4, dst: 3 })
        );

        let coincident = [[2.0, 2.0]; 4];
        assert!(matches!(
            estimate_homography(&coincident, &four),
            Err(HomographyError::DegenerateGeometry(_))
        ));
    }

    #[test]
    fn test_estimate_homography_collinear_returns_matrix() {
        let line = [[0.0, 0.0], [1.0, 1.0], [2.0, 2.0], [3.0, 3.0]];
        let other = [[0.0, 1.0], [1.0, 2.0], [2.0, 3.0], [3.0, 4.0]];
        // the constraints leave the solution underdetermined but an estimate is returned
        // unless it cannot be normalized
        match estimate_homography(&line, &other) {
            Ok(h) => assert!(h.matrix().iter().flatten().all(|v| v.is_finite())),
            Err(e) => assert!(matches!(e, HomographyError::DegenerateGeometry(_))),
        }
    }

    #[test]
    fn test_homography_ops() -> Result<(), HomographyError> {
        let h = Homography::from_matrix([[2.0, 0.0, 2.0], [0.0, 2.0, -4.0], [0.0, 0.0, 2.0]])?;
        assert_mat33_eq(
            h.matrix(),
            &[[1.0, 0.0, 1.0], [0.0, 1.0, -2.0], [0.0, 0.0, 1.0]],
            1e-12,
        );

        assert_eq!(h.transform_point(&[1.0, 1.0]), Some([2.0, -1.0]));

        let inv = h.inverse()?;
        let roundtrip = h.compose(&inv)?;
        assert_mat33_eq(roundtrip.matrix(), &IDENTITY33, 1e-12);

        let t = Homography::translation(3.0, 0.0);
        let composed = t.compose(&h)?;
        assert_eq!(composed.transform_point(&[0.0, 0.0]), Some([4.0, -2.0]));

        assert!(!h.is_singular());
        let flat = Homography::from_matrix([[1.0, 2.0, 0.0], [2.0, 4.0, 0.0], [0.0, 0.0, 1.0]])?;
        assert!(flat.is_singular());
        assert!(flat.inverse().is_err());

        let at_infinity = Homography::from_matrix([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [1.0, 0.0, 1.0]])?;
        assert_eq!(at_infinity.transform_point(&[-1.0, 3.0]), None);

        assert!(Homography::from_matrix([[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 0.0]]).is_err());

        Ok(())
    }

    #[test]
    fn test_homography_row_major() {
        let h = Homography::translation(5.0, -1.0);
        assert_eq!(
            h.to_row_major_f32(),
            [1.0, 0.0, 5.0, 0.0, 1.0, -1.0, 0.0, 0.0, 1.0]
        );
        assert_eq!(h.to_row_major()[2], 5.0);
    }
}
