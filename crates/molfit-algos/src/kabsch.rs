//! Kabsch algorithm for optimal rigid-body superposition
//!
//! Given two ordered, equal-length point lists, finds the rotation that
//! minimizes the sum of squared residuals between the rotated first list
//! and the second. Pure and stateless; every alignment strategy is built
//! on this one primitive.

use lin_alg::f64::Vec3;

use crate::geometry::centroid;
use crate::linalg::{determinant, rotate_vec, svd3, Mat3};
use crate::AlignError;

/// Result of a Kabsch fit: the optimal rotation and both centroids
#[derive(Debug, Clone)]
pub struct KabschFit {
    /// Rotation mapping centered source points onto centered target points
    pub rotation: Mat3,
    /// Centroid of the source anchor list
    pub source_centroid: Vec3,
    /// Centroid of the target anchor list
    pub target_centroid: Vec3,
    /// Number of anchor pairs used
    pub n_points: usize,
}

impl KabschFit {
    /// Transform points through `R · (p − source_centroid) + target_centroid`.
    ///
    /// Applying this to the *entire* structure the anchors were drawn from
    /// (not just the anchors themselves) yields the full-structure
    /// candidate transform.
    pub fn apply(&self, points: &[Vec3]) -> Vec<Vec3> {
        points
            .iter()
            .map(|&p| rotate_vec(&self.rotation, p - self.source_centroid) + self.target_centroid)
            .collect()
    }
}

/// Compute the optimal superposition of `source` onto `target`.
///
/// Both slices must have the same length (≥ 3) and should not be
/// collinear. Reflections are corrected to a proper rotation.
pub fn kabsch_fit(source: &[Vec3], target: &[Vec3]) -> Result<KabschFit, AlignError> {
    let n = source.len();
    if n != target.len() {
        return Err(AlignError::ShapeMismatch {
            what: "anchor lists",
            left: n,
            right: target.len(),
        });
    }
    if n < 3 {
        return Err(AlignError::TooFewPoints { needed: 3, got: n });
    }

    let source_centroid = centroid(source);
    let target_centroid = centroid(target);

    // Cross-covariance H of the centered lists, column-major:
    // h[col][row] = Σ_i src_i[row] · tgt_i[col]
    let mut h: Mat3 = [[0.0; 3]; 3];
    for (p, q) in source.iter().zip(target.iter()) {
        let p = *p - source_centroid;
        let q = *q - target_centroid;
        let pa = [p.x, p.y, p.z];
        let qa = [q.x, q.y, q.z];
        for col in 0..3 {
            for row in 0..3 {
                h[col][row] += pa[row] * qa[col];
            }
        }
    }

    let svd = svd3(&h);

    // R = V · diag(1, 1, d) · Uᵀ with d flipping an improper solution
    let d = if determinant(&svd.u) * determinant(&svd.vt) < 0.0 {
        -1.0
    } else {
        1.0
    };
    let mut rotation: Mat3 = [[0.0; 3]; 3];
    for i in 0..3 {
        for j in 0..3 {
            let mut sum = 0.0;
            for k in 0..3 {
                let diag = if k == 2 { d } else { 1.0 };
                sum += svd.vt[i][k] * diag * svd.u[k][j];
            }
            rotation[j][i] = sum;
        }
    }

    Ok(KabschFit {
        rotation,
        source_centroid,
        target_centroid,
        n_points: n,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::{angle_axis, rotation_about_axis};

    fn points(raw: &[[f64; 3]]) -> Vec<Vec3> {
        raw.iter().map(|p| Vec3::new(p[0], p[1], p[2])).collect()
    }

    fn max_residual(a: &[Vec3], b: &[Vec3]) -> f64 {
        a.iter()
            .zip(b.iter())
            .map(|(&p, &q)| (p - q).magnitude())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_identity_case() {
        let pts = points(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ]);
        let fit = kabsch_fit(&pts, &pts).unwrap();
        assert_eq!(fit.n_points, 4);
        let moved = fit.apply(&pts);
        assert!(max_residual(&moved, &pts) < 1e-9);
    }

    #[test]
    fn test_pure_translation() {
        let source = points(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
        ]);
        let shift = Vec3::new(5.0, 3.0, 1.0);
        let target: Vec<Vec3> = source.iter().map(|&p| p + shift).collect();
        let fit = kabsch_fit(&source, &target).unwrap();
        let (angle, _) = angle_axis(&fit.rotation);
        assert!(angle.abs() < 1e-9, "rotation should be identity, angle {angle}");
        assert!((fit.target_centroid - fit.source_centroid - shift).magnitude() < 1e-9);
        assert!(max_residual(&fit.apply(&source), &target) < 1e-9);
    }

    #[test]
    fn test_known_rotation_recovered() {
        // Three non-collinear points under a known rotation + translation
        let source = points(&[[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]]);
        let axis = Vec3::new(0.0, 0.0, 1.0);
        let r = rotation_about_axis(axis, std::f64::consts::FRAC_PI_2);
        let shift = Vec3::new(2.0, -1.0, 0.5);
        let target: Vec<Vec3> = source.iter().map(|&p| rotate_vec(&r, p) + shift).collect();

        let fit = kabsch_fit(&source, &target).unwrap();
        let (angle, recovered_axis) = angle_axis(&fit.rotation);
        assert!((angle - std::f64::consts::FRAC_PI_2).abs() < 1e-9);
        assert!((recovered_axis - axis).magnitude() < 1e-9);
        assert!(max_residual(&fit.apply(&source), &target) < 1e-9);
    }

    #[test]
    fn test_full_structure_transform() {
        // Fit on three anchors, apply to a larger structure
        let structure = points(&[
            [0.0, 0.0, 0.0],
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
        ]);
        let r = rotation_about_axis(Vec3::new(0.0, 1.0, 0.0), 1.0);
        let shift = Vec3::new(-3.0, 0.0, 7.0);
        let moved: Vec<Vec3> = structure.iter().map(|&p| rotate_vec(&r, p) + shift).collect();

        let fit = kabsch_fit(&structure[..3], &moved[..3]).unwrap();
        assert!(max_residual(&fit.apply(&structure), &moved) < 1e-9);
    }

    #[test]
    fn test_reflection_corrected() {
        let source = points(&[
            [1.0, 0.0, 0.0],
            [0.0, 1.0, 0.0],
            [0.0, 0.0, 1.0],
            [1.0, 1.0, 1.0],
        ]);
        // Mirror through the xy plane
        let target: Vec<Vec3> = source.iter().map(|&p| Vec3::new(p.x, p.y, -p.z)).collect();
        let fit = kabsch_fit(&source, &target).unwrap();
        assert!(
            (determinant(&fit.rotation) - 1.0).abs() < 1e-9,
            "det(R) should be +1, got {}",
            determinant(&fit.rotation)
        );
    }

    #[test]
    fn test_length_mismatch() {
        let a = points(&[[0.0; 3], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        let b = points(&[[0.0; 3], [1.0, 0.0, 0.0]]);
        assert!(matches!(
            kabsch_fit(&a, &b),
            Err(AlignError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_too_few_points() {
        let a = points(&[[0.0; 3], [1.0, 0.0, 0.0]]);
        assert!(matches!(
            kabsch_fit(&a, &a),
            Err(AlignError::TooFewPoints { needed: 3, got: 2 })
        ));
    }

    #[test]
    fn test_rotation_is_orthogonal() {
        let source = points(&[[1.0, 2.0, 0.5], [-1.0, 0.3, 2.0], [0.7, -2.0, 1.0]]);
        let r = rotation_about_axis(Vec3::new(1.0, 1.0, 0.0).to_normalized(), 0.8);
        let target: Vec<Vec3> = source.iter().map(|&p| rotate_vec(&r, p)).collect();
        let fit = kabsch_fit(&source, &target).unwrap();
        let rt_r = crate::linalg::mat_mul(&crate::linalg::transpose(&fit.rotation), &fit.rotation);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((rt_r[i][j] - expected).abs() < 1e-9);
            }
        }
    }
}
