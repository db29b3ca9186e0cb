//! Nearest-neighbor deviation scores
//!
//! Both scores aggregate, for each point of B (the matrix columns), the
//! distance to its nearest neighbor in A (the matrix rows). They are
//! asymmetric by construction: they only equal a matched-pair RMSD when
//! the nearest-neighbor assignment is a bijection, which the orchestrator
//! verifies separately.

use lin_alg::f64::Vec3;

use crate::geometry::DistanceMatrix;
use crate::AlignError;

/// Two points closer than this are "in contact"
pub const CONTACT_THRESHOLD: f64 = 0.2;

/// Root of the mean squared nearest-neighbor distance: for each column,
/// the minimum over the rows, squared, averaged over columns
pub fn rmsd_from_matrix(d: &DistanceMatrix) -> f64 {
    if d.cols() == 0 {
        return 0.0;
    }
    let sum: f64 = (0..d.cols())
        .map(|col| {
            let min = d.column_min(col);
            min * min
        })
        .sum();
    (sum / d.cols() as f64).sqrt()
}

/// Maximum nearest-neighbor distance: the largest column minimum
pub fn ad_from_matrix(d: &DistanceMatrix) -> f64 {
    (0..d.cols())
        .map(|col| d.column_min(col))
        .fold(0.0, f64::max)
}

/// Score `b` against `a`: nearest-neighbor deviation of each point of `b`
/// into `a`, aggregated as RMSD or as the maximum absolute deviation
pub fn deviation(a: &[Vec3], b: &[Vec3], use_absolute_deviation: bool) -> f64 {
    let d = DistanceMatrix::between(a, b);
    if use_absolute_deviation {
        ad_from_matrix(&d)
    } else {
        rmsd_from_matrix(&d)
    }
}

/// Count the points of A in contact with a point of B.
///
/// Any row with two or more columns within [`CONTACT_THRESHOLD`] is an
/// unresolved ambiguous contact: the corresponding atom identities cannot
/// be told apart, and the result is unusable.
pub fn count_contact_points(d: &DistanceMatrix) -> Result<usize, AlignError> {
    let mut contacts = 0;
    for row in 0..d.rows() {
        let near = d.row(row).iter().filter(|&&dist| dist <= CONTACT_THRESHOLD).count();
        if near >= 2 {
            return Err(AlignError::ContactConflict { row, count: near });
        }
        contacts += near;
    }
    Ok(contacts)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn points(raw: &[[f64; 3]]) -> Vec<Vec3> {
        raw.iter().map(|p| Vec3::new(p[0], p[1], p[2])).collect()
    }

    #[test]
    fn test_rmsd_identical_sets() {
        let a = points(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]]);
        assert!(deviation(&a, &a, false) < 1e-12);
        assert!(deviation(&a, &a, true) < 1e-12);
    }

    #[test]
    fn test_rmsd_known_value() {
        let a = points(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        let b = points(&[[0.0, 0.0, 0.0], [1.0, 1.0, 0.0]]);
        // Nearest distances from b into a: 0 and 1
        let expected = (0.5f64).sqrt();
        assert!((deviation(&a, &b, false) - expected).abs() < 1e-12);
        assert!((deviation(&a, &b, true) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_scores_are_asymmetric() {
        // Two a-points cluster near one b-point; the other b-point is far
        // from everything. Swapping the call direction changes which side
        // the nearest-neighbor minima are taken over.
        let a = points(&[[0.0, 0.0, 0.0], [0.1, 0.0, 0.0]]);
        let b = points(&[[0.0, 0.0, 0.0], [5.0, 0.0, 0.0]]);
        let forward = deviation(&a, &b, false);
        let backward = deviation(&b, &a, false);
        // forward: b's nearest into a = [0, 4.9]
        assert!((forward - (4.9f64.powi(2) / 2.0).sqrt()).abs() < 1e-9);
        // backward: a's nearest into b = [0, 0.1]
        assert!((backward - (0.1f64.powi(2) / 2.0).sqrt()).abs() < 1e-9);
        assert!(forward > backward);
    }

    #[test]
    fn test_contact_count() {
        let a = points(&[[0.0, 0.0, 0.0], [1.0, 0.0, 0.0]]);
        let b = points(&[[0.05, 0.0, 0.0], [2.0, 0.0, 0.0]]);
        let d = DistanceMatrix::between(&a, &b);
        assert_eq!(count_contact_points(&d).unwrap(), 1);
    }

    #[test]
    fn test_contact_conflict() {
        // Both b-points within the threshold of a[0]
        let a = points(&[[0.0, 0.0, 0.0], [5.0, 0.0, 0.0]]);
        let b = points(&[[0.05, 0.0, 0.0], [-0.05, 0.0, 0.0]]);
        let d = DistanceMatrix::between(&a, &b);
        let err = count_contact_points(&d).unwrap_err();
        assert!(matches!(err, AlignError::ContactConflict { row: 0, count: 2 }));
    }
}
