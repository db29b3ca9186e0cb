//! Geometry primitives
//!
//! Centroids, all-pairs distance matrices and rotation construction /
//! decomposition. These are the leaves every alignment strategy builds on.

use lin_alg::f64::Vec3;

use crate::linalg::{Mat3, IDENTITY};
use crate::AlignError;

/// Two unit vectors closer than this to parallel (or antiparallel) are
/// treated as exactly parallel (or antiparallel)
const AXIS_EPS: f64 = 1e-12;

/// Arithmetic mean of a point set. The empty set maps to the origin.
pub fn centroid(points: &[Vec3]) -> Vec3 {
    if points.is_empty() {
        return Vec3::new(0.0, 0.0, 0.0);
    }
    let sum = points
        .iter()
        .fold(Vec3::new(0.0, 0.0, 0.0), |acc, &p| acc + p);
    sum * (1.0 / points.len() as f64)
}

/// All-pairs Euclidean distances between two point sets
///
/// Shape is |A| rows × |B| columns: `get(i, j)` is the distance from
/// `a[i]` to `b[j]`.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    rows: usize,
    cols: usize,
    data: Vec<f64>,
}

impl DistanceMatrix {
    /// Compute the distance matrix between `a` (rows) and `b` (columns)
    pub fn between(a: &[Vec3], b: &[Vec3]) -> Self {
        let mut data = Vec::with_capacity(a.len() * b.len());
        for &p in a {
            for &q in b {
                data.push((p - q).magnitude());
            }
        }
        DistanceMatrix {
            rows: a.len(),
            cols: b.len(),
            data,
        }
    }

    /// Number of rows (points of A)
    #[inline]
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of columns (points of B)
    #[inline]
    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Distance from `a[row]` to `b[col]`
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.cols + col]
    }

    /// One row: the distances from `a[row]` to every point of B
    #[inline]
    pub fn row(&self, row: usize) -> &[f64] {
        &self.data[row * self.cols..(row + 1) * self.cols]
    }

    /// Minimum of a column: the nearest point of A to `b[col]`
    pub fn column_min(&self, col: usize) -> f64 {
        (0..self.rows)
            .map(|row| self.get(row, col))
            .fold(f64::INFINITY, f64::min)
    }
}

/// The rotation mapping `from` onto `to`
///
/// Axis = normalized cross product, angle = acos of the normalized dot
/// product. Fails with [`AlignError::UnsupportedRotation`] when the angle
/// is 180° or either vector has zero length, since the axis is undefined
/// in both cases. Exactly parallel vectors yield the identity.
pub fn rotation_between(from: Vec3, to: Vec3) -> Result<Mat3, AlignError> {
    let from_mag = from.magnitude();
    let to_mag = to.magnitude();
    if from_mag < AXIS_EPS || to_mag < AXIS_EPS {
        return Err(AlignError::UnsupportedRotation);
    }
    let f = from * (1.0 / from_mag);
    let t = to * (1.0 / to_mag);

    let cos = f.dot(t).clamp(-1.0, 1.0);
    if cos >= 1.0 - AXIS_EPS {
        return Ok(IDENTITY);
    }
    if cos <= -1.0 + AXIS_EPS {
        return Err(AlignError::UnsupportedRotation);
    }

    let axis = f.cross(t).to_normalized();
    Ok(rotation_about_axis(axis, cos.acos()))
}

/// Rodrigues rotation matrix about a unit axis
pub fn rotation_about_axis(axis: Vec3, angle: f64) -> Mat3 {
    let (s, c) = angle.sin_cos();
    let t = 1.0 - c;
    let (x, y, z) = (axis.x, axis.y, axis.z);
    // Column-major: m[col][row]
    [
        [t * x * x + c, t * x * y + s * z, t * x * z - s * y],
        [t * x * y - s * z, t * y * y + c, t * y * z + s * x],
        [t * x * z + s * y, t * y * z - s * x, t * z * z + c],
    ]
}

/// Recover (angle, axis) from a rotation matrix. Diagnostics only.
///
/// The angle is in [0, π]. At angle 0 the axis is arbitrary and the x
/// axis is returned; near π the axis is recovered from the dominant
/// diagonal entry.
pub fn angle_axis(r: &Mat3) -> (f64, Vec3) {
    let trace = r[0][0] + r[1][1] + r[2][2];
    let angle = ((trace - 1.0) * 0.5).clamp(-1.0, 1.0).acos();

    if angle < 1e-9 {
        return (0.0, Vec3::new(1.0, 0.0, 0.0));
    }
    if std::f64::consts::PI - angle < 1e-6 {
        // sin(angle) ~ 0; read the axis off R = 2aaᵀ - I
        let xx = ((r[0][0] + 1.0) * 0.5).max(0.0).sqrt();
        let yy = ((r[1][1] + 1.0) * 0.5).max(0.0).sqrt();
        let zz = ((r[2][2] + 1.0) * 0.5).max(0.0).sqrt();
        // Fix signs against the dominant component
        let axis = if xx >= yy && xx >= zz {
            Vec3::new(xx, sign_like(r[0][1] + r[1][0]) * yy, sign_like(r[0][2] + r[2][0]) * zz)
        } else if yy >= zz {
            Vec3::new(sign_like(r[0][1] + r[1][0]) * xx, yy, sign_like(r[1][2] + r[2][1]) * zz)
        } else {
            Vec3::new(sign_like(r[0][2] + r[2][0]) * xx, sign_like(r[1][2] + r[2][1]) * yy, zz)
        };
        return (angle, axis.to_normalized());
    }

    let inv = 1.0 / (2.0 * angle.sin());
    let axis = Vec3::new(
        (r[1][2] - r[2][1]) * inv,
        (r[2][0] - r[0][2]) * inv,
        (r[0][1] - r[1][0]) * inv,
    );
    (angle, axis)
}

fn sign_like(x: f64) -> f64 {
    if x < 0.0 {
        -1.0
    } else {
        1.0
    }
}
