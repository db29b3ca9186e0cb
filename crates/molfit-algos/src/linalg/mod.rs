//! Linear algebra utilities
//!
//! Small hand-rolled 3×3 matrix operations shared by the geometry
//! primitives and the Kabsch fit, plus [`svd3`], the analytical 3×3 SVD.
//!
//! All matrices use column-major layout: `m[col][row]`.

pub mod svd3;

pub use svd3::{svd3, Svd3};

use lin_alg::f64::Vec3;

/// Column-major 3×3 matrix: `m[col][row]`
pub type Mat3 = [[f64; 3]; 3];

/// The identity rotation
pub const IDENTITY: Mat3 = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

/// Matrix product C = A · B
pub fn mat_mul(a: &Mat3, b: &Mat3) -> Mat3 {
    let mut c = [[0.0f64; 3]; 3];
    for col in 0..3 {
        for row in 0..3 {
            for k in 0..3 {
                c[col][row] += a[k][row] * b[col][k];
            }
        }
    }
    c
}

/// Matrix transpose
pub fn transpose(m: &Mat3) -> Mat3 {
    [
        [m[0][0], m[1][0], m[2][0]],
        [m[0][1], m[1][1], m[2][1]],
        [m[0][2], m[1][2], m[2][2]],
    ]
}

/// Matrix determinant
pub fn determinant(m: &Mat3) -> f64 {
    m[0][0] * (m[1][1] * m[2][2] - m[1][2] * m[2][1])
        - m[1][0] * (m[0][1] * m[2][2] - m[0][2] * m[2][1])
        + m[2][0] * (m[0][1] * m[1][2] - m[0][2] * m[1][1])
}

/// Apply a matrix to a vector: A · v
pub fn rotate_vec(m: &Mat3, v: Vec3) -> Vec3 {
    Vec3::new(
        m[0][0] * v.x + m[1][0] * v.y + m[2][0] * v.z,
        m[0][1] * v.x + m[1][1] * v.y + m[2][1] * v.z,
        m[0][2] * v.x + m[1][2] * v.y + m[2][2] * v.z,
    )
}
