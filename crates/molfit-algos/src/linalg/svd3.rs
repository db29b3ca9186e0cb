//! Analytical 3×3 SVD decomposition
//!
//! Computes A = U · diag(S) · Vᵀ via the cyclic Jacobi eigenvalue
//! algorithm on AᵀA (symmetric positive semi-definite).
//!
//! All matrices use column-major layout: `m[col][row]`.

use super::Mat3;

/// Result of 3×3 SVD decomposition: A = U · diag(S) · Vᵀ
#[derive(Debug, Clone)]
pub struct Svd3 {
    /// Left singular vectors (orthogonal, column-major)
    pub u: Mat3,
    /// Singular values (sorted descending, non-negative)
    pub s: [f64; 3],
    /// Right singular vectors transposed (column-major)
    pub vt: Mat3,
}

/// Singular values below this fraction of the largest are treated as
/// zero. The threshold sits well above the eigenvalue noise floor of the
/// Jacobi sweep, so rank-deficient input (three centered fit points are
/// always coplanar) reliably takes the completion path.
const RANK_EPS: f64 = 1e-6;

/// Compute the SVD of a 3×3 matrix
pub fn svd3(a: &Mat3) -> Svd3 {
    // 1. AᵀA, symmetric positive semi-definite
    let ata = mul_ata(a);

    // 2. Jacobi eigendecomposition of AᵀA
    let (eigenvalues, eigvec_cols) = jacobi_eigen(&ata);

    // 3. Sort descending; singular values are the square roots
    let mut order = [0usize, 1, 2];
    if eigenvalues[order[0]] < eigenvalues[order[1]] {
        order.swap(0, 1);
    }
    if eigenvalues[order[0]] < eigenvalues[order[2]] {
        order.swap(0, 2);
    }
    if eigenvalues[order[1]] < eigenvalues[order[2]] {
        order.swap(1, 2);
    }

    let raw = [
        eigenvalues[order[0]].max(0.0).sqrt(),
        eigenvalues[order[1]].max(0.0).sqrt(),
        eigenvalues[order[2]].max(0.0).sqrt(),
    ];
    // Sub-threshold singular values are eigenvalue noise; report them as
    // exact zeros
    let rank_eps = raw[0] * RANK_EPS;
    let s = [
        raw[0],
        if raw[1] > rank_eps { raw[1] } else { 0.0 },
        if raw[2] > rank_eps { raw[2] } else { 0.0 },
    ];
    let mut v_cols = [
        eigvec_cols[order[0]],
        eigvec_cols[order[1]],
        eigvec_cols[order[2]],
    ];

    // Keep V right-handed
    if triple_product(&v_cols[0], &v_cols[1], &v_cols[2]) < 0.0 {
        v_cols[2] = neg(&v_cols[2]);
    }

    // 4. U columns: u_i = A · v_i / s_i, completed for rank-deficient input
    let mut u_cols = [[0.0f64; 3]; 3];
    for i in 0..3 {
        if s[i] > 0.0 {
            let av = mul_vec(a, &v_cols[i]);
            u_cols[i] = scale(&av, 1.0 / s[i]);
        }
    }
    if s[0] > 0.0 && s[1] > 0.0 && s[2] <= 0.0 {
        u_cols[2] = unit_cross(&u_cols[0], &u_cols[1]);
    } else if s[0] > 0.0 && s[1] <= 0.0 {
        u_cols[1] = arbitrary_perpendicular(&u_cols[0]);
        u_cols[2] = unit_cross(&u_cols[0], &u_cols[1]);
    } else if s[0] <= 0.0 {
        u_cols = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    }

    // Keep U right-handed
    if triple_product(&u_cols[0], &u_cols[1], &u_cols[2]) < 0.0 {
        u_cols[2] = neg(&u_cols[2]);
    }

    // 5. Assemble: U columns as-is, Vᵀ from the V columns
    let vt = [
        [v_cols[0][0], v_cols[1][0], v_cols[2][0]],
        [v_cols[0][1], v_cols[1][1], v_cols[2][1]],
        [v_cols[0][2], v_cols[1][2], v_cols[2][2]],
    ];

    Svd3 { u: u_cols, s, vt }
}

// Internal helpers, all on [f64; 3] column vectors

/// AᵀA for column-major A: (AᵀA)[col][row] = dot(col_row, col_col)
fn mul_ata(a: &Mat3) -> Mat3 {
    let mut result = [[0.0f64; 3]; 3];
    for col in 0..3 {
        for row in 0..3 {
            result[col][row] =
                a[row][0] * a[col][0] + a[row][1] * a[col][1] + a[row][2] * a[col][2];
        }
    }
    result
}

fn mul_vec(a: &Mat3, v: &[f64; 3]) -> [f64; 3] {
    [
        a[0][0] * v[0] + a[1][0] * v[1] + a[2][0] * v[2],
        a[0][1] * v[0] + a[1][1] * v[1] + a[2][1] * v[2],
        a[0][2] * v[0] + a[1][2] * v[1] + a[2][2] * v[2],
    ]
}

fn cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn unit_cross(a: &[f64; 3], b: &[f64; 3]) -> [f64; 3] {
    normalized(&cross(a, b))
}

fn dot(a: &[f64; 3], b: &[f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn triple_product(a: &[f64; 3], b: &[f64; 3], c: &[f64; 3]) -> f64 {
    dot(a, &cross(b, c))
}

fn scale(v: &[f64; 3], s: f64) -> [f64; 3] {
    [v[0] * s, v[1] * s, v[2] * s]
}

fn neg(v: &[f64; 3]) -> [f64; 3] {
    [-v[0], -v[1], -v[2]]
}

fn normalized(v: &[f64; 3]) -> [f64; 3] {
    let len = dot(v, v).sqrt();
    if len > 1e-15 {
        scale(v, 1.0 / len)
    } else {
        *v
    }
}

fn arbitrary_perpendicular(v: &[f64; 3]) -> [f64; 3] {
    let candidate = if v[0].abs() < v[1].abs() && v[0].abs() < v[2].abs() {
        [1.0, 0.0, 0.0]
    } else if v[1].abs() < v[2].abs() {
        [0.0, 1.0, 0.0]
    } else {
        [0.0, 0.0, 1.0]
    };
    normalized(&cross(v, &candidate))
}

/// Cyclic Jacobi for 3×3 symmetric matrices.
///
/// Returns (eigenvalues, eigenvector columns).
fn jacobi_eigen(m: &Mat3) -> ([f64; 3], [[f64; 3]; 3]) {
    // Row-major working copy for the rotations
    let mut a = [
        [m[0][0], m[1][0], m[2][0]],
        [m[0][1], m[1][1], m[2][1]],
        [m[0][2], m[1][2], m[2][2]],
    ];

    // Eigenvector accumulator, starts as the identity
    let mut v = [[1.0f64, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];

    for _ in 0..50 {
        let off = a[0][1] * a[0][1] + a[0][2] * a[0][2] + a[1][2] * a[1][2];
        if off < 1e-30 {
            break;
        }
        for &(p, q) in &[(0usize, 1usize), (0, 2), (1, 2)] {
            if a[p][q].abs() < 1e-15 {
                continue;
            }
            jacobi_rotate(&mut a, &mut v, p, q);
        }
    }

    let eigenvalues = [a[0][0], a[1][1], a[2][2]];
    // v is row-major; column j is the j-th eigenvector
    let eigvec_cols = [
        [v[0][0], v[1][0], v[2][0]],
        [v[0][1], v[1][1], v[2][1]],
        [v[0][2], v[1][2], v[2][2]],
    ];
    (eigenvalues, eigvec_cols)
}

/// One Jacobi rotation eliminating a[p][q]
fn jacobi_rotate(a: &mut [[f64; 3]; 3], v: &mut [[f64; 3]; 3], p: usize, q: usize) {
    let app = a[p][p];
    let aqq = a[q][q];
    let apq = a[p][q];

    let (c, s) = if (app - aqq).abs() < 1e-15 {
        let inv_sqrt2 = std::f64::consts::FRAC_1_SQRT_2;
        (inv_sqrt2, if apq > 0.0 { inv_sqrt2 } else { -inv_sqrt2 })
    } else {
        let tau = (aqq - app) / (2.0 * apq);
        let t = if tau >= 0.0 {
            1.0 / (tau + (1.0 + tau * tau).sqrt())
        } else {
            -1.0 / (-tau + (1.0 + tau * tau).sqrt())
        };
        let c = 1.0 / (1.0 + t * t).sqrt();
        (c, t * c)
    };

    // A' = GᵀAG with G the Givens rotation in the (p, q) plane
    a[p][p] = c * c * app - 2.0 * s * c * apq + s * s * aqq;
    a[q][q] = s * s * app + 2.0 * s * c * apq + c * c * aqq;
    a[p][q] = 0.0;
    a[q][p] = 0.0;

    let r = 3 - p - q;
    let arp = a[r][p];
    let arq = a[r][q];
    a[r][p] = c * arp - s * arq;
    a[p][r] = a[r][p];
    a[r][q] = s * arp + c * arq;
    a[q][r] = a[r][q];

    // V' = V · G
    for i in 0..3 {
        let vip = v[i][p];
        let viq = v[i][q];
        v[i][p] = c * vip - s * viq;
        v[i][q] = s * vip + c * viq;
    }
}
