// ── 3x3 matrix helpers ──
//
// Row-major, no allocation, no failure cases. Degeneracy is judged by the
// callers that know what the matrices stand for.

/// A 3x3 matrix, row-major.
pub type Mat3 = [[f64; 3]; 3];

/// A homogeneous 2D point.
pub type Vec3 = [f64; 3];

/// A 4x4 matrix in column-major order, as consumed by CSS `matrix3d`.
pub type Mat4 = [f64; 16];

/// Adjugate (transpose of the cofactor matrix).
///
/// Proportional to the inverse, without dividing by the determinant.
pub fn adjugate(m: &Mat3) -> Mat3 {
    [
        [
            m[1][1] * m[2][2] - m[1][2] * m[2][1],
            m[0][2] * m[2][1] - m[0][1] * m[2][2],
            m[0][1] * m[1][2] - m[0][2] * m[1][1],
        ],
        [
            m[1][2] * m[2][0] - m[1][0] * m[2][2],
            m[0][0] * m[2][2] - m[0][2] * m[2][0],
            m[0][2] * m[1][0] - m[0][0] * m[1][2],
        ],
        [
            m[1][0] * m[2][1] - m[1][1] * m[2][0],
            m[0][1] * m[2][0] - m[0][0] * m[2][1],
            m[0][0] * m[1][1] - m[0][1] * m[1][0],
        ],
    ]
}

pub fn multiply_matrix(a: &Mat3, b: &Mat3) -> Mat3 {
    a.map(|row| std::array::from_fn(|j| row[0] * b[0][j] + row[1] * b[1][j] + row[2] * b[2][j]))
}

pub fn multiply_vector(m: &Mat3, v: &Vec3) -> Vec3 {
    [
        m[0][0] * v[0] + m[0][1] * v[1] + m[0][2] * v[2],
        m[1][0] * v[0] + m[1][1] * v[1] + m[1][2] * v[2],
        m[2][0] * v[0] + m[2][1] * v[1] + m[2][2] * v[2],
    ]
}

pub fn scale_matrix(s: f64, m: &Mat3) -> Mat3 {
    m.map(|row| row.map(|x| s * x))
}

pub fn diagonal(v: &Vec3) -> Mat3 {
    [[v[0], 0.0, 0.0], [0.0, v[1], 0.0], [0.0, 0.0, v[2]]]
}
