use crate::error::{Degeneracy, DrapeError};

use super::matrix::{adjugate, diagonal, multiply_matrix, multiply_vector, scale_matrix, Mat3, Mat4};

/// Triangles formed by choosing three of the four quad corners.
const CORNER_TRIPLES: [[usize; 3]; 4] = [[0, 1, 2], [0, 1, 3], [0, 2, 3], [1, 2, 3]];

/// Matrix mapping the homogeneous basis vectors onto the first three points
/// and their sum onto (a multiple of) the fourth.
pub fn basis_to_points(pts: &[[f64; 2]; 4]) -> Mat3 {
    let [[x1, y1], [x2, y2], [x3, y3], [x4, y4]] = *pts;
    let m = [[x1, x2, x3], [y1, y2, y3], [1.0, 1.0, 1.0]];
    let v = multiply_vector(&adjugate(&m), &[x4, y4, 1.0]);
    multiply_matrix(&m, &diagonal(&v))
}

/// The projective transform carrying `src[i]` onto `dst[i]` for all four
/// corners, normalized so that entry `[2][2]` is 1.
///
/// Both quads must list their corners in the same order. Mismatched orders
/// are not detected and produce a valid but self-intersecting warp.
pub fn general_projection(
    src: &[[f64; 2]; 4],
    dst: &[[f64; 2]; 4],
) -> Result<Homography, DrapeError> {
    let s = basis_to_points(src);
    let d = basis_to_points(dst);
    let m = multiply_matrix(&d, &adjugate(&s));

    let divisor = m[2][2];
    if m.iter().flatten().any(|x| !x.is_finite()) {
        return Err(DrapeError::DegenerateGeometry(Degeneracy::NonFinite));
    }
    let largest = m.iter().flatten().fold(0.0f64, |acc, x| acc.max(x.abs()));
    if divisor.abs() <= f64::EPSILON * largest {
        return Err(DrapeError::DegenerateGeometry(Degeneracy::VanishingDivisor));
    }

    let mut data = scale_matrix(1.0 / divisor, &m);
    // x * (1 / x) can land one ulp off
    data[2][2] = 1.0;
    if data.iter().flatten().any(|x| !x.is_finite()) {
        return Err(DrapeError::DegenerateGeometry(Degeneracy::NonFinite));
    }
    Ok(Homography { data })
}

/// Whether three of the four points are (nearly) collinear.
///
/// Each corner triangle's area is compared against `tolerance` times the
/// squared extent of the quad, so the test does not depend on units.
pub fn is_degenerate_quad(pts: &[[f64; 2]; 4], tolerance: f64) -> bool {
    if pts.iter().flatten().any(|v| !v.is_finite()) {
        return true;
    }
    let (mut min, mut max) = ([f64::INFINITY; 2], [f64::NEG_INFINITY; 2]);
    for p in pts {
        for ((lo, hi), v) in min.iter_mut().zip(max.iter_mut()).zip(p) {
            *lo = lo.min(*v);
            *hi = hi.max(*v);
        }
    }
    let extent = (max[0] - min[0]).max(max[1] - min[1]);
    if !(extent > 0.0 && extent.is_finite()) {
        return true;
    }

    let limit = tolerance * extent * extent;
    CORNER_TRIPLES.iter().any(|&[a, b, c]| {
        let (ax, ay) = (pts[b][0] - pts[a][0], pts[b][1] - pts[a][1]);
        let (bx, by) = (pts[c][0] - pts[a][0], pts[c][1] - pts[a][1]);
        (ax * by - ay * bx).abs() <= limit
    })
}

/// Embed a 2D projective matrix into the 4x4 form used by 3D-capable
/// renderers, with identity on the z axis.
pub fn to_render_matrix(m: &Mat3, supports_3d: bool) -> Result<Mat4, DrapeError> {
    if !supports_3d {
        return Err(DrapeError::UnsupportedRendering);
    }
    #[rustfmt::skip]
    let r = [
        m[0][0], m[1][0], 0.0, m[2][0],
        m[0][1], m[1][1], 0.0, m[2][1],
        0.0, 0.0, 1.0, 0.0,
        m[0][2], m[1][2], 0.0, m[2][2],
    ];
    Ok(r)
}

/// Recover the 3x3 matrix from [`to_render_matrix`] output.
pub fn from_render_matrix(r: &Mat4) -> Mat3 {
    [
        [r[0], r[4], r[12]],
        [r[1], r[5], r[13]],
        [r[3], r[7], r[15]],
    ]
}

/// A 3x3 homography matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Homography {
    pub data: Mat3,
}

impl Homography {
    /// Project a point from source space to destination space.
    pub fn project(&self, x: f64, y: f64) -> (f64, f64) {
        let [xx, yy, zz] = multiply_vector(&self.data, &[x, y, 1.0]);
        (xx / zz, yy / zz)
    }

    /// Whether the transform has no perspective component.
    pub fn is_affine(&self, tolerance: f64) -> bool {
        self.data[2][0].abs() <= tolerance && self.data[2][1].abs() <= tolerance
    }

    pub fn render_matrix(&self, supports_3d: bool) -> Result<Mat4, DrapeError> {
        to_render_matrix(&self.data, supports_3d)
    }
}

/// Format a render matrix as a CSS `matrix3d(...)` function.
pub fn css_matrix3d(r: &Mat4) -> String {
    // adding 0.0 turns -0 into 0
    let parts: Vec<String> = r.iter().map(|x| (x + 0.0).to_string()).collect();
    format!("matrix3d({})", parts.join(","))
}

#[cfg(test)]
mod tests {
    use super::*;

    const UNIT: [[f64; 2]; 4] = [[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];

    struct Rng(u64);

    impl Rng {
        fn next_f64(&mut self) -> f64 {
            self.0 = self
                .0
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            (self.0 >> 11) as f64 / (1u64 << 53) as f64
        }

        fn range(&mut self, lo: f64, hi: f64) -> f64 {
            lo + (hi - lo) * self.next_f64()
        }
    }

    /// A convex quad in Z order: a jittered, scaled, shifted square.
    fn random_quad(rng: &mut Rng) -> [[f64; 2]; 4] {
        let side = rng.range(10.0, 2000.0);
        let (ox, oy) = (rng.range(-5000.0, 5000.0), rng.range(-5000.0, 5000.0));
        let mut quad = [[0.0; 2]; 4];
        for (i, [ux, uy]) in UNIT.iter().enumerate() {
            quad[i] = [
                ox + side * (ux + rng.range(-0.2, 0.2)),
                oy + side * (uy + rng.range(-0.2, 0.2)),
            ];
        }
        quad
    }

    fn assert_maps(h: &Homography, src: &[[f64; 2]; 4], dst: &[[f64; 2]; 4]) {
        for (i, ([sx, sy], [dx, dy])) in src.iter().zip(dst).enumerate() {
            let (x, y) = h.project(*sx, *sy);
            let tol = 1e-6 * (1.0 + dx.abs().max(dy.abs()));
            assert!(
                (x - dx).abs() < tol && (y - dy).abs() < tol,
                "corner {i}: expected ({dx}, {dy}), got ({x}, {y})",
            );
        }
    }

    #[test]
    fn identity_projection() {
        let h = general_projection(&UNIT, &UNIT).unwrap();
        let (px, py) = h.project(0.5, 0.5);
        assert!((px - 0.5).abs() < 1e-12);
        assert!((py - 0.5).abs() < 1e-12);
    }

    #[test]
    fn axis_aligned_square_is_affine() {
        let dst = [[10.0, 10.0], [20.0, 10.0], [10.0, 20.0], [20.0, 20.0]];
        let h = general_projection(&UNIT, &dst).unwrap();
        assert!(h.is_affine(1e-12), "projective terms: {:?}", h.data[2]);
        assert!((h.data[0][0] - 10.0).abs() < 1e-9);
        assert!((h.data[1][1] - 10.0).abs() < 1e-9);
        assert!((h.data[0][2] - 10.0).abs() < 1e-9);
        assert!((h.data[1][2] - 10.0).abs() < 1e-9);
        assert_eq!(h.data[2][2], 1.0);
    }

    #[test]
    fn perspective_quad_corners_match() {
        let dst = [[10.0, 20.0], [90.0, 15.0], [5.0, 90.0], [95.0, 85.0]];
        let h = general_projection(&UNIT, &dst).unwrap();
        assert_maps(&h, &UNIT, &dst);
        assert!(!h.is_affine(1e-9));
    }

    #[test]
    fn image_rectangle_to_quad() {
        let src = [[0.0, 0.0], [500.0, 0.0], [0.0, 375.0], [500.0, 375.0]];
        let dst = [[0.0, 0.0], [420.0, 30.0], [-20.0, 310.0], [450.0, 290.0]];
        let h = general_projection(&src, &dst).unwrap();
        assert_maps(&h, &src, &dst);
    }

    #[test]
    fn random_quads_round_trip() {
        let mut rng = Rng(7);
        for _ in 0..500 {
            let dst = random_quad(&mut rng);
            let h = general_projection(&UNIT, &dst).unwrap();
            assert_maps(&h, &UNIT, &dst);
        }
    }

    #[test]
    fn random_quads_stay_finite() {
        let mut rng = Rng(42);
        for _ in 0..500 {
            let src = random_quad(&mut rng);
            let dst = random_quad(&mut rng);
            assert!(!is_degenerate_quad(&dst, 1e-9));
            let h = general_projection(&src, &dst).unwrap();
            assert!(h.data.iter().flatten().all(|x| x.is_finite()), "{:?}", h.data);
            assert_eq!(h.data[2][2], 1.0);
        }
    }

    #[test]
    fn coincident_corners_are_rejected() {
        let dst = [[5.0, 5.0]; 4];
        assert_eq!(
            general_projection(&UNIT, &dst),
            Err(DrapeError::DegenerateGeometry(Degeneracy::VanishingDivisor))
        );
        assert!(is_degenerate_quad(&dst, 1e-9));
    }

    #[test]
    fn non_finite_input_is_rejected() {
        let dst = [[0.0, 0.0], [f64::NAN, 0.0], [0.0, 1.0], [1.0, 1.0]];
        assert_eq!(
            general_projection(&UNIT, &dst),
            Err(DrapeError::DegenerateGeometry(Degeneracy::NonFinite))
        );
        assert!(is_degenerate_quad(&dst, 1e-9));
    }

    #[test]
    fn collinear_triples_are_degenerate() {
        // corners 0, 1, 3 on one line
        let dst = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [20.0, 0.0]];
        assert!(is_degenerate_quad(&dst, 1e-9));
        // every triple of a proper quad spans area
        let ok = [[0.0, 0.0], [10.0, 0.0], [0.0, 10.0], [10.0, 10.0]];
        assert!(!is_degenerate_quad(&ok, 1e-9));
    }

    #[test]
    fn render_matrix_layout() {
        let m = [[1.0, 2.0, 3.0], [4.0, 5.0, 6.0], [7.0, 8.0, 9.0]];
        let r = to_render_matrix(&m, true).unwrap();
        assert_eq!(
            r,
            [1.0, 4.0, 0.0, 7.0, 2.0, 5.0, 0.0, 8.0, 0.0, 0.0, 1.0, 0.0, 3.0, 6.0, 0.0, 9.0]
        );
        assert_eq!(from_render_matrix(&r), m);
    }

    #[test]
    fn render_matrix_needs_3d() {
        let h = general_projection(&UNIT, &UNIT).unwrap();
        assert_eq!(h.render_matrix(false), Err(DrapeError::UnsupportedRendering));
    }

    #[test]
    fn css_string() {
        let h = general_projection(&UNIT, &UNIT).unwrap();
        let css = css_matrix3d(&h.render_matrix(true).unwrap());
        assert_eq!(css, "matrix3d(1,0,0,0,0,1,0,0,0,0,1,0,0,0,0,1)");
    }
}
