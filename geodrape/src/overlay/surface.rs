use kurbo::{Point, Size};

use crate::geo::LatLngBounds;
use crate::math::homography::css_matrix3d;
use crate::math::matrix::Mat4;

/// Where and how the image is drawn for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Layer position of the image's top-left pixel.
    pub origin: Point,
    /// Projective warp about `origin`; `None` draws the image unwarped.
    pub warp: Option<Mat4>,
}

impl Placement {
    /// CSS `transform` value, to be used with `transform-origin: 0 0 0`.
    pub fn css_transform(&self) -> String {
        match &self.warp {
            Some(m) => format!(
                "translate3d({}px,{}px,0) {}",
                self.origin.x,
                self.origin.y,
                css_matrix3d(m)
            ),
            None => format!("translate({}px,{}px)", self.origin.x, self.origin.y),
        }
    }
}

/// The element the image is rendered into.
pub trait RenderSurface {
    /// Natural size of the loaded image, if it has loaded.
    fn pixel_size(&self) -> Option<Size>;

    /// Whether 4x4 (3D) transforms can be applied.
    fn supports_3d(&self) -> bool;

    fn set_bounds(&mut self, bounds: LatLngBounds);

    fn apply_placement(&mut self, placement: &Placement);

    fn set_opacity(&mut self, opacity: f64);
}

/// A surface that only records what it was told. Used where there is no real
/// element to position, such as the CLI.
#[derive(Debug, Clone)]
pub struct HeadlessSurface {
    pub size: Option<Size>,
    pub supports_3d: bool,
    pub bounds: Option<LatLngBounds>,
    pub placement: Option<Placement>,
    pub opacity: f64,
    /// Number of placements applied so far.
    pub applied: usize,
}

impl Default for HeadlessSurface {
    fn default() -> Self {
        Self {
            size: None,
            supports_3d: true,
            bounds: None,
            placement: None,
            opacity: 1.0,
            applied: 0,
        }
    }
}

impl HeadlessSurface {
    pub fn with_size(width: f64, height: f64) -> Self {
        Self {
            size: Some(Size::new(width, height)),
            ..Self::default()
        }
    }
}

impl RenderSurface for HeadlessSurface {
    fn pixel_size(&self) -> Option<Size> {
        self.size
    }

    fn supports_3d(&self) -> bool {
        self.supports_3d
    }

    fn set_bounds(&mut self, bounds: LatLngBounds) {
        self.bounds = Some(bounds);
    }

    fn apply_placement(&mut self, placement: &Placement) {
        self.placement = Some(*placement);
        self.applied += 1;
    }

    fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity;
    }
}
