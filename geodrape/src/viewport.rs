use std::f64::consts::PI;

use kurbo::{Point, Size, Vec2};

use crate::geo::LatLng;

/// Maps geographic positions to the current screen (layer) coordinates.
pub trait Projection {
    fn project(&self, ll: LatLng) -> Point;
}

impl<F: Fn(LatLng) -> Point> Projection for F {
    fn project(&self, ll: LatLng) -> Point {
        self(ll)
    }
}

/// Latitude limit of the square spherical-mercator world.
pub const MAX_LATITUDE: f64 = 85.051_128_779_8;

const TILE_SIZE: f64 = 256.0;

/// Spherical-mercator projection at a fixed zoom, relative to a pixel origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WebMercator {
    pub zoom: f64,
    /// World pixel that maps to layer point `(0, 0)`.
    pub pixel_origin: Point,
}

impl WebMercator {
    pub fn new(zoom: f64, pixel_origin: Point) -> Self {
        Self { zoom, pixel_origin }
    }

    /// A view of `size` pixels with `center` in the middle.
    pub fn centered(center: LatLng, zoom: f64, size: Size) -> Self {
        let mut view = Self::new(zoom, Point::ZERO);
        let c = view.world_point(center);
        view.pixel_origin = c - Vec2::new(size.width / 2.0, size.height / 2.0);
        view
    }

    /// Side length of the world in pixels at this zoom.
    pub fn world_size(&self) -> f64 {
        TILE_SIZE * self.zoom.exp2()
    }

    /// Absolute world pixel of a position.
    pub fn world_point(&self, ll: LatLng) -> Point {
        let lat = ll.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
        let s = self.world_size();
        let x = (ll.lng + 180.0) / 360.0 * s;
        let y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * s;
        Point::new(x, y)
    }

    /// Inverse of [`Projection::project`].
    pub fn unproject(&self, p: Point) -> LatLng {
        let s = self.world_size();
        let w = p + self.pixel_origin.to_vec2();
        let lng = w.x / s * 360.0 - 180.0;
        let n = PI * (1.0 - 2.0 * w.y / s);
        let lat = n.sinh().atan().to_degrees();
        LatLng::new(lat, lng)
    }
}

impl Projection for WebMercator {
    fn project(&self, ll: LatLng) -> Point {
        self.world_point(ll) - self.pixel_origin.to_vec2()
    }
}
