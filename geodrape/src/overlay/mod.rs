pub mod corners;
pub mod pulse;
pub mod surface;

use kurbo::{Point, Size};
use tracing::{debug, warn};
use web_time::Instant;

use crate::config::OverlayConfig;
use crate::error::{Degeneracy, DrapeError};
use crate::geo::{LatLng, LatLngBounds};
use crate::math::homography::{general_projection, is_degenerate_quad, Homography};
use crate::viewport::Projection;

use corners::CornerQuad;
use pulse::Pulse;
use surface::{Placement, RenderSurface};

/// Notifications for observers of the overlay.
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayEvent {
    /// The corners were replaced; carries them in logical order.
    Updated([LatLng; 4]),
    /// The surface cannot apply 3D transforms. Sent once per overlay.
    DegradedMode,
}

/// Outcome of one transform recomputation.
#[derive(Debug, Clone, PartialEq)]
pub enum Recompute {
    /// A warped placement was applied.
    Applied(Placement),
    /// An unwarped placement was applied.
    Degraded(Placement),
    /// Nothing was applied; the previous placement stays on screen.
    Skipped(DrapeError),
}

impl Recompute {
    pub fn placement(&self) -> Option<&Placement> {
        match self {
            Recompute::Applied(p) | Recompute::Degraded(p) => Some(p),
            Recompute::Skipped(_) => None,
        }
    }
}

/// An image warped onto four geographic corners.
///
/// Corner changes and move ends re-solve the homography from the image
/// rectangle to the projected corners. A degenerate quad skips the frame and
/// keeps the last placement. A surface without 3D transforms gets the image
/// unwarped at the first corner.
#[derive(Debug)]
pub struct ProjectiveOverlay<S> {
    config: OverlayConfig,
    corners: CornerQuad,
    surface: S,
    /// Size used by the last recomputation.
    size: Size,
    transform: Option<Homography>,
    placement: Option<Placement>,
    pulse: Pulse,
    attached: bool,
    view_fitted: bool,
    degraded_reported: bool,
    events: Vec<OverlayEvent>,
}

impl<S: RenderSurface> ProjectiveOverlay<S> {
    pub fn new(surface: S, config: OverlayConfig) -> Self {
        let pulse = Pulse::new(config.pulse_interval, config.pulse_step);
        let size = Size::new(config.fallback_width, config.fallback_height);
        Self {
            config,
            corners: CornerQuad::default(),
            surface,
            size,
            transform: None,
            placement: None,
            pulse,
            attached: false,
            view_fitted: false,
            degraded_reported: false,
            events: Vec::new(),
        }
    }

    /// Put the overlay on the map and start the pulse. The image is placed
    /// by the next [`set_corners`](Self::set_corners) or move end.
    pub fn attach(&mut self, now: Instant) {
        self.attached = true;
        self.pulse.start(now);
    }

    /// Take the overlay off the map. Stops the pulse.
    pub fn detach(&mut self) {
        self.attached = false;
        self.pulse.stop();
    }

    pub fn is_attached(&self) -> bool {
        self.attached
    }

    /// Replace the corners (logical order), update the surface bounds,
    /// notify observers, and re-place the image.
    pub fn set_corners(&mut self, logical: [LatLng; 4], projection: &dyn Projection) -> Recompute {
        self.corners.set_logical(logical);
        self.surface.set_bounds(self.corners.bounds());
        self.events.push(OverlayEvent::Updated(logical));
        self.recompute(projection)
    }

    /// Corners in logical order.
    pub fn corners(&self) -> [LatLng; 4] {
        self.corners.logical()
    }

    /// Logical corner `i`, or `None` if `i >= 4`.
    pub fn corner(&self, i: usize) -> Option<LatLng> {
        self.corners.corner(i)
    }

    pub fn corner_quad(&self) -> &CornerQuad {
        &self.corners
    }

    /// The viewport finished a pan or zoom.
    pub fn on_move_end(&mut self, projection: &dyn Projection) -> Recompute {
        self.recompute(projection)
    }

    /// Re-place the image with the current corners, e.g. after the image
    /// finished loading and knows its size.
    pub fn refresh(&mut self, projection: &dyn Projection) -> Recompute {
        self.recompute(projection)
    }

    /// Image size to map from: the surface's natural size, or the configured
    /// fallback while it is unknown.
    pub fn image_size(&self) -> Size {
        match self.surface.pixel_size() {
            Some(s) if s.width > 0.0 && s.height > 0.0 && s.is_finite() => s,
            _ => Size::new(self.config.fallback_width, self.config.fallback_height),
        }
    }

    /// Solve the homography from the image rectangle to the projected
    /// corners, relative to the first corner. Returns it with that corner's
    /// screen position.
    pub fn compute_transform(
        &self,
        projection: &dyn Projection,
    ) -> Result<(Homography, Point), DrapeError> {
        let offset = projection.project(self.corners.storage_corner(0));
        let dst: [[f64; 2]; 4] = std::array::from_fn(|i| {
            let p = projection.project(self.corners.storage_corner(i)) - offset;
            [p.x, p.y]
        });
        if is_degenerate_quad(&dst, self.config.collinear_tolerance) {
            return Err(DrapeError::DegenerateGeometry(Degeneracy::Collinear));
        }

        let Size { width: w, height: h } = self.image_size();
        let src = [[0.0, 0.0], [w, 0.0], [0.0, h], [w, h]];
        let transform = general_projection(&src, &dst)?;
        Ok((transform, offset))
    }

    fn recompute(&mut self, projection: &dyn Projection) -> Recompute {
        let (transform, origin) = match self.compute_transform(projection) {
            Ok(t) => t,
            Err(err) => {
                warn!(%err, "skipping overlay frame");
                return Recompute::Skipped(err);
            }
        };
        self.size = self.image_size();
        self.transform = Some(transform);

        match transform.render_matrix(self.surface.supports_3d()) {
            Ok(m) => {
                let placement = Placement {
                    origin,
                    warp: Some(m),
                };
                debug!(x = origin.x, y = origin.y, "placing warped overlay");
                self.place(placement);
                Recompute::Applied(placement)
            }
            Err(_) => {
                if !self.degraded_reported {
                    warn!("surface lacks 3D transforms, drawing overlay unwarped");
                    self.degraded_reported = true;
                    self.events.push(OverlayEvent::DegradedMode);
                }
                let placement = Placement { origin, warp: None };
                self.place(placement);
                Recompute::Degraded(placement)
            }
        }
    }

    fn place(&mut self, placement: Placement) {
        self.surface.apply_placement(&placement);
        self.placement = Some(placement);
    }

    /// Last successfully computed transform.
    pub fn transform(&self) -> Option<&Homography> {
        self.transform.as_ref()
    }

    /// Last applied placement.
    pub fn placement(&self) -> Option<&Placement> {
        self.placement.as_ref()
    }

    /// Size used by the last successful recomputation.
    pub fn last_size(&self) -> Size {
        self.size
    }

    /// Advance the opacity pulse if a tick is due.
    pub fn poll_pulse(&mut self, now: Instant) -> Option<f64> {
        let opacity = self.pulse.poll(now)?;
        self.surface.set_opacity(opacity);
        Some(opacity)
    }

    pub fn pulse(&self) -> &Pulse {
        &self.pulse
    }

    /// Bounds to fit the view to, returned only the first time.
    pub fn take_view_fit(&mut self) -> Option<LatLngBounds> {
        if self.view_fitted {
            return None;
        }
        self.view_fitted = true;
        Some(self.corners.bounds())
    }

    /// Take pending notifications, oldest first.
    pub fn drain_events(&mut self) -> Vec<OverlayEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }
}
