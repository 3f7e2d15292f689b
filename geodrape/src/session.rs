use std::collections::BTreeMap;
use tracing::{debug, info};
use web_time::Instant;

use crate::controller::{ControllerEffect, ControllerInput, CornerController, PolygonId};
use crate::geo::LatLng;
use crate::overlay::corners::CornerQuad;
use crate::overlay::surface::RenderSurface;
use crate::overlay::{ProjectiveOverlay, Recompute};
use crate::ring::Ring;
use crate::viewport::Projection;

/// Events from the polygon drawing toolkit.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawEvent {
    Created(PolygonId, Ring),
    Edited(PolygonId, Ring),
    Removed(PolygonId),
}

/// Keeps the overlay on the image polygon: the first four-cornered polygon
/// the drawing toolkit reports. Removing it, or editing it into another
/// shape, takes the image off the map until another quad shows up.
#[derive(Debug)]
pub struct DrapeSession<S> {
    polygons: BTreeMap<PolygonId, Ring>,
    image_polygon: Option<PolygonId>,
    overlay: ProjectiveOverlay<S>,
    controller: Option<CornerController>,
    dirty: bool,
}

impl<S: RenderSurface> DrapeSession<S> {
    pub fn new(overlay: ProjectiveOverlay<S>) -> Self {
        Self {
            polygons: BTreeMap::new(),
            image_polygon: None,
            overlay,
            controller: None,
            dirty: false,
        }
    }

    /// Apply a drawing-toolkit event. Returns the overlay recomputation it
    /// caused, if any.
    pub fn handle_draw(
        &mut self,
        event: DrawEvent,
        projection: &dyn Projection,
        now: Instant,
    ) -> Option<Recompute> {
        self.dirty = true;
        match event {
            DrawEvent::Created(id, ring) | DrawEvent::Edited(id, ring) => {
                self.polygons.insert(id, ring);
                self.polygon_changed(id, projection, now)
            }
            DrawEvent::Removed(id) => {
                self.polygons.remove(&id);
                if self.image_polygon == Some(id) {
                    self.release_image();
                }
                None
            }
        }
    }

    /// Route pointer input to the controller while transform mode is on.
    /// Polygons it moves are handled like edits.
    pub fn handle_input(
        &mut self,
        input: ControllerInput,
        projection: &dyn Projection,
        now: Instant,
    ) -> Vec<ControllerEffect> {
        let Some(controller) = self.controller.as_mut() else {
            return Vec::new();
        };
        let effects = controller.handle(input, &mut self.polygons);
        for effect in &effects {
            if let ControllerEffect::PolygonEdited(id) = effect {
                self.dirty = true;
                self.polygon_changed(*id, projection, now);
            }
        }
        effects
    }

    /// Turn transform mode on, or off (removing its markers).
    pub fn toggle_transform_mode(&mut self) -> Vec<ControllerEffect> {
        match self.controller.take() {
            Some(mut controller) => controller.disable(),
            None => {
                let mut controller = CornerController::new();
                controller.enable();
                self.controller = Some(controller);
                Vec::new()
            }
        }
    }

    pub fn transform_mode(&self) -> bool {
        self.controller.is_some()
    }

    pub fn controller(&self) -> Option<&CornerController> {
        self.controller.as_ref()
    }

    /// Turn the image a quarter around its polygon.
    pub fn rotate_image(&mut self, projection: &dyn Projection) -> Option<Recompute> {
        self.reorder_image(projection, CornerQuad::rotated)
    }

    /// Flip the image within its polygon.
    pub fn mirror_image(&mut self, projection: &dyn Projection) -> Option<Recompute> {
        self.reorder_image(projection, CornerQuad::mirrored)
    }

    fn reorder_image(
        &mut self,
        projection: &dyn Projection,
        reorder: fn(&CornerQuad) -> [LatLng; 4],
    ) -> Option<Recompute> {
        let id = self.image_polygon?;
        let quad = self.polygons.get(&id)?.as_quad()?;
        let corners = reorder(&CornerQuad::from_logical(quad));
        self.polygons.insert(id, Ring::from_quad(corners));
        self.dirty = true;
        Some(self.overlay.set_corners(corners, projection))
    }

    /// The viewport finished moving.
    pub fn on_move_end(&mut self, projection: &dyn Projection) -> Option<Recompute> {
        if !self.overlay.is_attached() {
            return None;
        }
        Some(self.overlay.on_move_end(projection))
    }

    fn polygon_changed(
        &mut self,
        id: PolygonId,
        projection: &dyn Projection,
        now: Instant,
    ) -> Option<Recompute> {
        let is_image = self.image_polygon == Some(id);
        let quad = self.polygons.get(&id).and_then(Ring::as_quad);
        match quad {
            Some(corners) if is_image || self.image_polygon.is_none() => {
                if !is_image {
                    info!(polygon = id.0, "draping image onto polygon");
                    self.image_polygon = Some(id);
                }
                if !self.overlay.is_attached() {
                    self.overlay.attach(now);
                }
                Some(self.overlay.set_corners(corners, projection))
            }
            None if is_image => {
                let vertices = self.polygons.get(&id).map_or(0, Ring::vertex_count);
                debug!(polygon = id.0, vertices, "image polygon is no longer a quad");
                self.release_image();
                None
            }
            _ => None,
        }
    }

    fn release_image(&mut self) {
        if let Some(id) = self.image_polygon.take() {
            debug!(polygon = id.0, "image polygon released");
        }
        self.overlay.detach();
    }

    pub fn image_polygon(&self) -> Option<PolygonId> {
        self.image_polygon
    }

    pub fn polygons(&self) -> &BTreeMap<PolygonId, Ring> {
        &self.polygons
    }

    pub fn overlay(&self) -> &ProjectiveOverlay<S> {
        &self.overlay
    }

    pub fn overlay_mut(&mut self) -> &mut ProjectiveOverlay<S> {
        &mut self.overlay
    }

    /// Whether anything changed since the host last saved.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn mark_clean(&mut self) {
        self.dirty = false;
    }
}
