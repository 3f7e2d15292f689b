use std::collections::BTreeMap;

use smallvec::SmallVec;
use tracing::debug;

use crate::geo::LatLng;
use crate::ring::Ring;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u64);

/// Identifies a polygon layer on the map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PolygonId(pub u64);

/// A draggable handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Marker {
    pub id: MarkerId,
    pub position: LatLng,
    /// Position at the previous drag event; `None` outside a drag.
    last_position: Option<LatLng>,
}

impl Marker {
    pub fn is_dragging(&self) -> bool {
        self.last_position.is_some()
    }
}

/// The polygons currently on the map.
pub trait PolygonLayers {
    fn for_each_polygon_mut(&mut self, f: &mut dyn FnMut(PolygonId, &mut Ring));
}

impl PolygonLayers for BTreeMap<PolygonId, Ring> {
    fn for_each_polygon_mut(&mut self, f: &mut dyn FnMut(PolygonId, &mut Ring)) {
        for (id, ring) in self.iter_mut() {
            f(*id, ring);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerInput {
    Click(LatLng),
    DragStart(MarkerId),
    Drag(MarkerId, LatLng),
    DragEnd(MarkerId),
    ContextMenu(MarkerId),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerEffect {
    MarkerAdded { id: MarkerId, position: LatLng },
    MarkerRemoved(MarkerId),
    /// The polygon's vertices changed; observers should treat it as an edit.
    PolygonEdited(PolygonId),
}

/// Moves the draped image as a rigid body through proxy markers.
///
/// Clicks drop markers and dragging one shifts every polygon by the
/// marker's movement. The host feeds it [`ControllerInput`]s and applies the
/// returned [`ControllerEffect`]s.
#[derive(Debug, Default)]
pub struct CornerController {
    enabled: bool,
    markers: SmallVec<[Marker; 4]>,
    next_id: u64,
}

impl CornerController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start accepting clicks.
    pub fn enable(&mut self) {
        self.enabled = true;
    }

    /// Stop accepting input and drop every marker.
    pub fn disable(&mut self) -> Vec<ControllerEffect> {
        self.enabled = false;
        let removed: Vec<ControllerEffect> = self
            .markers
            .drain(..)
            .map(|m| ControllerEffect::MarkerRemoved(m.id))
            .collect();
        debug!(count = removed.len(), "transform mode disabled");
        removed
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    /// Process one input. Input for unknown markers, or any input while
    /// disabled, is ignored.
    pub fn handle(
        &mut self,
        input: ControllerInput,
        layers: &mut dyn PolygonLayers,
    ) -> Vec<ControllerEffect> {
        if !self.enabled {
            return Vec::new();
        }
        match input {
            ControllerInput::Click(position) => {
                let id = MarkerId(self.next_id);
                self.next_id += 1;
                self.markers.push(Marker {
                    id,
                    position,
                    last_position: None,
                });
                debug!(id = id.0, lat = position.lat, lng = position.lng, "marker added");
                vec![ControllerEffect::MarkerAdded { id, position }]
            }
            ControllerInput::DragStart(id) => {
                if let Some(m) = self.marker_mut(id) {
                    m.last_position = Some(m.position);
                }
                Vec::new()
            }
            ControllerInput::Drag(id, position) => self.drag(id, position, layers),
            ControllerInput::DragEnd(id) => {
                if let Some(m) = self.marker_mut(id) {
                    m.last_position = None;
                }
                Vec::new()
            }
            ControllerInput::ContextMenu(id) => {
                let Some(idx) = self.markers.iter().position(|m| m.id == id) else {
                    return Vec::new();
                };
                self.markers.remove(idx);
                debug!(id = id.0, "marker removed");
                vec![ControllerEffect::MarkerRemoved(id)]
            }
        }
    }

    fn drag(
        &mut self,
        id: MarkerId,
        position: LatLng,
        layers: &mut dyn PolygonLayers,
    ) -> Vec<ControllerEffect> {
        let Some(marker) = self.marker_mut(id) else {
            return Vec::new();
        };
        let last = marker.last_position.replace(position);
        marker.position = position;
        // the first drag event without a drag start only seeds the position
        let Some(last) = last else {
            return Vec::new();
        };

        let (dlat, dlng) = position.delta_from(last);
        let mut effects = Vec::new();
        layers.for_each_polygon_mut(&mut |pid: PolygonId, ring: &mut Ring| {
            ring.translate(dlat, dlng);
            effects.push(ControllerEffect::PolygonEdited(pid));
        });
        debug!(dlat, dlng, polygons = effects.len(), "translated polygons");
        effects
    }

    fn marker_mut(&mut self, id: MarkerId) -> Option<&mut Marker> {
        self.markers.iter_mut().find(|m| m.id == id)
    }
}
