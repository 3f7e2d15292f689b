#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::geo::LatLng;

/// A polygon's vertices, flat or nested (outer ring plus holes).
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum Ring {
    Flat(Vec<LatLng>),
    Nested(Vec<Ring>),
}

impl Ring {
    /// A flat ring holding a logical-order quad.
    pub fn from_quad(quad: [LatLng; 4]) -> Self {
        Ring::Flat(quad.to_vec())
    }

    /// The four corners if this ring is a single quad, looking through
    /// single-element nesting.
    pub fn as_quad(&self) -> Option<[LatLng; 4]> {
        match self {
            Ring::Flat(pts) => pts.as_slice().try_into().ok(),
            Ring::Nested(rings) if rings.len() == 1 => rings[0].as_quad(),
            Ring::Nested(_) => None,
        }
    }

    /// Shift every vertex at every nesting level.
    pub fn translate(&mut self, dlat: f64, dlng: f64) {
        match self {
            Ring::Flat(pts) => {
                for p in pts {
                    *p = p.offset(dlat, dlng);
                }
            }
            Ring::Nested(rings) => {
                for r in rings {
                    r.translate(dlat, dlng);
                }
            }
        }
    }

    pub fn vertex_count(&self) -> usize {
        match self {
            Ring::Flat(pts) => pts.len(),
            Ring::Nested(rings) => rings.iter().map(Ring::vertex_count).sum(),
        }
    }

    /// Visit every vertex in order.
    pub fn for_each_vertex(&self, f: &mut impl FnMut(LatLng)) {
        match self {
            Ring::Flat(pts) => pts.iter().copied().for_each(&mut *f),
            Ring::Nested(rings) => {
                for r in rings {
                    r.for_each_vertex(f);
                }
            }
        }
    }
}
