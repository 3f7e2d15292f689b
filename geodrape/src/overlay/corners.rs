use crate::geo::{LatLng, LatLngBounds};

/// Storage slot for each logical corner index. Swapping slots 2 and 3 is its
/// own inverse, so the same table maps storage back to logical.
const LOGICAL_TO_STORAGE: [usize; 4] = [0, 1, 3, 2];

/// Storage slot holding logical corner `i` (and vice versa). Panics if
/// `i >= 4`.
pub const fn storage_slot(i: usize) -> usize {
    LOGICAL_TO_STORAGE[i]
}

/// The four geographic corners an image is draped onto.
///
/// Stored in image-scan order (TL, TR, BL, BR) to match the pixel rectangle
/// the transform starts from. Callers see polygon winding order
/// (TL, TR, BR, BL).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CornerQuad {
    storage: [LatLng; 4],
}

impl Default for CornerQuad {
    /// The unit square placeholder used before real corners arrive.
    fn default() -> Self {
        Self {
            storage: [
                LatLng::new(0.0, 0.0),
                LatLng::new(1.0, 0.0),
                LatLng::new(0.0, 1.0),
                LatLng::new(1.0, 1.0),
            ],
        }
    }
}

impl CornerQuad {
    pub fn from_logical(logical: [LatLng; 4]) -> Self {
        let mut quad = Self::default();
        quad.set_logical(logical);
        quad
    }

    pub fn set_logical(&mut self, logical: [LatLng; 4]) {
        for (i, ll) in logical.into_iter().enumerate() {
            self.storage[storage_slot(i)] = ll;
        }
    }

    /// Corners in polygon winding order.
    pub fn logical(&self) -> [LatLng; 4] {
        std::array::from_fn(|i| self.storage[storage_slot(i)])
    }

    /// Logical corner `i`, or `None` if `i >= 4`.
    pub fn corner(&self, i: usize) -> Option<LatLng> {
        LOGICAL_TO_STORAGE.get(i).map(|&slot| self.storage[slot])
    }

    /// Corner in storage slot `i`, i.e. image-scan order. Panics if `i >= 4`.
    pub fn storage_corner(&self, i: usize) -> LatLng {
        self.storage[i]
    }

    pub fn storage(&self) -> &[LatLng; 4] {
        &self.storage
    }

    pub fn bounds(&self) -> LatLngBounds {
        let mut bounds = LatLngBounds::at(self.storage[0]);
        for ll in &self.storage[1..] {
            bounds.extend(*ll);
        }
        bounds
    }

    /// Logical corners turned a quarter: the last corner becomes the first.
    pub fn rotated(&self) -> [LatLng; 4] {
        let [a, b, c, d] = self.logical();
        [d, a, b, c]
    }

    /// Logical corners reversed, flipping the image top to bottom.
    pub fn mirrored(&self) -> [LatLng; 4] {
        let [a, b, c, d] = self.logical();
        [d, c, b, a]
    }
}
