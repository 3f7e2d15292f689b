#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// A geographic position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Shift by a latitude/longitude delta.
    pub fn offset(self, dlat: f64, dlng: f64) -> Self {
        Self::new(self.lat + dlat, self.lng + dlng)
    }

    /// `(dlat, dlng)` from `from` to `self`.
    pub fn delta_from(self, from: LatLng) -> (f64, f64) {
        (self.lat - from.lat, self.lng - from.lng)
    }
}

impl From<[f64; 2]> for LatLng {
    fn from([lat, lng]: [f64; 2]) -> Self {
        Self::new(lat, lng)
    }
}

/// An axis-aligned geographic rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct LatLngBounds {
    pub south_west: LatLng,
    pub north_east: LatLng,
}

impl LatLngBounds {
    /// Bounds holding a single point.
    pub fn at(p: LatLng) -> Self {
        Self {
            south_west: p,
            north_east: p,
        }
    }

    pub fn extend(&mut self, p: LatLng) {
        self.south_west.lat = self.south_west.lat.min(p.lat);
        self.south_west.lng = self.south_west.lng.min(p.lng);
        self.north_east.lat = self.north_east.lat.max(p.lat);
        self.north_east.lng = self.north_east.lng.max(p.lng);
    }

    pub fn center(&self) -> LatLng {
        LatLng::new(
            (self.south_west.lat + self.north_east.lat) / 2.0,
            (self.south_west.lng + self.north_east.lng) / 2.0,
        )
    }
}
