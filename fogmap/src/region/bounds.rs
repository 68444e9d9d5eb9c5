//! Geographic bounding rectangles and spans.

use serde::{Deserialize, Serialize};

/// Latitude/longitude extent of a map region, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoordinateSpan {
    pub latitude_delta: f64,
    pub longitude_delta: f64,
}

impl CoordinateSpan {
    pub fn new(latitude_delta: f64, longitude_delta: f64) -> Self {
        Self {
            latitude_delta,
            longitude_delta,
        }
    }
}

/// Geographic bounding box.
///
/// Used both for viewport extents and for rectangular store queries.
/// Boxes that cross the antimeridian are not represented; callers split
/// them into two boxes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    /// Minimum (southernmost) latitude
    pub min_lat: f64,
    /// Maximum (northernmost) latitude
    pub max_lat: f64,
    /// Minimum (westernmost) longitude
    pub min_lon: f64,
    /// Maximum (easternmost) longitude
    pub max_lon: f64,
}

impl GeoBounds {
    /// Create a new bounding box.
    pub fn new(min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) -> Self {
        Self {
            min_lat,
            max_lat,
            min_lon,
            max_lon,
        }
    }

    /// Create a bounding box from a single point.
    pub fn from_point(lat: f64, lon: f64) -> Self {
        Self::new(lat, lat, lon, lon)
    }

    /// Create a bounding box centered on a point with the given span.
    pub fn from_center_span(lat: f64, lon: f64, span: CoordinateSpan) -> Self {
        let half_lat = span.latitude_delta / 2.0;
        let half_lon = span.longitude_delta / 2.0;
        Self::new(lat - half_lat, lat + half_lat, lon - half_lon, lon + half_lon)
    }

    /// Expand this bounding box to include a point.
    pub fn expand(&mut self, lat: f64, lon: f64) {
        self.min_lat = self.min_lat.min(lat);
        self.max_lat = self.max_lat.max(lat);
        self.min_lon = self.min_lon.min(lon);
        self.max_lon = self.max_lon.max(lon);
    }

    /// Whether the point lies inside the box (edges inclusive).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        (self.min_lat..=self.max_lat).contains(&lat) && (self.min_lon..=self.max_lon).contains(&lon)
    }

    /// Get the center point of the bounds.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// Get the span of the bounds.
    pub fn span(&self) -> CoordinateSpan {
        CoordinateSpan::new(self.height(), self.width())
    }

    /// Get the width of the bounds in degrees.
    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Get the height of the bounds in degrees.
    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_center_span() {
        let bounds = GeoBounds::from_center_span(41.0, 29.0, CoordinateSpan::new(0.02, 0.04));
        assert!((bounds.min_lat - 40.99).abs() < 1e-12);
        assert!((bounds.max_lat - 41.01).abs() < 1e-12);
        assert!((bounds.min_lon - 28.98).abs() < 1e-12);
        assert!((bounds.max_lon - 29.02).abs() < 1e-12);

        let (lat, lon) = bounds.center();
        assert!((lat - 41.0).abs() < 1e-12);
        assert!((lon - 29.0).abs() < 1e-12);
    }

    #[test]
    fn test_expand_and_contains() {
        let mut bounds = GeoBounds::from_point(10.0, 20.0);
        assert!(bounds.contains(10.0, 20.0));
        assert!(!bounds.contains(11.0, 20.0));

        bounds.expand(11.0, 19.0);
        assert!(bounds.contains(10.5, 19.5));
        assert_eq!(bounds.height(), 1.0);
        assert_eq!(bounds.width(), 1.0);
    }

    #[test]
    fn test_span_matches_dimensions() {
        let bounds = GeoBounds::new(0.0, 2.0, 0.0, 3.0);
        let span = bounds.span();
        assert_eq!(span.latitude_delta, 2.0);
        assert_eq!(span.longitude_delta, 3.0);
    }
}
