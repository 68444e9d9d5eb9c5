//! Core data types for visited regions.
//!
//! A [`VisitedRegion`] is the persisted record of an area the user has been
//! inside. A [`LocationFix`] is a single sample from the location provider.
//! An [`ExploredCircle`] is the drawable projection of a region.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coord::{self, CoordError};

/// Default exploration radius in meters.
pub const DEFAULT_RADIUS_M: u32 = 200;

/// Invariant violations on a [`VisitedRegion`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegionError {
    #[error(transparent)]
    Coordinate(#[from] CoordError),

    #[error("Radius must be positive")]
    ZeroRadius,

    #[error("Visit count must be at least 1")]
    ZeroVisitCount,

    #[error("Visit end {end} precedes start {start}")]
    EndBeforeStart {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// A geographic area the user has physically been inside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisitedRegion {
    /// Store-assigned identifier; `None` until first persisted.
    pub id: Option<i64>,
    /// Center latitude in degrees.
    pub latitude: f64,
    /// Center longitude in degrees.
    pub longitude: f64,
    /// Explored radius in meters.
    pub radius: u32,
    /// First time this region was entered.
    pub timestamp_start: DateTime<Utc>,
    /// Last time a fix fell inside this region.
    pub timestamp_end: Option<DateTime<Utc>>,
    /// Number of visit events merged into this region.
    pub visit_count: u32,
    pub city: Option<String>,
    pub district: Option<String>,
    pub country: Option<String>,
    pub country_code: Option<String>,
    /// Spatial bucket key.
    pub geohash: Option<String>,
    /// Horizontal accuracy (meters) of the fix that last touched the region.
    pub accuracy: Option<f64>,
    /// Set by the store on insert.
    pub created_at: Option<DateTime<Utc>>,
    /// Set by the store on every write.
    pub updated_at: Option<DateTime<Utc>>,
}

impl VisitedRegion {
    /// Create an unpersisted region with a single visit.
    pub fn new(latitude: f64, longitude: f64, radius: u32, timestamp_start: DateTime<Utc>) -> Self {
        Self {
            id: None,
            latitude,
            longitude,
            radius,
            timestamp_start,
            timestamp_end: None,
            visit_count: 1,
            city: None,
            district: None,
            country: None,
            country_code: None,
            geohash: None,
            accuracy: None,
            created_at: None,
            updated_at: None,
        }
    }

    /// Set the accuracy of the producing fix.
    pub fn with_accuracy(mut self, accuracy: Option<f64>) -> Self {
        self.accuracy = accuracy;
        self
    }

    /// Set the geohash bucket key.
    pub fn with_geohash(mut self, geohash: impl Into<String>) -> Self {
        self.geohash = Some(geohash.into());
        self
    }

    /// Check the record invariants.
    pub fn validate(&self) -> Result<(), RegionError> {
        coord::validate_lat_lon(self.latitude, self.longitude)?;
        if self.radius == 0 {
            return Err(RegionError::ZeroRadius);
        }
        if self.visit_count == 0 {
            return Err(RegionError::ZeroVisitCount);
        }
        if let Some(end) = self.timestamp_end {
            if end < self.timestamp_start {
                return Err(RegionError::EndBeforeStart {
                    start: self.timestamp_start,
                    end,
                });
            }
        }
        Ok(())
    }

    /// Identity of a region before it has a store id.
    ///
    /// Coordinates are compared bitwise, so only exact copies match.
    pub fn content_key(&self) -> (u64, u64, i64) {
        (
            self.latitude.to_bits(),
            self.longitude.to_bits(),
            self.timestamp_start.timestamp_millis(),
        )
    }

    /// Great-circle distance from the region center to a point, in meters.
    pub fn distance_to(&self, lat: f64, lon: f64) -> f64 {
        coord::haversine_distance_m(self.latitude, self.longitude, lat, lon)
    }

    /// Fold a revisit into this region.
    ///
    /// Unknown accuracy leaves the stored accuracy unchanged.
    pub fn record_visit(&mut self, at: DateTime<Utc>, accuracy: Option<f64>) {
        self.visit_count = self.visit_count.saturating_add(1);
        // Out-of-order fixes never move the end before the start
        self.timestamp_end = Some(at.max(self.timestamp_start));
        if accuracy.is_some() {
            self.accuracy = accuracy;
        }
    }

    /// The drawable circle for this region.
    pub fn to_circle(&self) -> ExploredCircle {
        ExploredCircle {
            region_id: self.id,
            latitude: self.latitude,
            longitude: self.longitude,
            radius_m: self.radius as f64,
        }
    }
}

/// A single location sample from the location provider.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LocationFix {
    pub latitude: f64,
    pub longitude: f64,
    /// Horizontal accuracy in meters. Non-positive means unknown.
    pub horizontal_accuracy: f64,
    pub timestamp: DateTime<Utc>,
}

impl LocationFix {
    pub fn new(
        latitude: f64,
        longitude: f64,
        horizontal_accuracy: f64,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            latitude,
            longitude,
            horizontal_accuracy,
            timestamp,
        }
    }

    /// Accuracy in meters, or `None` if the provider did not report one.
    pub fn known_accuracy(&self) -> Option<f64> {
        if self.horizontal_accuracy.is_finite() && self.horizontal_accuracy > 0.0 {
            Some(self.horizontal_accuracy)
        } else {
            None
        }
    }

    /// Great-circle distance to another fix in meters.
    pub fn distance_to(&self, other: &LocationFix) -> f64 {
        coord::haversine_distance_m(self.latitude, self.longitude, other.latitude, other.longitude)
    }
}

/// A circle to reveal in the fog overlay.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExploredCircle {
    /// The region this circle was derived from.
    pub region_id: Option<i64>,
    pub latitude: f64,
    pub longitude: f64,
    pub radius_m: f64,
}

impl ExploredCircle {
    pub fn new(latitude: f64, longitude: f64, radius_m: f64) -> Self {
        Self {
            region_id: None,
            latitude,
            longitude,
            radius_m,
        }
    }

    /// Whether `other` lies entirely inside this circle.
    pub fn contains_circle(&self, other: &ExploredCircle) -> bool {
        let d = coord::haversine_distance_m(
            self.latitude,
            self.longitude,
            other.latitude,
            other.longitude,
        );
        d + other.radius_m <= self.radius_m
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_new_region_defaults() {
        let region = VisitedRegion::new(41.0082, 28.9784, DEFAULT_RADIUS_M, t0());
        assert!(region.id.is_none());
        assert_eq!(region.visit_count, 1);
        assert_eq!(region.radius, 200);
        assert!(region.timestamp_end.is_none());
        assert!(region.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_records() {
        let mut region = VisitedRegion::new(41.0, 29.0, 0, t0());
        assert_eq!(region.validate(), Err(RegionError::ZeroRadius));

        region.radius = 200;
        region.visit_count = 0;
        assert_eq!(region.validate(), Err(RegionError::ZeroVisitCount));

        region.visit_count = 1;
        region.timestamp_end = Some(t0() - Duration::seconds(1));
        assert!(matches!(
            region.validate(),
            Err(RegionError::EndBeforeStart { .. })
        ));

        region.timestamp_end = None;
        region.latitude = 95.0;
        assert!(matches!(
            region.validate(),
            Err(RegionError::Coordinate(CoordError::InvalidLatitude(_)))
        ));
    }

    #[test]
    fn test_record_visit() {
        let mut region = VisitedRegion::new(41.0, 29.0, 200, t0()).with_accuracy(Some(12.0));
        region.record_visit(t0() + Duration::seconds(60), Some(8.0));
        assert_eq!(region.visit_count, 2);
        assert_eq!(region.timestamp_end, Some(t0() + Duration::seconds(60)));
        assert_eq!(region.accuracy, Some(8.0));

        // Unknown accuracy keeps the previous value
        region.record_visit(t0() + Duration::seconds(120), None);
        assert_eq!(region.visit_count, 3);
        assert_eq!(region.accuracy, Some(8.0));
    }

    #[test]
    fn test_record_visit_never_precedes_start() {
        let mut region = VisitedRegion::new(41.0, 29.0, 200, t0());
        region.record_visit(t0() - Duration::seconds(30), None);
        assert_eq!(region.timestamp_end, Some(t0()));
        assert!(region.validate().is_ok());
    }

    #[test]
    fn test_content_key_identity() {
        let a = VisitedRegion::new(41.0, 29.0, 200, t0());
        let b = VisitedRegion::new(41.0, 29.0, 500, t0());
        let c = VisitedRegion::new(41.0, 29.0, 200, t0() + Duration::seconds(1));
        assert_eq!(a.content_key(), b.content_key());
        assert_ne!(a.content_key(), c.content_key());
    }

    #[test]
    fn test_known_accuracy() {
        assert_eq!(LocationFix::new(0.0, 0.0, 5.0, t0()).known_accuracy(), Some(5.0));
        assert_eq!(LocationFix::new(0.0, 0.0, 0.0, t0()).known_accuracy(), None);
        assert_eq!(LocationFix::new(0.0, 0.0, -1.0, t0()).known_accuracy(), None);
        assert_eq!(
            LocationFix::new(0.0, 0.0, f64::NAN, t0()).known_accuracy(),
            None
        );
    }

    #[test]
    fn test_circle_containment() {
        let big = ExploredCircle::new(41.0, 29.0, 500.0);
        let small = ExploredCircle::new(41.0, 29.0, 200.0);
        let far = ExploredCircle::new(41.01, 29.0, 200.0);

        assert!(big.contains_circle(&small));
        assert!(!small.contains_circle(&big));
        assert!(!big.contains_circle(&far));
    }

    #[test]
    fn test_to_circle_carries_id() {
        let mut region = VisitedRegion::new(41.0, 29.0, 250, t0());
        region.id = Some(7);
        let circle = region.to_circle();
        assert_eq!(circle.region_id, Some(7));
        assert_eq!(circle.radius_m, 250.0);
    }
}
