//! The live set of explored circles used for overlay drawing.

use crate::region::{ExploredCircle, VisitedRegion};

/// In-memory projection of persisted regions to drawable circles.
///
/// Circles keep insertion order (oldest region first). Every change bumps
/// `revision`, so consumers can skip recomputing the overlay when nothing
/// has changed since their last frame.
#[derive(Debug, Clone, Default)]
pub struct ExploredCircleSet {
    circles: Vec<ExploredCircle>,
    revision: u64,
}

impl ExploredCircleSet {
    /// Create an empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from regions ordered most recent first (store order).
    pub fn from_regions_newest_first(regions: &[VisitedRegion]) -> Self {
        Self {
            circles: regions.iter().rev().map(VisitedRegion::to_circle).collect(),
            revision: 1,
        }
    }

    /// Replace the whole set, as after a full reload.
    pub fn replace(&mut self, other: ExploredCircleSet) {
        self.circles = other.circles;
        self.revision += 1;
    }

    /// Add a circle, or replace the one derived from the same region.
    ///
    /// Returns `true` if the set changed.
    pub fn upsert(&mut self, circle: ExploredCircle) -> bool {
        let existing = circle
            .region_id
            .and_then(|id| self.circles.iter_mut().find(|c| c.region_id == Some(id)));

        match existing {
            Some(slot) if *slot == circle => false,
            Some(slot) => {
                *slot = circle;
                self.revision += 1;
                true
            }
            None => {
                self.circles.push(circle);
                self.revision += 1;
                true
            }
        }
    }

    /// Remove every circle.
    pub fn clear(&mut self) {
        self.circles.clear();
        self.revision += 1;
    }

    /// Monotonic change counter.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn len(&self) -> usize {
        self.circles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.circles.is_empty()
    }

    /// Circles in insertion order.
    pub fn circles(&self) -> &[ExploredCircle] {
        &self.circles
    }

    pub fn iter(&self) -> impl Iterator<Item = &ExploredCircle> {
        self.circles.iter()
    }

    /// A simplified copy without circles fully covered by another circle.
    ///
    /// Of two identical circles the earlier one is kept. Order is preserved.
    pub fn deduplicated(&self) -> Vec<ExploredCircle> {
        self.circles
            .iter()
            .enumerate()
            .filter(|(i, circle)| {
                !self.circles.iter().enumerate().any(|(j, other)| {
                    j != *i
                        && other.contains_circle(circle)
                        && (other.radius_m > circle.radius_m || j < *i)
                })
            })
            .map(|(_, circle)| *circle)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn circle(id: i64, lat: f64, lon: f64, radius: f64) -> ExploredCircle {
        ExploredCircle {
            region_id: Some(id),
            latitude: lat,
            longitude: lon,
            radius_m: radius,
        }
    }

    #[test]
    fn test_from_regions_reverses_store_order() {
        let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let mut newer = VisitedRegion::new(42.0, 29.0, 200, t0 + Duration::hours(1));
        newer.id = Some(2);
        let mut older = VisitedRegion::new(41.0, 29.0, 200, t0);
        older.id = Some(1);

        let set = ExploredCircleSet::from_regions_newest_first(&[newer, older]);
        let ids: Vec<_> = set.iter().map(|c| c.region_id).collect();
        assert_eq!(ids, vec![Some(1), Some(2)]);
    }

    #[test]
    fn test_upsert_appends_and_replaces() {
        let mut set = ExploredCircleSet::new();
        assert!(set.upsert(circle(1, 41.0, 29.0, 200.0)));
        assert!(set.upsert(circle(2, 42.0, 29.0, 200.0)));
        assert_eq!(set.len(), 2);
        let rev = set.revision();

        // Same circle again is a no-op
        assert!(!set.upsert(circle(1, 41.0, 29.0, 200.0)));
        assert_eq!(set.revision(), rev);

        // Changed radius replaces in place
        assert!(set.upsert(circle(1, 41.0, 29.0, 300.0)));
        assert_eq!(set.len(), 2);
        assert_eq!(set.circles()[0].radius_m, 300.0);
        assert!(set.revision() > rev);
    }

    #[test]
    fn test_clear_bumps_revision() {
        let mut set = ExploredCircleSet::new();
        set.upsert(circle(1, 41.0, 29.0, 200.0));
        let rev = set.revision();
        set.clear();
        assert!(set.is_empty());
        assert!(set.revision() > rev);
    }

    #[test]
    fn test_deduplicated_drops_contained_circles() {
        let mut set = ExploredCircleSet::new();
        set.upsert(circle(1, 41.0, 29.0, 200.0));
        set.upsert(circle(2, 41.0, 29.0, 500.0));
        set.upsert(circle(3, 41.0, 29.0, 500.0));
        set.upsert(circle(4, 41.05, 29.0, 200.0));

        let simplified = set.deduplicated();
        let ids: Vec<_> = simplified.iter().map(|c| c.region_id).collect();
        assert_eq!(ids, vec![Some(2), Some(4)]);
    }
}
