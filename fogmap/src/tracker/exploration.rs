//! Merge location fixes into visited regions.

use std::sync::Arc;

use parking_lot::RwLock;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::explored::ExploredCircleSet;
use crate::coord::geohash::{self, DEFAULT_GEOHASH_PRECISION};
use crate::region::{ExploredCircle, LocationFix, VisitedRegion};
use crate::store::{RegionRepository, StoreError};

/// Errors from the exploration tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    /// Persisting or loading regions failed.
    #[error("Region store error: {0}")]
    Store(#[from] StoreError),

    /// The blocking storage task did not complete.
    #[error("Storage task failed: {0}")]
    Join(String),
}

/// Configuration for [`ExplorationTracker`].
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Merge distance in meters. `None` merges within the exploration radius.
    pub merge_tolerance_m: Option<f64>,
    /// Length of the geohash stored on new regions.
    pub geohash_precision: usize,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            merge_tolerance_m: None,
            geohash_precision: DEFAULT_GEOHASH_PRECISION,
        }
    }
}

impl TrackerConfig {
    /// Set an explicit merge tolerance.
    pub fn with_merge_tolerance(mut self, meters: f64) -> Self {
        self.merge_tolerance_m = Some(meters);
        self
    }
}

/// What the tracker did with a fix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// No region was close enough; a new one was created.
    Created { id: i64 },
    /// The fix fell inside an existing region.
    Merged { id: i64, visit_count: u32 },
}

impl TrackOutcome {
    pub fn region_id(&self) -> i64 {
        match self {
            TrackOutcome::Created { id } | TrackOutcome::Merged { id, .. } => *id,
        }
    }
}

/// Point-in-time copy of the explored circles.
#[derive(Debug, Clone)]
pub struct ExploredSnapshot {
    pub revision: u64,
    pub circles: Vec<ExploredCircle>,
}

/// Decides whether each fix extends a known region or starts a new one,
/// and keeps the explored-circle set in step with the store.
///
/// The circle set is only changed after the store accepted the write, so
/// a storage failure leaves the last known set intact for rendering.
///
/// # Example
///
/// ```ignore
/// let store: Arc<dyn RegionRepository> = Arc::new(SqliteRegionStore::open(path));
/// let tracker = ExplorationTracker::new(store, TrackerConfig::default());
/// tracker.load()?;
///
/// match tracker.process_fix(&fix, 200)? {
///     TrackOutcome::Created { id } => println!("new region {}", id),
///     TrackOutcome::Merged { id, visit_count } => println!("{} visits to {}", visit_count, id),
/// }
/// ```
pub struct ExplorationTracker {
    store: Arc<dyn RegionRepository>,
    config: TrackerConfig,
    circles: RwLock<ExploredCircleSet>,
}

impl std::fmt::Debug for ExplorationTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExplorationTracker")
            .field("config", &self.config)
            .field("circles", &self.circles.read().len())
            .finish_non_exhaustive()
    }
}

impl ExplorationTracker {
    pub fn new(store: Arc<dyn RegionRepository>, config: TrackerConfig) -> Self {
        Self {
            store,
            config,
            circles: RwLock::new(ExploredCircleSet::new()),
        }
    }

    /// Create with default configuration.
    pub fn with_defaults(store: Arc<dyn RegionRepository>) -> Self {
        Self::new(store, TrackerConfig::default())
    }

    /// The store this tracker persists through.
    pub fn store(&self) -> &Arc<dyn RegionRepository> {
        &self.store
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Rebuild the circle set from every persisted region.
    ///
    /// Returns the number of circles loaded. On failure the current set is
    /// kept.
    pub fn load(&self) -> Result<usize, TrackerError> {
        let regions = self.store.get_all().map_err(|e| {
            warn!(error = %e, "Failed to load visited regions");
            e
        })?;
        let set = ExploredCircleSet::from_regions_newest_first(&regions);
        let count = set.len();
        self.circles.write().replace(set);
        info!(regions = count, "Loaded explored circles");
        Ok(count)
    }

    /// Distance within which a fix merges into an existing region.
    pub fn merge_radius_m(&self, exploration_radius_m: u32) -> f64 {
        self.config
            .merge_tolerance_m
            .unwrap_or(exploration_radius_m as f64)
    }

    /// Fold a fix into the nearest region within the merge radius, or
    /// create a new region.
    ///
    /// `exploration_radius_m` is read from runtime settings by the caller
    /// and becomes the radius of any region created here.
    pub fn process_fix(
        &self,
        fix: &LocationFix,
        exploration_radius_m: u32,
    ) -> Result<TrackOutcome, TrackerError> {
        let radius = exploration_radius_m.max(1);
        let merge_radius_m = self.merge_radius_m(radius);

        let candidates = self
            .store
            .get_near(fix.latitude, fix.longitude, merge_radius_m / 1000.0)
            .map_err(|e| {
                warn!(error = %e, "Proximity query failed");
                e
            })?;

        // The store filters by rectangle; confirm with the true distance
        let nearest = candidates
            .into_iter()
            .filter(|r| r.id.is_some())
            .map(|r| (r.distance_to(fix.latitude, fix.longitude), r))
            .filter(|(d, _)| *d <= merge_radius_m)
            .min_by(|(a, _), (b, _)| a.total_cmp(b));

        if let Some((distance_m, mut region)) = nearest {
            region.record_visit(fix.timestamp, fix.known_accuracy());
            let updated = self.store.update(&region).map_err(|e| {
                warn!(error = %e, id = ?region.id, "Failed to update visited region");
                e
            })?;

            if let (true, Some(id)) = (updated, region.id) {
                debug!(
                    id,
                    distance_m = format!("{:.1}", distance_m),
                    visit_count = region.visit_count,
                    "Fix merged into region"
                );
                self.circles.write().upsert(region.to_circle());
                return Ok(TrackOutcome::Merged {
                    id,
                    visit_count: region.visit_count,
                });
            }

            debug!(id = ?region.id, "Region vanished before update, creating a new one");
        }

        self.create_region(fix, radius)
    }

    fn create_region(&self, fix: &LocationFix, radius: u32) -> Result<TrackOutcome, TrackerError> {
        let region = VisitedRegion::new(fix.latitude, fix.longitude, radius, fix.timestamp)
            .with_accuracy(fix.known_accuracy())
            .with_geohash(geohash::encode(
                fix.latitude,
                fix.longitude,
                self.config.geohash_precision,
            ));

        let id = self.store.insert(&region).map_err(|e| {
            warn!(error = %e, "Failed to insert visited region");
            e
        })?;

        let mut circle = region.to_circle();
        circle.region_id = Some(id);
        self.circles.write().upsert(circle);

        info!(
            id,
            lat = fix.latitude,
            lon = fix.longitude,
            radius,
            "New region explored"
        );
        Ok(TrackOutcome::Created { id })
    }

    /// Delete every region and clear the circle set.
    ///
    /// The set is only cleared if the store delete succeeded.
    pub fn clear_all(&self) -> Result<usize, TrackerError> {
        let removed = self.store.delete_all()?;
        self.circles.write().clear();
        Ok(removed)
    }

    /// Copy of the current circles in insertion order.
    pub fn circles(&self) -> Vec<ExploredCircle> {
        self.circles.read().circles().to_vec()
    }

    /// Copy of the circles together with their revision.
    pub fn snapshot(&self) -> ExploredSnapshot {
        let set = self.circles.read();
        ExploredSnapshot {
            revision: set.revision(),
            circles: set.circles().to_vec(),
        }
    }

    /// Circles with fully covered duplicates removed.
    pub fn simplified_circles(&self) -> Vec<ExploredCircle> {
        self.circles.read().deduplicated()
    }

    /// Current change counter of the circle set.
    pub fn revision(&self) -> u64 {
        self.circles.read().revision()
    }

    /// Number of circles in the set.
    pub fn circle_count(&self) -> usize {
        self.circles.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::GeoBounds;
    use crate::store::{SqliteRegionStore, StoreResult};
    use chrono::{DateTime, Duration, TimeZone, Utc};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn fix_at(lat: f64, lon: f64, secs: i64) -> LocationFix {
        LocationFix::new(lat, lon, 10.0, t0() + Duration::seconds(secs))
    }

    fn tracker() -> ExplorationTracker {
        let store = Arc::new(SqliteRegionStore::in_memory().unwrap());
        ExplorationTracker::with_defaults(store)
    }

    /// Store whose writes always fail after `get_near` succeeds.
    struct FailingWrites;

    impl RegionRepository for FailingWrites {
        fn insert(&self, _: &VisitedRegion) -> StoreResult<i64> {
            Err(StoreError::WriteFailed(rusqlite::Error::InvalidQuery))
        }
        fn update(&self, _: &VisitedRegion) -> StoreResult<bool> {
            Err(StoreError::WriteFailed(rusqlite::Error::InvalidQuery))
        }
        fn get_all(&self) -> StoreResult<Vec<VisitedRegion>> {
            Ok(Vec::new())
        }
        fn get_near(&self, _: f64, _: f64, _: f64) -> StoreResult<Vec<VisitedRegion>> {
            Ok(Vec::new())
        }
        fn delete_all(&self) -> StoreResult<usize> {
            Err(StoreError::Unavailable)
        }
        fn get_by_id(&self, _: i64) -> StoreResult<Option<VisitedRegion>> {
            Ok(None)
        }
        fn get_within_bounds(&self, _: &GeoBounds) -> StoreResult<Vec<VisitedRegion>> {
            Ok(Vec::new())
        }
        fn count(&self) -> StoreResult<u64> {
            Ok(0)
        }
    }

    #[test]
    fn test_first_fix_creates_region() {
        let tracker = tracker();
        let outcome = tracker.process_fix(&fix_at(41.0082, 28.9784, 0), 200).unwrap();
        assert!(matches!(outcome, TrackOutcome::Created { .. }));

        let region = tracker
            .store()
            .get_by_id(outcome.region_id())
            .unwrap()
            .unwrap();
        assert_eq!(region.visit_count, 1);
        assert_eq!(region.radius, 200);
        assert_eq!(region.timestamp_start, t0());
        assert_eq!(region.accuracy, Some(10.0));
        assert_eq!(region.geohash.as_deref().map(str::len), Some(7));
        assert_eq!(tracker.circle_count(), 1);
    }

    #[test]
    fn test_fix_within_radius_merges() {
        let tracker = tracker();
        let first = tracker.process_fix(&fix_at(41.0082, 28.9784, 0), 200).unwrap();
        // ~111m north
        let second = tracker.process_fix(&fix_at(41.0092, 28.9784, 60), 200).unwrap();

        assert_eq!(
            second,
            TrackOutcome::Merged {
                id: first.region_id(),
                visit_count: 2
            }
        );
        let region = tracker
            .store()
            .get_by_id(first.region_id())
            .unwrap()
            .unwrap();
        assert_eq!(region.timestamp_end, Some(t0() + Duration::seconds(60)));
        assert_eq!(tracker.circle_count(), 1);
    }

    #[test]
    fn test_distant_fixes_create_distinct_regions() {
        let tracker = tracker();
        tracker.process_fix(&fix_at(41.0082, 28.9784, 0), 200).unwrap();
        // ~555m north, more than twice the radius
        let outcome = tracker.process_fix(&fix_at(41.0132, 28.9784, 60), 200).unwrap();
        assert!(matches!(outcome, TrackOutcome::Created { .. }));
        assert_eq!(tracker.store().get_all().unwrap().len(), 2);
        assert_eq!(tracker.circle_count(), 2);
    }

    #[test]
    fn test_merges_into_nearest_region() {
        let tracker = tracker();
        let west = tracker.process_fix(&fix_at(41.0, 29.0, 0), 200).unwrap();
        // ~336m east, a separate region
        let east = tracker.process_fix(&fix_at(41.0, 29.004, 10), 200).unwrap();
        assert_ne!(west.region_id(), east.region_id());

        // Within 200m of both centers but closer to east
        let outcome = tracker.process_fix(&fix_at(41.0, 29.0022, 20), 200).unwrap();
        assert_eq!(outcome.region_id(), east.region_id());
    }

    #[test]
    fn test_merge_tolerance_overrides_radius() {
        let store = Arc::new(SqliteRegionStore::in_memory().unwrap());
        let tracker =
            ExplorationTracker::new(store, TrackerConfig::default().with_merge_tolerance(50.0));
        tracker.process_fix(&fix_at(41.0, 29.0, 0), 200).unwrap();
        // ~111m away: inside the radius but outside the tolerance
        let outcome = tracker.process_fix(&fix_at(41.001, 29.0, 10), 200).unwrap();
        assert!(matches!(outcome, TrackOutcome::Created { .. }));
    }

    #[test]
    fn test_unknown_accuracy_keeps_previous() {
        let tracker = tracker();
        let created = tracker.process_fix(&fix_at(41.0, 29.0, 0), 200).unwrap();
        let unknown = LocationFix::new(41.0001, 29.0, -1.0, t0() + Duration::seconds(30));
        tracker.process_fix(&unknown, 200).unwrap();

        let region = tracker
            .store()
            .get_by_id(created.region_id())
            .unwrap()
            .unwrap();
        assert_eq!(region.visit_count, 2);
        assert_eq!(region.accuracy, Some(10.0));
    }

    #[test]
    fn test_load_rebuilds_circles_oldest_first() {
        let store = Arc::new(SqliteRegionStore::in_memory().unwrap());
        let first = ExplorationTracker::with_defaults(store.clone());
        first.process_fix(&fix_at(41.0, 29.0, 0), 200).unwrap();
        first.process_fix(&fix_at(42.0, 29.0, 10), 200).unwrap();

        let second = ExplorationTracker::with_defaults(store);
        assert_eq!(second.load().unwrap(), 2);
        let circles = second.circles();
        assert_eq!(circles[0].latitude, 41.0);
        assert_eq!(circles[1].latitude, 42.0);
    }

    #[test]
    fn test_clear_all_empties_store_and_circles() {
        let tracker = tracker();
        tracker.process_fix(&fix_at(41.0, 29.0, 0), 200).unwrap();
        assert_eq!(tracker.clear_all().unwrap(), 1);
        assert_eq!(tracker.circle_count(), 0);
        assert!(tracker.store().get_all().unwrap().is_empty());
        assert_eq!(tracker.clear_all().unwrap(), 0);
    }

    #[test]
    fn test_write_failure_keeps_circles() {
        let tracker = ExplorationTracker::with_defaults(Arc::new(FailingWrites));
        tracker
            .circles
            .write()
            .upsert(ExploredCircle::new(41.0, 29.0, 200.0));
        let revision = tracker.revision();

        let result = tracker.process_fix(&fix_at(45.0, 29.0, 0), 200);
        assert!(matches!(result, Err(TrackerError::Store(StoreError::WriteFailed(_)))));
        assert_eq!(tracker.circle_count(), 1);
        assert_eq!(tracker.revision(), revision);

        assert!(tracker.clear_all().is_err());
        assert_eq!(tracker.circle_count(), 1);
    }

    #[test]
    fn test_snapshot_revision_advances() {
        let tracker = tracker();
        let before = tracker.snapshot();
        tracker.process_fix(&fix_at(41.0, 29.0, 0), 200).unwrap();
        let after = tracker.snapshot();
        assert!(after.revision > before.revision);
        assert_eq!(after.circles.len(), 1);
        assert!(after.circles[0].region_id.is_some());
    }
}
