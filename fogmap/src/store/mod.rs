//! Durable storage of visited regions.
//!
//! The [`RegionRepository`] trait is the seam between the exploration
//! tracker and persistence. [`SqliteRegionStore`] is the production
//! implementation.
//!
//! # Query semantics
//!
//! - Every sequence is ordered by `timestamp_start`, most recent first.
//! - Rows that cannot be parsed back into a [`VisitedRegion`] are skipped;
//!   the rest of the query still returns.
//! - `get_near` filters with a rectangle derived from the radius, not a
//!   circle. Callers needing exact distances filter the result again.
//!
//! # Example
//!
//! ```ignore
//! use fogmap::store::{RegionRepository, SqliteRegionStore};
//!
//! let store = SqliteRegionStore::open("regions.db");
//! let id = store.insert(&region)?;
//! let nearby = store.get_near(41.0082, 28.9784, 0.5)?;
//! ```

mod error;
mod schema;
mod sqlite;

pub use error::{StoreError, StoreResult};
pub use sqlite::SqliteRegionStore;

use crate::region::{GeoBounds, VisitedRegion};

/// Persistence interface for visited regions.
///
/// Implementations serialize all calls against their backing storage and
/// block the caller until the operation completes. `created_at` and
/// `updated_at` are always assigned by the implementation.
pub trait RegionRepository: Send + Sync {
    /// Persist a new region and return its assigned id.
    ///
    /// # Errors
    ///
    /// - `Constraint` if the region already has an id or violates an
    ///   invariant
    /// - `WriteFailed` if storage rejects the write
    /// - `Unavailable` if storage could not be opened
    fn insert(&self, region: &VisitedRegion) -> StoreResult<i64>;

    /// Overwrite the mutable fields of an existing region.
    ///
    /// Returns `Ok(false)` if no region has the given id.
    fn update(&self, region: &VisitedRegion) -> StoreResult<bool>;

    /// Every region, most recent first.
    fn get_all(&self) -> StoreResult<Vec<VisitedRegion>>;

    /// Regions inside the rectangle approximating `radius_km` around a point.
    fn get_near(&self, latitude: f64, longitude: f64, radius_km: f64)
        -> StoreResult<Vec<VisitedRegion>>;

    /// Remove every region and return how many were removed.
    fn delete_all(&self) -> StoreResult<usize>;

    /// Look up a single region.
    fn get_by_id(&self, id: i64) -> StoreResult<Option<VisitedRegion>>;

    /// Regions whose center lies within a geographic rectangle.
    fn get_within_bounds(&self, bounds: &GeoBounds) -> StoreResult<Vec<VisitedRegion>>;

    /// Number of stored rows, including any that fail to parse.
    fn count(&self) -> StoreResult<u64>;
}
