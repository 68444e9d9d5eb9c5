//! SQLite-backed region store.

use std::path::Path;

use chrono::Utc;
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, ToSql};
use tracing::{debug, error, info};

use super::error::{StoreError, StoreResult};
use super::schema::{self, format_timestamp, region_from_row, SELECT_COLUMNS};
use super::RegionRepository;
use crate::coord;
use crate::region::{GeoBounds, VisitedRegion};

/// Longitude filter for rectangular queries.
#[derive(Debug, Clone, Copy, PartialEq)]
enum LonRange {
    /// Every longitude matches.
    All,
    /// `min <= lon <= max`.
    Between(f64, f64),
    /// Window crossing the antimeridian: `lon >= east_of OR lon <= west_of`.
    Wrapped { east_of: f64, west_of: f64 },
}

impl LonRange {
    fn around(lon: f64, delta: Option<f64>) -> Self {
        let Some(delta) = delta else {
            return LonRange::All;
        };
        let min = lon - delta;
        let max = lon + delta;
        if min < coord::MIN_LON {
            LonRange::Wrapped {
                east_of: min + 360.0,
                west_of: max,
            }
        } else if max > coord::MAX_LON {
            LonRange::Wrapped {
                east_of: min,
                west_of: max - 360.0,
            }
        } else {
            LonRange::Between(min, max)
        }
    }
}

/// Whether a row error came from decoding a column rather than stepping
/// the query. Only these mark a row as unparseable.
fn is_row_conversion_error(e: &rusqlite::Error) -> bool {
    matches!(
        e,
        rusqlite::Error::FromSqlConversionFailure(..)
            | rusqlite::Error::InvalidColumnType(..)
            | rusqlite::Error::IntegralValueOutOfRange(..)
    )
}

/// Durable store of visited regions in a single SQLite database.
///
/// All operations run on one connection behind a mutex, so calls from
/// any thread are serialized and never interleave partial writes. Callers
/// block until earlier operations finish.
///
/// A store whose database could not be opened stays in the unavailable
/// state: every operation returns [`StoreError::Unavailable`] without
/// touching storage.
pub struct SqliteRegionStore {
    conn: Option<Mutex<Connection>>,
    path: String,
}

impl std::fmt::Debug for SqliteRegionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRegionStore")
            .field("path", &self.path)
            .field("available", &self.is_available())
            .finish()
    }
}

impl SqliteRegionStore {
    /// Open the store, reporting failure once and degrading to unavailable.
    pub fn open(path: impl AsRef<Path>) -> Self {
        let path_str = path.as_ref().display().to_string();
        match Self::try_open(path) {
            Ok(store) => store,
            Err(e) => {
                error!(path = %path_str, error = %e, "Region store unavailable");
                Self {
                    conn: None,
                    path: path_str,
                }
            }
        }
    }

    /// Open the store, returning the error instead of degrading.
    pub fn try_open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path_str = path.as_ref().display().to_string();

        if let Some(parent) = path.as_ref().parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                // Let SQLite report the failure if this does not work
                let _ = std::fs::create_dir_all(parent);
            }
        }

        let conn = Connection::open(path.as_ref()).map_err(|source| StoreError::Open {
            path: path_str.clone(),
            source,
        })?;
        Self::from_connection(conn, path_str)
    }

    /// Create an in-memory store (for testing).
    pub fn in_memory() -> StoreResult<Self> {
        let conn = Connection::open_in_memory().map_err(|source| StoreError::Open {
            path: ":memory:".to_string(),
            source,
        })?;
        Self::from_connection(conn, ":memory:".to_string())
    }

    fn from_connection(conn: Connection, path: String) -> StoreResult<Self> {
        schema::init_schema(&conn).map_err(|source| StoreError::Open {
            path: path.clone(),
            source,
        })?;
        info!(path = %path, "Region store opened");
        Ok(Self {
            conn: Some(Mutex::new(conn)),
            path,
        })
    }

    /// Whether the backing storage was opened successfully.
    pub fn is_available(&self) -> bool {
        self.conn.is_some()
    }

    /// Path of the backing database.
    pub fn path(&self) -> &str {
        &self.path
    }

    fn with_conn<T>(&self, f: impl FnOnce(&Connection) -> StoreResult<T>) -> StoreResult<T> {
        let conn = self.conn.as_ref().ok_or(StoreError::Unavailable)?;
        let guard = conn.lock();
        f(&guard)
    }

    /// Run a SELECT and collect parseable rows, skipping the rest.
    fn query_regions(
        conn: &Connection,
        sql: &str,
        args: &[&dyn ToSql],
    ) -> StoreResult<Vec<VisitedRegion>> {
        let mut stmt = conn.prepare(sql).map_err(StoreError::QueryFailed)?;
        let rows = stmt
            .query_map(args, region_from_row)
            .map_err(StoreError::QueryFailed)?;

        let mut regions = Vec::new();
        let mut skipped = 0usize;
        for row in rows {
            match row {
                Ok(Some(region)) => regions.push(region),
                Ok(None) => skipped += 1,
                Err(e) if is_row_conversion_error(&e) => skipped += 1,
                Err(e) => return Err(StoreError::QueryFailed(e)),
            }
        }

        if skipped > 0 {
            debug!(rows_skipped = skipped, "Skipped unparseable region rows");
        }
        Ok(regions)
    }

    fn query_rect(
        &self,
        min_lat: f64,
        max_lat: f64,
        lon: LonRange,
    ) -> StoreResult<Vec<VisitedRegion>> {
        self.with_conn(|conn| match lon {
            LonRange::All => Self::query_regions(
                conn,
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM visited_regions \
                     WHERE latitude BETWEEN ?1 AND ?2 \
                     ORDER BY timestamp_start DESC"
                ),
                &[&min_lat, &max_lat],
            ),
            LonRange::Between(min_lon, max_lon) => Self::query_regions(
                conn,
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM visited_regions \
                     WHERE latitude BETWEEN ?1 AND ?2 AND longitude BETWEEN ?3 AND ?4 \
                     ORDER BY timestamp_start DESC"
                ),
                &[&min_lat, &max_lat, &min_lon, &max_lon],
            ),
            LonRange::Wrapped { east_of, west_of } => Self::query_regions(
                conn,
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM visited_regions \
                     WHERE latitude BETWEEN ?1 AND ?2 AND (longitude >= ?3 OR longitude <= ?4) \
                     ORDER BY timestamp_start DESC"
                ),
                &[&min_lat, &max_lat, &east_of, &west_of],
            ),
        })
    }
}

impl RegionRepository for SqliteRegionStore {
    fn insert(&self, region: &VisitedRegion) -> StoreResult<i64> {
        if region.id.is_some() {
            return Err(StoreError::Constraint(
                "region already has an id".to_string(),
            ));
        }
        region.validate()?;

        self.with_conn(|conn| {
            let now = format_timestamp(&Utc::now());
            conn.execute(
                "INSERT INTO visited_regions (
                    latitude, longitude, radius, timestamp_start, timestamp_end, visit_count,
                    city, district, country, country_code, geohash, accuracy,
                    created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)",
                params![
                    region.latitude,
                    region.longitude,
                    region.radius,
                    format_timestamp(&region.timestamp_start),
                    region.timestamp_end.as_ref().map(format_timestamp),
                    region.visit_count,
                    region.city,
                    region.district,
                    region.country,
                    region.country_code,
                    region.geohash,
                    region.accuracy,
                    now,
                ],
            )
            .map_err(StoreError::WriteFailed)?;

            let id = conn.last_insert_rowid();
            debug!(id, lat = region.latitude, lon = region.longitude, "Inserted region");
            Ok(id)
        })
    }

    fn update(&self, region: &VisitedRegion) -> StoreResult<bool> {
        let Some(id) = region.id else {
            return Err(StoreError::Constraint(
                "cannot update a region without an id".to_string(),
            ));
        };
        region.validate()?;

        self.with_conn(|conn| {
            let changed = conn
                .execute(
                    "UPDATE visited_regions SET
                        latitude = ?1, longitude = ?2, radius = ?3,
                        timestamp_start = ?4, timestamp_end = ?5, visit_count = ?6,
                        city = ?7, district = ?8, country = ?9, country_code = ?10,
                        geohash = ?11, accuracy = ?12, updated_at = ?13
                     WHERE id = ?14",
                    params![
                        region.latitude,
                        region.longitude,
                        region.radius,
                        format_timestamp(&region.timestamp_start),
                        region.timestamp_end.as_ref().map(format_timestamp),
                        region.visit_count,
                        region.city,
                        region.district,
                        region.country,
                        region.country_code,
                        region.geohash,
                        region.accuracy,
                        format_timestamp(&Utc::now()),
                        id,
                    ],
                )
                .map_err(StoreError::WriteFailed)?;

            if changed == 0 {
                debug!(id, "Update matched no region");
            }
            Ok(changed > 0)
        })
    }

    fn get_all(&self) -> StoreResult<Vec<VisitedRegion>> {
        self.with_conn(|conn| {
            Self::query_regions(
                conn,
                &format!(
                    "SELECT {SELECT_COLUMNS} FROM visited_regions ORDER BY timestamp_start DESC"
                ),
                &[],
            )
        })
    }

    fn get_near(
        &self,
        latitude: f64,
        longitude: f64,
        radius_km: f64,
    ) -> StoreResult<Vec<VisitedRegion>> {
        let (lat_delta, lon_delta) = coord::bounding_box_deltas(latitude, radius_km);
        self.query_rect(
            latitude - lat_delta,
            latitude + lat_delta,
            LonRange::around(longitude, lon_delta),
        )
    }

    fn delete_all(&self) -> StoreResult<usize> {
        self.with_conn(|conn| {
            let removed = conn
                .execute("DELETE FROM visited_regions", [])
                .map_err(StoreError::WriteFailed)?;
            info!(removed, "Deleted all visited regions");
            Ok(removed)
        })
    }

    fn get_by_id(&self, id: i64) -> StoreResult<Option<VisitedRegion>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    &format!("SELECT {SELECT_COLUMNS} FROM visited_regions WHERE id = ?1"),
                    params![id],
                    region_from_row,
                )
                .optional()
                .map_err(StoreError::QueryFailed)?;
            Ok(row.flatten())
        })
    }

    fn get_within_bounds(&self, bounds: &GeoBounds) -> StoreResult<Vec<VisitedRegion>> {
        self.query_rect(
            bounds.min_lat,
            bounds.max_lat,
            LonRange::Between(bounds.min_lon, bounds.max_lon),
        )
    }

    fn count(&self) -> StoreResult<u64> {
        self.with_conn(|conn| {
            let count: i64 = conn
                .query_row("SELECT COUNT(*) FROM visited_regions", [], |row| row.get(0))
                .map_err(StoreError::QueryFailed)?;
            Ok(count.max(0) as u64)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Duration, TimeZone};

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn store() -> SqliteRegionStore {
        SqliteRegionStore::in_memory().unwrap()
    }

    fn region_at(lat: f64, lon: f64, start: DateTime<Utc>) -> VisitedRegion {
        VisitedRegion::new(lat, lon, 200, start)
    }

    #[test]
    fn test_insert_assigns_ids() {
        let store = store();
        let a = store.insert(&region_at(41.0, 29.0, t0())).unwrap();
        let b = store.insert(&region_at(42.0, 29.0, t0())).unwrap();
        assert_ne!(a, b);
        assert_eq!(store.count().unwrap(), 2);
    }

    #[test]
    fn test_insert_rejects_existing_id() {
        let store = store();
        let mut region = region_at(41.0, 29.0, t0());
        region.id = Some(5);
        assert!(matches!(
            store.insert(&region),
            Err(StoreError::Constraint(_))
        ));
    }

    #[test]
    fn test_insert_rejects_invalid_region() {
        let store = store();
        let region = VisitedRegion::new(120.0, 29.0, 200, t0());
        assert!(matches!(
            store.insert(&region),
            Err(StoreError::Constraint(_))
        ));
        assert_eq!(store.count().unwrap(), 0);
    }

    #[test]
    fn test_round_trip_preserves_fields() {
        let store = store();
        let mut region = region_at(41.0082, 28.9784, t0())
            .with_accuracy(Some(12.5))
            .with_geohash("sxk9");
        region.timestamp_end = Some(t0() + Duration::minutes(5));
        region.visit_count = 3;
        region.city = Some("Istanbul".to_string());
        region.district = Some("Fatih".to_string());
        region.country = Some("Türkiye".to_string());
        region.country_code = Some("TR".to_string());

        let before = Utc::now() - Duration::seconds(1);
        let id = store.insert(&region).unwrap();

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 1);
        let stored = &all[0];

        assert_eq!(stored.id, Some(id));
        let created = stored.created_at.expect("created_at set by store");
        assert!(created >= before);
        assert_eq!(stored.created_at, stored.updated_at);

        let mut expected = region.clone();
        expected.id = Some(id);
        expected.created_at = stored.created_at;
        expected.updated_at = stored.updated_at;
        assert_eq!(stored, &expected);
    }

    #[test]
    fn test_update_overwrites_and_keeps_created_at() {
        let store = store();
        let id = store.insert(&region_at(41.0, 29.0, t0())).unwrap();
        let mut region = store.get_by_id(id).unwrap().unwrap();
        let created = region.created_at;

        region.record_visit(t0() + Duration::seconds(60), Some(5.0));
        region.created_at = None;
        assert!(store.update(&region).unwrap());

        let stored = store.get_by_id(id).unwrap().unwrap();
        assert_eq!(stored.visit_count, 2);
        assert_eq!(stored.timestamp_end, Some(t0() + Duration::seconds(60)));
        assert_eq!(stored.accuracy, Some(5.0));
        assert_eq!(stored.created_at, created);
        assert!(stored.updated_at >= created);
    }

    #[test]
    fn test_update_unknown_id_returns_false() {
        let store = store();
        let mut region = region_at(41.0, 29.0, t0());
        region.id = Some(999);
        assert!(!store.update(&region).unwrap());
    }

    #[test]
    fn test_update_without_id_is_constraint_error() {
        let store = store();
        assert!(matches!(
            store.update(&region_at(41.0, 29.0, t0())),
            Err(StoreError::Constraint(_))
        ));
    }

    #[test]
    fn test_get_all_orders_by_start_descending() {
        let store = store();
        for offset in [3, 1, 4, 0, 2] {
            store
                .insert(&region_at(41.0 + offset as f64 * 0.01, 29.0, t0() + Duration::hours(offset)))
                .unwrap();
        }

        let all = store.get_all().unwrap();
        assert_eq!(all.len(), 5);
        for pair in all.windows(2) {
            assert!(pair[0].timestamp_start > pair[1].timestamp_start);
        }
    }

    #[test]
    fn test_get_all_empty() {
        assert!(store().get_all().unwrap().is_empty());
    }

    #[test]
    fn test_get_near_bounding_box() {
        let store = store();
        let radius_km = 1.0;
        let (dlat, dlon) = coord::bounding_box_deltas(41.0, radius_km);
        let dlon = dlon.unwrap();

        // Inside the rectangle, including near its corner
        store.insert(&region_at(41.0, 29.0, t0())).unwrap();
        store
            .insert(&region_at(41.0 + dlat * 0.9, 29.0 + dlon * 0.9, t0()))
            .unwrap();
        // Clearly outside: twice the delta away
        store
            .insert(&region_at(41.0 + dlat * 2.0, 29.0, t0()))
            .unwrap();
        store
            .insert(&region_at(41.0, 29.0 - dlon * 2.0, t0()))
            .unwrap();

        let near = store.get_near(41.0, 29.0, radius_km).unwrap();
        assert_eq!(near.len(), 2);
        assert!(near
            .iter()
            .all(|r| (r.latitude - 41.0).abs() <= dlat && (r.longitude - 29.0).abs() <= dlon));
    }

    #[test]
    fn test_get_near_across_antimeridian() {
        let store = store();
        store.insert(&region_at(0.0, 179.999, t0())).unwrap();
        store.insert(&region_at(0.0, -179.999, t0())).unwrap();
        store.insert(&region_at(0.0, 0.0, t0())).unwrap();

        let near = store.get_near(0.0, 179.9995, 1.0).unwrap();
        assert_eq!(near.len(), 2);
    }

    #[test]
    fn test_get_near_at_pole_spans_all_longitudes() {
        let store = store();
        store.insert(&region_at(89.9999, 10.0, t0())).unwrap();
        store.insert(&region_at(89.9999, -170.0, t0())).unwrap();

        let near = store.get_near(90.0, 0.0, 1.0).unwrap();
        assert_eq!(near.len(), 2);
    }

    #[test]
    fn test_get_within_bounds() {
        let store = store();
        store.insert(&region_at(41.0, 29.0, t0())).unwrap();
        store.insert(&region_at(45.0, 29.0, t0())).unwrap();

        let bounds = GeoBounds::new(40.0, 42.0, 28.0, 30.0);
        let inside = store.get_within_bounds(&bounds).unwrap();
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].latitude, 41.0);
    }

    #[test]
    fn test_delete_all_is_idempotent() {
        let store = store();
        store.insert(&region_at(41.0, 29.0, t0())).unwrap();
        store.insert(&region_at(42.0, 29.0, t0())).unwrap();

        assert_eq!(store.delete_all().unwrap(), 2);
        assert!(store.get_all().unwrap().is_empty());
        assert_eq!(store.delete_all().unwrap(), 0);
    }

    #[test]
    fn test_malformed_rows_are_skipped() {
        let store = store();
        store.insert(&region_at(41.0, 29.0, t0())).unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO visited_regions (latitude, longitude, timestamp_start)
                     VALUES (41.0001, 29.0001, 'not a timestamp')",
                    [],
                )
                .map_err(StoreError::WriteFailed)?;
                Ok(())
            })
            .unwrap();

        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.get_all().unwrap().len(), 1);
        assert_eq!(store.get_near(41.0, 29.0, 1.0).unwrap().len(), 1);
    }

    #[test]
    fn test_unavailable_store_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be opened as a database file
        let store = SqliteRegionStore::open(dir.path());
        assert!(!store.is_available());

        assert!(matches!(store.get_all(), Err(StoreError::Unavailable)));
        assert!(matches!(
            store.insert(&region_at(41.0, 29.0, t0())),
            Err(StoreError::Unavailable)
        ));
        assert!(matches!(store.delete_all(), Err(StoreError::Unavailable)));
    }

    #[test]
    fn test_open_below_regular_file_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let store = SqliteRegionStore::open(blocker.join("regions.db"));
        assert!(!store.is_available());
        assert!(format!("{:?}", store).contains("regions.db"));
        assert!(matches!(store.count(), Err(StoreError::Unavailable)));
    }

    #[test]
    fn test_sub_millisecond_timestamps_round_trip() {
        let store = store();
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
            + Duration::nanoseconds(123_456_000);
        let end = start + Duration::nanoseconds(60_000_000_789);
        let mut region = region_at(41.0082, 28.9784, start);
        region.timestamp_end = Some(end);

        let id = store.insert(&region).unwrap();
        let stored = store.get_by_id(id).unwrap().unwrap();
        assert_eq!(stored.timestamp_start, start);
        assert_eq!(stored.timestamp_end, Some(end));

        let mut expected = region.clone();
        expected.id = Some(id);
        expected.created_at = stored.created_at;
        expected.updated_at = stored.updated_at;
        assert_eq!(stored, expected);
    }

    #[test]
    fn test_sub_millisecond_order_is_chronological() {
        let store = store();
        let base = t0() + Duration::nanoseconds(500);
        store.insert(&region_at(41.0, 29.0, base)).unwrap();
        store
            .insert(&region_at(41.01, 29.0, base + Duration::nanoseconds(1)))
            .unwrap();

        let all = store.get_all().unwrap();
        assert_eq!(all[0].timestamp_start, base + Duration::nanoseconds(1));
        assert_eq!(all[1].timestamp_start, base);
    }

    #[test]
    fn test_only_conversion_errors_mark_rows_unparseable() {
        use rusqlite::types::Type;

        assert!(is_row_conversion_error(&rusqlite::Error::InvalidColumnType(
            3,
            "radius".to_string(),
            Type::Text
        )));
        assert!(is_row_conversion_error(
            &rusqlite::Error::IntegralValueOutOfRange(6, i64::MAX)
        ));
        assert!(is_row_conversion_error(
            &rusqlite::Error::FromSqlConversionFailure(
                1,
                Type::Blob,
                "bad latitude".into()
            )
        ));

        assert!(!is_row_conversion_error(&rusqlite::Error::QueryReturnedNoRows));
        assert!(!is_row_conversion_error(&rusqlite::Error::SqliteFailure(
            rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
            Some("database is locked".to_string())
        )));
    }

    #[test]
    fn test_undecodable_column_row_is_skipped() {
        let store = store();
        store.insert(&region_at(41.0, 29.0, t0())).unwrap();
        store
            .with_conn(|conn| {
                conn.execute(
                    "INSERT INTO visited_regions (latitude, longitude, timestamp_start)
                     VALUES ('north', 29.0001, '2024-05-01T12:00:00Z')",
                    [],
                )
                .map_err(StoreError::WriteFailed)?;
                Ok(())
            })
            .unwrap();

        assert_eq!(store.count().unwrap(), 2);
        assert_eq!(store.get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("regions.db");

        {
            let store = SqliteRegionStore::try_open(&path).unwrap();
            store.insert(&region_at(41.0, 29.0, t0())).unwrap();
        }

        let store = SqliteRegionStore::try_open(&path).unwrap();
        assert_eq!(store.get_all().unwrap().len(), 1);
    }

    #[test]
    fn test_lon_range_around() {
        assert_eq!(LonRange::around(0.0, None), LonRange::All);
        assert_eq!(LonRange::around(10.0, Some(1.0)), LonRange::Between(9.0, 11.0));
        assert_eq!(
            LonRange::around(179.5, Some(1.0)),
            LonRange::Wrapped {
                east_of: 178.5,
                west_of: -179.5
            }
        );
    }
}
