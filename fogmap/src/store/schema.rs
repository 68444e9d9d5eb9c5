//! Database schema and row mapping for visited regions.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use rusqlite::{Connection, Row};

use crate::region::VisitedRegion;

/// Schema for the `visited_regions` table and its lookup indexes.
pub(crate) const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS visited_regions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    latitude REAL NOT NULL,
    longitude REAL NOT NULL,
    radius INTEGER DEFAULT 200,
    timestamp_start TEXT NOT NULL,
    timestamp_end TEXT,
    visit_count INTEGER DEFAULT 1,
    city TEXT,
    district TEXT,
    country TEXT,
    country_code TEXT,
    geohash TEXT,
    accuracy REAL,
    created_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at TEXT DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_visited_regions_location
ON visited_regions(latitude, longitude);

CREATE INDEX IF NOT EXISTS idx_visited_regions_geohash
ON visited_regions(geohash);

CREATE INDEX IF NOT EXISTS idx_visited_regions_timestamp
ON visited_regions(timestamp_start);

CREATE INDEX IF NOT EXISTS idx_visited_regions_country
ON visited_regions(country);
"#;

/// Column list shared by every SELECT, in [`region_from_row`] order.
pub(crate) const SELECT_COLUMNS: &str = "id, latitude, longitude, radius, timestamp_start, \
     timestamp_end, visit_count, city, district, country, country_code, geohash, accuracy, \
     created_at, updated_at";

/// Create the table and indexes if they do not exist.
pub(crate) fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    // In-memory databases report "memory" and ignore WAL
    let _mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")?;
    conn.execute_batch(SCHEMA_SQL)
}

/// Format a timestamp as fixed-width RFC 3339 UTC text.
///
/// Fixed width keeps lexical order equal to chronological order.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Parse stored timestamp text.
///
/// Accepts RFC 3339 and SQLite's `YYYY-MM-DD HH:MM:SS` form (UTC).
pub(crate) fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|naive| naive.and_utc())
}

/// Map a row to a region.
///
/// Returns `Ok(None)` for rows that are structurally present but carry an
/// unusable required value (missing or malformed start time).
pub(crate) fn region_from_row(row: &Row<'_>) -> rusqlite::Result<Option<VisitedRegion>> {
    let start_text: Option<String> = row.get(4)?;
    let Some(timestamp_start) = start_text.as_deref().and_then(parse_timestamp) else {
        return Ok(None);
    };

    let end_text: Option<String> = row.get(5)?;
    let created_text: Option<String> = row.get(13)?;
    let updated_text: Option<String> = row.get(14)?;

    let radius: Option<i64> = row.get(3)?;
    let visit_count: Option<i64> = row.get(6)?;

    Ok(Some(VisitedRegion {
        id: Some(row.get(0)?),
        latitude: row.get(1)?,
        longitude: row.get(2)?,
        radius: radius
            .and_then(|r| u32::try_from(r).ok())
            .unwrap_or(crate::region::DEFAULT_RADIUS_M),
        timestamp_start,
        timestamp_end: end_text.as_deref().and_then(parse_timestamp),
        visit_count: visit_count
            .and_then(|c| u32::try_from(c).ok())
            .unwrap_or(1),
        city: row.get(7)?,
        district: row.get(8)?,
        country: row.get(9)?,
        country_code: row.get(10)?,
        geohash: row.get(11)?,
        accuracy: row.get(12)?,
        created_at: created_text.as_deref().and_then(parse_timestamp),
        updated_at: updated_text.as_deref().and_then(parse_timestamp),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_format_timestamp_fixed_width() {
        let ts = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2024-05-01T12:00:00.000000000Z");

        let fine = ts + chrono::Duration::nanoseconds(123_456_789);
        assert_eq!(format_timestamp(&fine), "2024-05-01T12:00:00.123456789Z");
        assert_eq!(parse_timestamp(&format_timestamp(&fine)), Some(fine));
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let expected = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-05-01T12:00:00.000Z"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01T15:00:00+03:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-05-01 12:00:00"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        init_schema(&conn).unwrap();
        init_schema(&conn).unwrap();

        let count: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'index' AND tbl_name = 'visited_regions'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(count, 4);
    }
}
