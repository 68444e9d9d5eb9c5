//! Coordinate conversion module
//!
//! Provides great-circle distances, the rectangular bounding-box
//! approximation used by proximity queries, and conversions between
//! geographic coordinates (latitude/longitude) and Web Mercator projected
//! meters used by the overlay projector.

pub mod geohash;
mod types;

pub use types::{
    validate_lat_lon, CoordError, ProjectedPoint, MAX_LAT, MAX_LON, MAX_MERCATOR_LAT, MIN_LAT,
    MIN_LON,
};

use std::f64::consts::PI;

/// Mean Earth radius in meters, used for haversine distances.
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Equatorial radius of the WGS84 ellipsoid, used by Web Mercator.
pub const WEB_MERCATOR_RADIUS_M: f64 = 6_378_137.0;

/// Kilometers per degree of latitude used by the bounding-box approximation.
pub const KM_PER_DEGREE: f64 = 111.0;

/// Below this cosine the longitude delta is treated as unbounded.
const MIN_COS_LAT: f64 = 1e-9;

/// Great-circle distance between two coordinates in meters (haversine).
#[inline]
pub fn haversine_distance_m(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let phi1 = lat1.to_radians();
    let phi2 = lat2.to_radians();
    let dphi = (lat2 - lat1).to_radians();
    let dlambda = (lon2 - lon1).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());

    EARTH_RADIUS_M * c
}

/// Degree deltas of the rectangle that approximates a radius around a point.
///
/// Latitude delta is `radius_km / 111`; longitude delta is
/// `radius_km / (111 * cos(lat))`. Returns `None` for the longitude delta
/// when the latitude is close enough to a pole that the rectangle spans
/// every longitude.
///
/// This is a cheap filter, not a circle. It over-returns at the corners
/// of the rectangle.
pub fn bounding_box_deltas(lat: f64, radius_km: f64) -> (f64, Option<f64>) {
    let lat_delta = radius_km / KM_PER_DEGREE;
    let cos_lat = lat.to_radians().cos();

    if cos_lat.abs() < MIN_COS_LAT {
        return (lat_delta, None);
    }

    let lon_delta = radius_km / (KM_PER_DEGREE * cos_lat.abs());
    if !lon_delta.is_finite() || lon_delta >= 180.0 {
        (lat_delta, None)
    } else {
        (lat_delta, Some(lon_delta))
    }
}

/// Converts geographic coordinates to Web Mercator projected meters.
///
/// Latitude is clamped to the Mercator limit (±85.0511°) so polar inputs
/// still project to a finite point.
#[inline]
pub fn to_web_mercator(lat: f64, lon: f64) -> ProjectedPoint {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    let x = WEB_MERCATOR_RADIUS_M * lon.to_radians();
    let y = WEB_MERCATOR_RADIUS_M * (PI / 4.0 + lat.to_radians() / 2.0).tan().ln();
    ProjectedPoint { x, y }
}

/// Converts Web Mercator projected meters back to geographic coordinates.
#[inline]
pub fn from_web_mercator(point: ProjectedPoint) -> (f64, f64) {
    let lon = (point.x / WEB_MERCATOR_RADIUS_M).to_degrees();
    let lat = (2.0 * (point.y / WEB_MERCATOR_RADIUS_M).exp().atan() - PI / 2.0).to_degrees();
    (lat, lon)
}

/// Projected meters per ground meter at the given latitude.
///
/// Web Mercator stretches distances by `1 / cos(lat)`, so a circle of
/// fixed ground radius grows on the map as it moves away from the equator.
#[inline]
pub fn mercator_scale_factor(lat: f64) -> f64 {
    let lat = lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT);
    1.0 / lat.to_radians().cos()
}
