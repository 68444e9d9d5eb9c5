//! Visited-region data model.
//!
//! Types here are shared by the store, the tracker, the overlay projector
//! and the centering policy.

mod bounds;
mod model;

pub use bounds::{CoordinateSpan, GeoBounds};
pub use model::{
    ExploredCircle, LocationFix, RegionError, VisitedRegion, DEFAULT_RADIUS_M,
};
