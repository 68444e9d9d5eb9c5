//! Exploration Tracker
//!
//! Turns a stream of location fixes into visited regions and keeps the
//! live set of explored circles used to draw the fog overlay.
//!
//! # Pipeline
//!
//! ```text
//! LocationFix ──► FixFilter ──► ExplorationTracker ──► RegionRepository (persist)
//!                (accuracy,      (merge or create)  └─► ExploredCircleSet (memory)
//!                 1m debounce)
//! ```
//!
//! Duplicate fixes are absorbed twice over: the filter drops fixes that
//! have not moved, and the merge rule folds any fix within the merge radius
//! into the existing region instead of creating a new one.

mod exploration;
mod explored;
mod filter;

pub use exploration::{
    ExplorationTracker, ExploredSnapshot, TrackOutcome, TrackerConfig, TrackerError,
};
pub use explored::ExploredCircleSet;
pub use filter::{
    FixDecision, FixFilter, FixFilterConfig, DEFAULT_MAX_FIX_ACCURACY_M,
    DEFAULT_MIN_FIX_DISTANCE_M,
};
