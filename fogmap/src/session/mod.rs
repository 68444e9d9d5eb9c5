//! Fog Session
//!
//! Runs the exploration pipeline against a live fix stream.
//!
//! ```text
//!                      ┌──────────────────┐
//! fix_tx ──(mpsc)────► │    FogSession    │ ──(mpsc)──► CameraCommand
//!                      │                  │
//! camera ──(watch)───► │ FixFilter        │
//! SharedSettings ────► │ CenteringPolicy  │
//!                      │ ExplorationTracker ──► RegionRepository
//!                      └──────────────────┘
//! ```
//!
//! The host owns both channel ends it talks through, so nothing here is a
//! process-wide singleton. Dropping the fix sender or cancelling the
//! session token ends the loop.

mod runner;
mod stats;

pub use runner::FogSession;
pub use stats::SessionStats;
