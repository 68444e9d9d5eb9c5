//! Centering Policy
//!
//! Decides when the map camera should follow the user.
//!
//! ```text
//!                first fix (camera known)
//! Uninitialized ─────────────────────────► Tracking ◄──┐
//!                                             │        │ resume_tracking()
//!                                user_panned()│        │
//!                                             ▼        │
//!                                        UserOverride ─┘
//! ```
//!
//! The first fix always recenters with a fixed span. After that, the camera
//! only follows when auto-centering is enabled and the user has drifted
//! more than [`RECENTER_THRESHOLD_M`] from the viewport center.

mod policy;

pub use policy::{
    CameraCommand, CameraPosition, CenteringPolicy, CenteringState, DEFAULT_SPAN,
    RECENTER_THRESHOLD_M,
};
