//! Camera centering state machine.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::coord;
use crate::region::{CoordinateSpan, GeoBounds, LocationFix};

/// Minimum distance between a fix and the viewport center before the
/// camera follows it.
pub const RECENTER_THRESHOLD_M: f64 = 10.0;

/// Span used when the camera is first centered on the user.
pub const DEFAULT_SPAN: CoordinateSpan = CoordinateSpan {
    latitude_delta: 0.01,
    longitude_delta: 0.01,
};

/// Where the policy currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum CenteringState {
    /// No fix has been centered yet.
    #[default]
    Uninitialized,
    /// The camera follows the user when auto-centering is on.
    Tracking,
    /// The user moved the map; fixes never move the camera.
    UserOverride,
}

impl std::fmt::Display for CenteringState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CenteringState::Uninitialized => write!(f, "uninitialized"),
            CenteringState::Tracking => write!(f, "tracking"),
            CenteringState::UserOverride => write!(f, "user override"),
        }
    }
}

/// Current camera position as reported by the map host.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum CameraPosition {
    /// The host positions the camera itself; its center is not known.
    Automatic,
    /// The camera shows this region.
    Region(GeoBounds),
}

/// Instruction for the map host to move the camera.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraCommand {
    /// New center as (latitude, longitude).
    pub center: (f64, f64),
    /// Explicit span, or `None` when the current span is kept.
    pub span: Option<CoordinateSpan>,
    pub preserve_span: bool,
    pub animated: bool,
}

impl CameraCommand {
    fn initial(fix: &LocationFix) -> Self {
        Self {
            center: (fix.latitude, fix.longitude),
            span: Some(DEFAULT_SPAN),
            preserve_span: false,
            animated: false,
        }
    }

    fn follow(fix: &LocationFix) -> Self {
        Self {
            center: (fix.latitude, fix.longitude),
            span: None,
            preserve_span: true,
            animated: true,
        }
    }
}

/// Decides, per accepted fix, whether the camera should move.
///
/// # Example
///
/// ```ignore
/// let mut policy = CenteringPolicy::new();
/// if let Some(cmd) = policy.on_fix(&fix, Some(&camera), settings.auto_map_centering) {
///     host.move_camera(cmd);
/// }
/// ```
#[derive(Debug, Default)]
pub struct CenteringPolicy {
    state: CenteringState,
    last_known: Option<LocationFix>,
}

impl CenteringPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CenteringState {
        self.state
    }

    /// Most recent fix seen, whether or not it moved the camera.
    pub fn last_known_location(&self) -> Option<&LocationFix> {
        self.last_known.as_ref()
    }

    /// Handle a fix and return the camera command to issue, if any.
    ///
    /// Without a camera nothing happens and the state is left alone, so the
    /// first fix after the camera appears still gets the initial centering.
    pub fn on_fix(
        &mut self,
        fix: &LocationFix,
        camera: Option<&CameraPosition>,
        auto_centering: bool,
    ) -> Option<CameraCommand> {
        let camera = camera?;
        self.last_known = Some(*fix);

        match self.state {
            CenteringState::Uninitialized => {
                self.state = CenteringState::Tracking;
                debug!(
                    lat = fix.latitude,
                    lon = fix.longitude,
                    "Initial centering on user location"
                );
                Some(CameraCommand::initial(fix))
            }
            CenteringState::Tracking => {
                if !auto_centering {
                    return None;
                }
                match camera {
                    CameraPosition::Automatic => Some(CameraCommand::follow(fix)),
                    CameraPosition::Region(bounds) => {
                        let (center_lat, center_lon) = bounds.center();
                        let offset_m = coord::haversine_distance_m(
                            center_lat,
                            center_lon,
                            fix.latitude,
                            fix.longitude,
                        );
                        if offset_m > RECENTER_THRESHOLD_M {
                            debug!(offset_m = format!("{:.1}", offset_m), "Recentering camera");
                            Some(CameraCommand::follow(fix))
                        } else {
                            None
                        }
                    }
                }
            }
            CenteringState::UserOverride => None,
        }
    }

    /// The user panned or zoomed the map by hand.
    ///
    /// Ignored before the first centering so the initial recenter still
    /// happens.
    pub fn user_panned(&mut self) {
        if self.state == CenteringState::Tracking {
            debug!("User took over the camera");
            self.state = CenteringState::UserOverride;
        }
    }

    /// Go back to following the user.
    pub fn resume_tracking(&mut self) {
        if self.state == CenteringState::UserOverride {
            debug!("Resuming camera tracking");
            self.state = CenteringState::Tracking;
        }
    }

    /// Forget everything; the next fix recenters from scratch.
    pub fn reset(&mut self) {
        self.state = CenteringState::Uninitialized;
        self.last_known = None;
    }
}
