//! Runtime map settings shared between the host and the session.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::region::DEFAULT_RADIUS_M;
use crate::tracker::DEFAULT_MAX_FIX_ACCURACY_M;

/// Settings the user may change while a session is running.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapSettings {
    /// Radius of newly created regions, in meters.
    pub exploration_radius: u32,
    /// Whether the camera follows the user after the first fix.
    pub auto_map_centering: bool,
    /// Fixes with a worse reported accuracy are dropped, in meters.
    pub max_fix_accuracy_m: f64,
}

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            exploration_radius: DEFAULT_RADIUS_M,
            auto_map_centering: true,
            max_fix_accuracy_m: DEFAULT_MAX_FIX_ACCURACY_M,
        }
    }
}

impl MapSettings {
    pub fn with_exploration_radius(mut self, meters: u32) -> Self {
        self.exploration_radius = meters;
        self
    }

    pub fn with_auto_map_centering(mut self, enabled: bool) -> Self {
        self.auto_map_centering = enabled;
        self
    }

    pub fn with_max_fix_accuracy(mut self, meters: f64) -> Self {
        self.max_fix_accuracy_m = meters;
        self
    }

    /// Wrap in a lock for sharing with a running session.
    pub fn into_shared(self) -> SharedSettings {
        Arc::new(RwLock::new(self))
    }
}

/// Settings handle read by the session on every fix.
pub type SharedSettings = Arc<RwLock<MapSettings>>;
