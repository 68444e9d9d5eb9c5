//! Fix filtering ahead of the tracker and centering policy.
//!
//! Drops fixes that are too inaccurate to trust and fixes that have not
//! moved from the previously accepted one.
//!
//! ```text
//! accuracy known AND accuracy > max_accuracy_m  -> TooInaccurate
//! distance(last accepted) <= min_distance_m      -> TooClose
//! otherwise                                      -> Accepted
//! ```

use crate::region::LocationFix;

/// Default maximum horizontal accuracy (meters) for an accepted fix.
pub const DEFAULT_MAX_FIX_ACCURACY_M: f64 = 65.0;

/// Fixes this close to the last accepted fix are debounced.
pub const DEFAULT_MIN_FIX_DISTANCE_M: f64 = 1.0;

/// Configuration for [`FixFilter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixFilterConfig {
    /// Fixes with a known accuracy worse than this are dropped.
    pub max_accuracy_m: f64,
    /// Fixes within this distance of the last accepted fix are dropped.
    pub min_distance_m: f64,
}

impl Default for FixFilterConfig {
    fn default() -> Self {
        Self {
            max_accuracy_m: DEFAULT_MAX_FIX_ACCURACY_M,
            min_distance_m: DEFAULT_MIN_FIX_DISTANCE_M,
        }
    }
}

/// Outcome of offering a fix to the filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixDecision {
    Accepted,
    TooInaccurate { accuracy_m: f64 },
    TooClose { distance_m: f64 },
}

impl FixDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, FixDecision::Accepted)
    }
}

/// Accuracy and distance debouncing for a fix stream.
#[derive(Debug, Default)]
pub struct FixFilter {
    config: FixFilterConfig,
    last_accepted: Option<LocationFix>,
}

impl FixFilter {
    pub fn new(config: FixFilterConfig) -> Self {
        Self {
            config,
            last_accepted: None,
        }
    }

    /// Change the accuracy threshold (a runtime setting).
    pub fn set_max_accuracy(&mut self, max_accuracy_m: f64) {
        self.config.max_accuracy_m = max_accuracy_m;
    }

    pub fn config(&self) -> &FixFilterConfig {
        &self.config
    }

    /// The most recent accepted fix.
    pub fn last_accepted(&self) -> Option<&LocationFix> {
        self.last_accepted.as_ref()
    }

    /// Decide whether a fix passes, recording it if it does.
    pub fn offer(&mut self, fix: &LocationFix) -> FixDecision {
        if let Some(accuracy_m) = fix.known_accuracy() {
            if accuracy_m > self.config.max_accuracy_m {
                return FixDecision::TooInaccurate { accuracy_m };
            }
        }

        if let Some(last) = &self.last_accepted {
            let distance_m = last.distance_to(fix);
            if distance_m <= self.config.min_distance_m {
                return FixDecision::TooClose { distance_m };
            }
        }

        self.last_accepted = Some(*fix);
        FixDecision::Accepted
    }

    /// Forget the last accepted fix.
    pub fn reset(&mut self) {
        self.last_accepted = None;
    }
}
