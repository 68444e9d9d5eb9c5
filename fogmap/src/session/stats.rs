//! Session counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Live counters updated by the session loop.
#[derive(Debug, Default)]
pub(super) struct SessionCounters {
    pub fixes_received: AtomicU64,
    pub fixes_dropped: AtomicU64,
    pub regions_created: AtomicU64,
    pub regions_merged: AtomicU64,
    pub camera_commands: AtomicU64,
    pub store_errors: AtomicU64,
}

impl SessionCounters {
    pub fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> SessionStats {
        SessionStats {
            fixes_received: self.fixes_received.load(Ordering::Relaxed),
            fixes_dropped: self.fixes_dropped.load(Ordering::Relaxed),
            regions_created: self.regions_created.load(Ordering::Relaxed),
            regions_merged: self.regions_merged.load(Ordering::Relaxed),
            camera_commands: self.camera_commands.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time session statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SessionStats {
    pub fixes_received: u64,
    /// Rejected by the fix filter (inaccurate or not moved).
    pub fixes_dropped: u64,
    pub regions_created: u64,
    pub regions_merged: u64,
    pub camera_commands: u64,
    /// Fixes whose region write failed.
    pub store_errors: u64,
}

impl SessionStats {
    /// Fixes that reached the tracker.
    pub fn fixes_accepted(&self) -> u64 {
        self.fixes_received.saturating_sub(self.fixes_dropped)
    }
}

impl std::fmt::Display for SessionStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} fixes ({} dropped), {} regions created, {} merged, {} camera moves, {} store errors",
            self.fixes_received,
            self.fixes_dropped,
            self.regions_created,
            self.regions_merged,
            self.camera_commands,
            self.store_errors
        )
    }
}
