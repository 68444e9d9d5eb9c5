//! Per-frame reuse of projected ellipses.

use super::projector::{project_visible, RevealEllipse};
use super::viewport::Viewport;
use crate::tracker::ExploredSnapshot;

/// Reuses the last projection while neither the circle set nor the
/// viewport has changed.
///
/// Lets the host ask for ellipses on every frame while the projection only
/// reruns after a region mutation or a pan/zoom.
#[derive(Debug, Default)]
pub struct OverlayFrameCache {
    key: Option<(u64, Viewport)>,
    ellipses: Vec<RevealEllipse>,
    projections: u64,
}

impl OverlayFrameCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Visible ellipses for the snapshot and viewport.
    pub fn ellipses(&mut self, snapshot: &ExploredSnapshot, viewport: &Viewport) -> &[RevealEllipse] {
        let key = (snapshot.revision, *viewport);
        if self.key.as_ref() != Some(&key) {
            self.ellipses = project_visible(&snapshot.circles, viewport);
            self.key = Some(key);
            self.projections += 1;
        }
        &self.ellipses
    }

    /// How many times the projection actually ran.
    pub fn projections(&self) -> u64 {
        self.projections
    }

    /// Force the next call to reproject.
    pub fn invalidate(&mut self) {
        self.key = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::{ExploredCircle, GeoBounds};

    fn snapshot(revision: u64, circles: Vec<ExploredCircle>) -> ExploredSnapshot {
        ExploredSnapshot { revision, circles }
    }

    #[test]
    fn test_reuses_projection_until_change() {
        let viewport = Viewport::fit(GeoBounds::new(40.99, 41.03, 28.95, 29.0), 800.0, 800.0).unwrap();
        let snap = snapshot(1, vec![ExploredCircle::new(41.0, 28.96, 200.0)]);
        let mut cache = OverlayFrameCache::new();

        assert_eq!(cache.ellipses(&snap, &viewport).len(), 1);
        assert_eq!(cache.ellipses(&snap, &viewport).len(), 1);
        assert_eq!(cache.projections(), 1);

        let changed = snapshot(
            2,
            vec![
                ExploredCircle::new(41.0, 28.96, 200.0),
                ExploredCircle::new(41.02, 28.99, 200.0),
            ],
        );
        assert_eq!(cache.ellipses(&changed, &viewport).len(), 2);
        assert_eq!(cache.projections(), 2);

        let panned = Viewport::fit(GeoBounds::new(41.0, 41.04, 28.95, 29.0), 800.0, 800.0).unwrap();
        cache.ellipses(&changed, &panned);
        assert_eq!(cache.projections(), 3);

        cache.invalidate();
        cache.ellipses(&changed, &panned);
        assert_eq!(cache.projections(), 4);
    }
}
