//! The fix-processing loop.

use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::stats::{SessionCounters, SessionStats};
use crate::centering::{CameraCommand, CameraPosition, CenteringPolicy, CenteringState};
use crate::config::SharedSettings;
use crate::region::LocationFix;
use crate::tracker::{
    ExplorationTracker, FixDecision, FixFilter, FixFilterConfig, TrackOutcome, TrackerError,
};

/// Per-session state touched only between awaits.
#[derive(Debug)]
struct SessionState {
    filter: FixFilter,
    policy: CenteringPolicy,
}

/// Connects a fix stream to the tracker and the centering policy.
///
/// Fixes are handled one at a time in arrival order. For each accepted fix
/// the camera decision is made first, then the region write runs on the
/// blocking pool.
///
/// # Example
///
/// ```ignore
/// let (fix_tx, fix_rx) = mpsc::unbounded_channel();
/// let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
/// let (_camera_tx, camera_rx) = watch::channel(Some(CameraPosition::Automatic));
///
/// let session = Arc::new(FogSession::new(tracker, settings, camera_rx, cmd_tx));
/// let handle = Arc::clone(&session).start(fix_rx);
///
/// fix_tx.send(fix)?;
/// ```
pub struct FogSession {
    tracker: Arc<ExplorationTracker>,
    settings: SharedSettings,
    camera: watch::Receiver<Option<CameraPosition>>,
    commands: mpsc::UnboundedSender<CameraCommand>,
    shutdown: CancellationToken,
    state: Mutex<SessionState>,
    counters: SessionCounters,
}

impl FogSession {
    pub fn new(
        tracker: Arc<ExplorationTracker>,
        settings: SharedSettings,
        camera: watch::Receiver<Option<CameraPosition>>,
        commands: mpsc::UnboundedSender<CameraCommand>,
    ) -> Self {
        let max_accuracy_m = settings.read().max_fix_accuracy_m;
        let filter_config = FixFilterConfig {
            max_accuracy_m,
            ..FixFilterConfig::default()
        };
        Self {
            tracker,
            settings,
            camera,
            commands,
            shutdown: CancellationToken::new(),
            state: Mutex::new(SessionState {
                filter: FixFilter::new(filter_config),
                policy: CenteringPolicy::new(),
            }),
            counters: SessionCounters::default(),
        }
    }

    /// Use an externally owned cancellation token.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn tracker(&self) -> &Arc<ExplorationTracker> {
        &self.tracker
    }

    pub fn settings(&self) -> &SharedSettings {
        &self.settings
    }

    /// Token that stops the loop when cancelled.
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    pub fn stats(&self) -> SessionStats {
        self.counters.snapshot()
    }

    pub fn centering_state(&self) -> CenteringState {
        self.state.lock().policy.state()
    }

    pub fn last_known_location(&self) -> Option<LocationFix> {
        self.state.lock().policy.last_known_location().copied()
    }

    /// The user moved the map by hand; stop following.
    pub fn user_panned(&self) {
        self.state.lock().policy.user_panned();
    }

    /// Resume following the user.
    pub fn resume_tracking(&self) {
        self.state.lock().policy.resume_tracking();
    }

    /// Delete all explored regions.
    ///
    /// The debounce anchor is reset too, so the next fix starts a fresh
    /// region even if the user has not moved.
    pub async fn clear_history(&self) -> Result<usize, TrackerError> {
        let tracker = Arc::clone(&self.tracker);
        let removed = tokio::task::spawn_blocking(move || tracker.clear_all())
            .await
            .map_err(|e| TrackerError::Join(e.to_string()))??;
        self.state.lock().filter.reset();
        info!(removed, "Exploration history cleared");
        Ok(removed)
    }

    /// Spawn the processing loop.
    ///
    /// Loads persisted regions first, then handles fixes until the sender
    /// is dropped or the session is cancelled. A fix already being written
    /// when cancellation arrives is finished first.
    pub fn start(self: Arc<Self>, mut fixes: mpsc::UnboundedReceiver<LocationFix>) -> JoinHandle<()> {
        tokio::spawn(async move {
            self.load_regions().await;
            info!(circles = self.tracker.circle_count(), "Fog session started");

            loop {
                tokio::select! {
                    biased;

                    _ = self.shutdown.cancelled() => {
                        info!("Fog session cancelled");
                        break;
                    }

                    fix = fixes.recv() => match fix {
                        Some(fix) => self.handle_fix(fix).await,
                        None => {
                            info!("Fix stream closed");
                            break;
                        }
                    },
                }
            }

            info!(stats = %self.stats(), "Fog session stopped");
        })
    }

    async fn load_regions(&self) {
        let tracker = Arc::clone(&self.tracker);
        match tokio::task::spawn_blocking(move || tracker.load()).await {
            Ok(Ok(count)) => debug!(count, "Loaded explored regions"),
            Ok(Err(e)) => warn!(error = %e, "Could not load explored regions"),
            Err(e) => warn!(error = %e, "Region load task failed"),
        }
    }

    async fn handle_fix(&self, fix: LocationFix) {
        SessionCounters::bump(&self.counters.fixes_received);

        let settings = *self.settings.read();
        let camera = *self.camera.borrow();

        let command = {
            let mut state = self.state.lock();
            state.filter.set_max_accuracy(settings.max_fix_accuracy_m);

            match state.filter.offer(&fix) {
                FixDecision::Accepted => {}
                decision => {
                    debug!(?decision, "Fix dropped");
                    SessionCounters::bump(&self.counters.fixes_dropped);
                    return;
                }
            }

            state
                .policy
                .on_fix(&fix, camera.as_ref(), settings.auto_map_centering)
        };

        if let Some(command) = command {
            SessionCounters::bump(&self.counters.camera_commands);
            if self.commands.send(command).is_err() {
                debug!("Camera command receiver dropped");
            }
        }

        let tracker = Arc::clone(&self.tracker);
        let radius = settings.exploration_radius;
        let result = tokio::task::spawn_blocking(move || tracker.process_fix(&fix, radius))
            .await
            .map_err(|e| TrackerError::Join(e.to_string()))
            .and_then(|r| r);

        match result {
            Ok(TrackOutcome::Created { .. }) => {
                SessionCounters::bump(&self.counters.regions_created);
            }
            Ok(TrackOutcome::Merged { .. }) => {
                SessionCounters::bump(&self.counters.regions_merged);
            }
            Err(e) => {
                SessionCounters::bump(&self.counters.store_errors);
                warn!(error = %e, "Fix not recorded");
            }
        }
    }
}

impl std::fmt::Debug for FogSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FogSession")
            .field("stats", &self.stats())
            .field("cancelled", &self.shutdown.is_cancelled())
            .finish_non_exhaustive()
    }
}
