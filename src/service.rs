//! Walk recording session.
//!
//! `GpsSession` is the long-lived recording object: it outlives any view of
//! the walk in progress and owns the interaction with the platform's location
//! sensor. The platform feeds position fixes in through [`GpsSession::handle_fix`];
//! a gate timer thread decides which fixes become persisted path points.
//!
//! The session persists every captured sample immediately under the reserved
//! walk id, so a killed process loses at most the time since the last fix.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{debug, info, warn};

use crate::error::Result;
use crate::store::WalkStore;
use crate::types::{GeoPoint, WALK_IN_PROGRESS_ID};

/// Capture interval used when the caller does not supply one.
pub const DEFAULT_SAMPLE_INTERVAL: Duration = Duration::from_secs(30);

// ============================================================================
// Platform seams
// ============================================================================

/// Platform hook for the real location sensor.
///
/// The session tells the platform when it wants fixes; the platform delivers
/// them back through [`GpsSession::handle_fix`] and relays provider on/off
/// events to [`GpsSession::provider_enabled`] / [`GpsSession::provider_disabled`].
pub trait LocationProvider: Send {
    fn subscribe(&mut self) -> Result<()>;
    fn unsubscribe(&mut self);
}

/// Why a session ended without the user finishing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionAbortReason {
    /// The location provider was switched off before tracking began.
    ProviderDisabled,
}

/// UI callbacks. All methods default to no-ops so observers implement only
/// what they surface.
pub trait SessionObserver: Send + Sync {
    fn fix_acquired(&self) {}
    fn point_recorded(&self, _point: GeoPoint) {}
    fn session_paused(&self) {}
    fn tracking_resumed(&self) {}
    fn session_aborted(&self, _reason: SessionAbortReason) {}
}

/// No-op observer for callers that poll instead of listening.
pub struct NullObserver;

impl SessionObserver for NullObserver {}

// ============================================================================
// Config
// ============================================================================

/// Live session settings.
///
/// The sample interval is atomic and re-read by the gate timer every cycle,
/// so a settings change mid-walk takes effect on the next cycle without
/// restarting the session.
#[derive(Debug)]
pub struct SessionConfig {
    sample_interval_ms: AtomicU64,
}

impl SessionConfig {
    pub fn new(sample_interval: Duration) -> Self {
        SessionConfig {
            sample_interval_ms: AtomicU64::new(sample_interval.as_millis() as u64),
        }
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms.load(Ordering::SeqCst))
    }

    pub fn set_sample_interval(&self, interval: Duration) {
        self.sample_interval_ms
            .store(interval.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig::new(DEFAULT_SAMPLE_INTERVAL)
    }
}

// ============================================================================
// Session
// ============================================================================

/// Where the session is in its lifecycle.
///
/// `Finished` is terminal; recording another walk means constructing a new
/// session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    /// Subscribed, waiting for the first fix. No deadline.
    Acquiring,
    /// First fix seen and persisted; not yet capturing periodically.
    Locked,
    Tracking,
    Paused,
    Finished,
}

/// A walk recording session.
///
/// Fix handling is a short critical section: one single-row insert plus an
/// in-memory cache push. Everything slow (bulk deletion, listing) lives on
/// the store side.
pub struct GpsSession {
    store: Arc<Mutex<WalkStore>>,
    config: Arc<SessionConfig>,
    provider: Box<dyn LocationProvider>,
    observer: Arc<dyn SessionObserver>,
    state: TrackState,
    /// Set by `resume()`; the next fix re-announces tracking and restarts
    /// the gate timer.
    resume_pending: bool,
    /// Open means the next fix while tracking is persisted. Flipped open by
    /// the timer thread, closed by the fix that consumes it.
    gate: Arc<AtomicBool>,
    /// Owned by the current timer thread generation; replaced on restart so
    /// a stale thread can never reopen the gate.
    timer_running: Arc<AtomicBool>,
    points: Vec<GeoPoint>,
}

impl GpsSession {
    pub fn new(
        store: Arc<Mutex<WalkStore>>,
        config: Arc<SessionConfig>,
        provider: Box<dyn LocationProvider>,
        observer: Arc<dyn SessionObserver>,
    ) -> Self {
        GpsSession {
            store,
            config,
            provider,
            observer,
            state: TrackState::Acquiring,
            resume_pending: false,
            gate: Arc::new(AtomicBool::new(false)),
            timer_running: Arc::new(AtomicBool::new(false)),
            points: Vec::new(),
        }
    }

    /// Subscribe to the provider and begin waiting for a fix.
    pub fn start(&mut self) -> Result<()> {
        self.provider.subscribe()?;
        self.state = TrackState::Acquiring;
        info!("session started, acquiring fix");
        Ok(())
    }

    /// Sensor delivery path. Called by the platform for every position fix.
    pub fn handle_fix(&mut self, latitude: f64, longitude: f64) -> Result<()> {
        match self.state {
            TrackState::Acquiring => {
                let point = self.record_point(latitude, longitude)?;
                self.state = TrackState::Locked;
                info!("fix acquired at ({}, {})", point.latitude(), point.longitude());
                self.observer.fix_acquired();
            }
            TrackState::Tracking if self.resume_pending => {
                self.resume_pending = false;
                let _ = self.record_point(latitude, longitude)?;
                self.restart_gate_timer();
                info!("tracking resumed");
                self.observer.tracking_resumed();
            }
            // swap closes the gate in the same step that claims it
            TrackState::Tracking if self.gate.swap(false, Ordering::SeqCst) => {
                let point = self.record_point(latitude, longitude)?;
                debug!("point recorded ({}, {})", latitude, longitude);
                self.observer.point_recorded(point);
            }
            // Locked fixes outside the gate, paused and finished sessions
            _ => {}
        }
        Ok(())
    }

    /// Begin periodic capture. The gate timer opens the gate once per
    /// interval; the fix that finds it open is the one persisted.
    ///
    /// Requires a lock-on first: before `Locked` this is a no-op, so the
    /// first fix always takes the lock-on path and announces itself.
    pub fn start_tracking(&mut self) {
        if self.state != TrackState::Locked {
            return;
        }
        self.state = TrackState::Tracking;
        self.restart_gate_timer();
        info!("tracking started");
    }

    /// Stop capturing and release the sensor. Fixes are ignored until
    /// [`resume`](Self::resume).
    pub fn pause(&mut self) {
        if self.state != TrackState::Tracking {
            return;
        }
        self.stop_gate_timer();
        self.gate.store(false, Ordering::SeqCst);
        self.provider.unsubscribe();
        self.state = TrackState::Paused;
        self.resume_pending = false;
        info!("session paused");
        self.observer.session_paused();
    }

    /// Resubscribe after a pause. The next fix behaves like a fresh lock-on:
    /// it is persisted immediately and restarts the gate timer.
    pub fn resume(&mut self) -> Result<()> {
        if self.state != TrackState::Paused {
            return Ok(());
        }
        self.provider.subscribe()?;
        self.state = TrackState::Tracking;
        self.resume_pending = true;
        info!("session resuming, waiting for fix");
        Ok(())
    }

    /// The platform reports the provider was switched off.
    ///
    /// Mid-walk this is a pause, not an abort, so the walk survives a trip
    /// through a tunnel or a toggled setting. Before tracking starts there
    /// is nothing worth keeping; the session ends.
    pub fn provider_disabled(&mut self) {
        match self.state {
            TrackState::Tracking => {
                warn!("location provider disabled while tracking, pausing");
                self.pause();
            }
            TrackState::Acquiring | TrackState::Locked => {
                warn!("location provider disabled before tracking, aborting session");
                self.shutdown();
                self.observer
                    .session_aborted(SessionAbortReason::ProviderDisabled);
            }
            TrackState::Paused | TrackState::Finished => {}
        }
    }

    /// The platform reports the provider came back. Auto-resumes a session
    /// that [`provider_disabled`](Self::provider_disabled) paused.
    pub fn provider_enabled(&mut self) -> Result<()> {
        if self.state == TrackState::Paused {
            info!("location provider re-enabled, resuming");
            self.resume()?;
        }
        Ok(())
    }

    /// End the session and release the sensor and timer. Safe from any
    /// state; the session is terminal afterwards.
    pub fn finish(&mut self) {
        if self.state == TrackState::Finished {
            return;
        }
        self.shutdown();
        info!("session finished with {} points", self.points.len());
    }

    /// Points captured by this session, in capture order. Transient cache;
    /// the durable copy lives in the store.
    pub fn points(&self) -> Vec<GeoPoint> {
        self.points.clone()
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.state == TrackState::Paused
    }

    pub fn is_tracking(&self) -> bool {
        self.state == TrackState::Tracking
    }

    fn record_point(&mut self, latitude: f64, longitude: f64) -> Result<GeoPoint> {
        {
            let store = lock_store(&self.store);
            store.add_point(WALK_IN_PROGRESS_ID, latitude, longitude)?;
        }
        let point = GeoPoint::from_degrees(latitude, longitude);
        self.points.push(point);
        Ok(point)
    }

    fn restart_gate_timer(&mut self) {
        self.stop_gate_timer();

        let running = Arc::new(AtomicBool::new(true));
        let running_worker = Arc::clone(&running);
        let gate = Arc::clone(&self.gate);
        let config = Arc::clone(&self.config);

        // Opens the gate, then sleeps. Never touches the store. Re-reads
        // the interval each cycle so settings changes apply next cycle.
        thread::spawn(move || {
            while running_worker.load(Ordering::SeqCst) {
                gate.store(true, Ordering::SeqCst);
                thread::sleep(config.sample_interval());
            }
        });

        self.timer_running = running;
    }

    fn stop_gate_timer(&mut self) {
        // The thread exits at its next wake; a fresh flag per generation
        // keeps it from reopening the gate in the meantime.
        self.timer_running.store(false, Ordering::SeqCst);
    }

    fn shutdown(&mut self) {
        self.stop_gate_timer();
        self.gate.store(false, Ordering::SeqCst);
        self.provider.unsubscribe();
        self.state = TrackState::Finished;
        self.resume_pending = false;
    }
}

impl Drop for GpsSession {
    fn drop(&mut self) {
        if self.state != TrackState::Finished {
            self.shutdown();
        }
    }
}

/// Lock the shared store, recovering the data if a panicking thread
/// poisoned the mutex (SQLite state is still consistent; transactions
/// either committed or rolled back).
fn lock_store(store: &Mutex<WalkStore>) -> std::sync::MutexGuard<'_, WalkStore> {
    store.lock().unwrap_or_else(|e| e.into_inner())
}
