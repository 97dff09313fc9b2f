//! Session lifecycle: start, per-frame updates, manual skip, abort.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, trace, warn};

use super::event::{SessionEvent, SessionPhase};
use crate::config::{Config, MatchingConfig};
use crate::error::{report, SessionError};
use crate::pose::KeypointSet;
use crate::sequence::{PoseSequencer, PoseStore, ReferencePose};
use crate::tracker::{MatchEvent, MatchTracker};

/// Owns everything a session mutates: the pose order, the loaded reference
/// poses and the match tracker.
///
/// Every [`start`](Self::start) bumps a generation counter. Frames are tagged
/// with the generation they were requested under, and frames from an older
/// generation are dropped, so a result that was in flight across a restart
/// can never touch the fresh session.
pub struct SessionController<S> {
    store: S,
    sequencer: PoseSequencer,
    matching: MatchingConfig,
    rng: StdRng,
    events: UnboundedSender<SessionEvent>,
    phase: SessionPhase,
    generation: u64,
    order: Vec<u32>,
    poses: Vec<ReferencePose>,
    tracker: Option<MatchTracker>,
}

impl<S: PoseStore> SessionController<S> {
    pub fn new(config: &Config, store: S, events: UnboundedSender<SessionEvent>) -> Self {
        let rng = match config.sequence.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            store,
            sequencer: PoseSequencer::from_config(&config.sequence),
            matching: config.matching.clone(),
            rng,
            events,
            phase: SessionPhase::Idle,
            generation: 0,
            order: Vec::new(),
            poses: Vec::new(),
            tracker: None,
        }
    }

    pub fn with_rng(mut self, rng: StdRng) -> Self {
        self.rng = rng;
        self
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn order(&self) -> &[u32] {
        &self.order
    }

    pub fn poses(&self) -> &[ReferencePose] {
        &self.poses
    }

    pub fn tracker(&self) -> Option<&MatchTracker> {
        self.tracker.as_ref()
    }

    /// The pose the user is currently asked to match.
    pub fn current_pose(&self) -> Option<&ReferencePose> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        let index = self.tracker.as_ref()?.current_index();
        self.poses.get(index)
    }

    /// Starts (or restarts) a session.
    ///
    /// `acquire` opens the camera and estimator; it runs before any reference
    /// data is touched. On any failure the controller is left `Idle` and a
    /// `SessionAborted` event carries the reason. The acquired estimator is
    /// handed back to the caller, which drives the frame loop.
    pub fn start<E, F>(&mut self, acquire: F) -> Result<E, SessionError>
    where
        F: FnOnce() -> anyhow::Result<E>,
    {
        // invalidate anything still in flight before the old state goes away
        self.generation += 1;
        self.phase = SessionPhase::Starting;
        self.order.clear();
        self.poses.clear();
        self.tracker = None;
        info!(generation = self.generation, "starting session");

        let estimator = match self.prepare(acquire) {
            Ok(estimator) => estimator,
            Err(e) => {
                let reason = report(&e);
                warn!(error = %reason, "session start failed");
                self.phase = SessionPhase::Idle;
                self.emit(SessionEvent::SessionAborted { reason });
                return Err(e);
            }
        };

        self.phase = SessionPhase::Active;
        info!(order = ?self.order, "session active");
        self.emit(SessionEvent::SessionStarted {
            order: self.order.clone(),
        });
        if let Some(first) = self.poses.first() {
            self.emit(SessionEvent::PoseChanged {
                pose: first.clone(),
                index: 0,
            });
        }
        Ok(estimator)
    }

    fn prepare<E, F>(&mut self, acquire: F) -> Result<E, SessionError>
    where
        F: FnOnce() -> anyhow::Result<E>,
    {
        self.matching.validate()?;
        let estimator = acquire().map_err(SessionError::acquisition)?;
        let order = self.sequencer.generate_order(&mut self.rng)?;
        let poses = self.sequencer.load(&order, &self.store)?;

        self.tracker = Some(MatchTracker::from_config(&self.matching, poses.len()));
        self.order = order;
        self.poses = poses;
        Ok(estimator)
    }

    /// Feeds one estimator result. Only the first candidate is used; an
    /// empty list counts as a failed frame.
    ///
    /// Returns `None` when the frame was dropped (stale generation or no
    /// active session).
    pub fn on_frame(&mut self, generation: u64, candidates: &[KeypointSet]) -> Option<MatchEvent> {
        if generation != self.generation {
            trace!(generation, current = self.generation, "dropping stale frame");
            return None;
        }
        if self.phase != SessionPhase::Active {
            return None;
        }

        let tracker = self.tracker.as_mut()?;
        let reference = &self.poses.get(tracker.current_index())?.keypoints;
        let event = tracker.observe(candidates.first(), reference);
        trace!(
            success = tracker.success_streak(),
            fail = tracker.fail_streak(),
            ?event,
            "frame evaluated"
        );
        self.apply(event);
        Some(event)
    }

    /// Manual advance. Same effect as a completed match streak; ignored
    /// unless a session is active.
    pub fn skip_current(&mut self) -> Option<MatchEvent> {
        if self.phase != SessionPhase::Active {
            return None;
        }
        let event = self.tracker.as_mut()?.skip();
        debug!(?event, "pose skipped");
        self.apply(event);
        Some(event)
    }

    /// Ends the session on user request and returns to `Idle`.
    pub fn abort(&mut self, reason: &str) {
        self.generation += 1;
        let was_running = matches!(self.phase, SessionPhase::Active | SessionPhase::Starting);
        self.phase = SessionPhase::Idle;
        self.tracker = None;
        self.poses.clear();
        if was_running {
            info!(reason, "session aborted");
            self.emit(SessionEvent::SessionAborted {
                reason: reason.to_string(),
            });
        }
    }

    fn apply(&mut self, event: MatchEvent) {
        match event {
            MatchEvent::Advanced { index } => {
                if let Some(pose) = self.poses.get(index) {
                    info!(pose_id = pose.id, index, "pose advanced");
                    self.emit(SessionEvent::PoseChanged {
                        pose: pose.clone(),
                        index,
                    });
                }
            }
            MatchEvent::Finished => {
                self.phase = SessionPhase::Finished;
                info!("session finished");
                self.emit(SessionEvent::SessionFinished);
            }
            MatchEvent::Cooldown => debug!("match streak reset"),
            MatchEvent::Tracking | MatchEvent::Ignored => {}
        }
    }

    fn emit(&self, event: SessionEvent) {
        // no listener is fine: the session keeps running headless
        let _ = self.events.send(event);
    }
}
