//! The per-frame evaluation loop.
//!
//! One step = wait for the frame tick, await one estimate, apply it. The next
//! estimate is only requested after the previous step finished, so a slow
//! estimator throttles the loop instead of queueing frames. User commands are
//! raced against the in-flight estimate; a command drops that estimate. A
//! blocking estimator (run through `block_in_place`) is only interrupted
//! between frames.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{self, Interval, MissedTickBehavior};
use tracing::{debug, info};

use super::controller::SessionController;
use super::event::{SessionCommand, SessionPhase};
use crate::error::SessionError;
use crate::pose::{Estimator, KeypointSet};
use crate::sequence::PoseStore;

/// Why [`run_session`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every pose was matched or skipped.
    Finished,
    /// The user sent [`SessionCommand::Stop`].
    Stopped,
    /// The estimator ran out of frames (replay sources).
    SourceExhausted,
}

/// Interval for a frame period; `None` for an unthrottled loop.
fn frame_ticker(period: Duration) -> Option<Interval> {
    if period.is_zero() {
        return None;
    }
    let mut ticker = time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    Some(ticker)
}

/// Frame period for a target rate; 0 means unthrottled.
pub fn frame_period(target_fps: u32) -> Duration {
    if target_fps == 0 {
        Duration::ZERO
    } else {
        Duration::from_secs_f64(1.0 / target_fps as f64)
    }
}

async fn next_frame<E: Estimator>(ticker: Option<&mut Interval>, estimator: &mut E) -> Vec<KeypointSet> {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        // let the command reader and event listeners run
        None => tokio::task::yield_now().await,
    }
    match estimator.estimate().await {
        Ok(candidates) => candidates,
        Err(e) => {
            debug!(error = %e, "no usable pose this frame");
            Vec::new()
        }
    }
}

/// Starts a session and drives it until it finishes, is stopped, or the
/// frame source runs dry.
///
/// `acquire` is called again on every restart, after the previous estimator
/// was released. A failed (re)start returns the error with the controller
/// left idle.
pub async fn run_session<S, E, F>(
    controller: &mut SessionController<S>,
    mut acquire: F,
    commands: &mut mpsc::Receiver<SessionCommand>,
    period: Duration,
) -> Result<RunOutcome, SessionError>
where
    S: PoseStore,
    E: Estimator,
    F: FnMut() -> anyhow::Result<E>,
{
    let mut commands_open = true;

    'session: loop {
        // the previous estimator is dropped before a restart acquires again
        let mut estimator = controller.start(&mut acquire)?;
        let mut ticker = frame_ticker(period);

        loop {
            if controller.phase() == SessionPhase::Finished {
                return Ok(RunOutcome::Finished);
            }
            if estimator.is_exhausted() {
                info!("frame source exhausted");
                controller.abort("frame source exhausted");
                return Ok(RunOutcome::SourceExhausted);
            }

            let generation = controller.generation();
            tokio::select! {
                command = commands.recv(), if commands_open => match command {
                    Some(SessionCommand::Skip) => {
                        controller.skip_current();
                    }
                    Some(SessionCommand::Restart) => {
                        info!("restart requested");
                        continue 'session;
                    }
                    Some(SessionCommand::Stop) => {
                        controller.abort("stopped by user");
                        return Ok(RunOutcome::Stopped);
                    }
                    None => {
                        debug!("command channel closed");
                        commands_open = false;
                    }
                },
                candidates = next_frame(ticker.as_mut(), &mut estimator) => {
                    controller.on_frame(generation, &candidates);
                }
            }
        }
    }
}
