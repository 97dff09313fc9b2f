//! Signals exchanged with the presentation layer.

use crate::sequence::ReferencePose;

/// Emitted by the controller for a renderer or console to consume.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    SessionStarted { order: Vec<u32> },
    /// The pose the user should now match; `index` is its position in the order.
    PoseChanged { pose: ReferencePose, index: usize },
    SessionFinished,
    SessionAborted { reason: String },
}

/// User input consumed by the runner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCommand {
    /// Manual advance to the next pose.
    Skip,
    /// Drop the current session and start a new one.
    Restart,
    /// End the current session.
    Stop,
}

/// Controller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Idle,
    Starting,
    Active,
    Finished,
}
