pub mod controller;
pub mod event;
pub mod runner;

pub use controller::SessionController;
pub use event::{SessionCommand, SessionEvent, SessionPhase};
pub use runner::{frame_period, run_session, RunOutcome};
