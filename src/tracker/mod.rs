pub mod matcher;

pub use matcher::{MatchEvent, MatchState, MatchTracker};
