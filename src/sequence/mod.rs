pub mod order;
pub mod sequencer;
pub mod store;

pub use order::{generate_order, has_forbidden_neighbours};
pub use sequencer::{PoseSequencer, ReferencePose};
pub use store::{DirPoseStore, PoseStore};
