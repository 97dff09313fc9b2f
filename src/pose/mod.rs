pub mod angle;
#[cfg(feature = "desktop")]
pub mod detector;
pub mod estimator;
pub mod keypoint;
#[cfg(feature = "desktop")]
pub mod preprocess;
pub mod replay;

pub use angle::{compare, score, AngleComparison, JointTriplet, JOINT_TRIPLETS, NO_MATCH_SCORE};
#[cfg(feature = "desktop")]
pub use detector::PoseDetector;
#[cfg(feature = "desktop")]
pub use estimator::CameraEstimator;
pub use estimator::Estimator;
pub use keypoint::{Keypoint, KeypointIndex, KeypointSet, COMPARE_THRESHOLD, DISPLAY_THRESHOLD};
#[cfg(feature = "desktop")]
pub use preprocess::preprocess_for_movenet;
pub use replay::ReplayEstimator;
