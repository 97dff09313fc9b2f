//! Pose estimator seam.
//!
//! The session only needs "give me the keypoint candidates for the current
//! frame"; where the frame comes from and which model runs is up to the
//! implementation.

use super::keypoint::KeypointSet;

/// Produces keypoint candidates for the latest frame.
///
/// An error or an empty list both mean "no usable pose this frame".
#[allow(async_fn_in_trait)]
pub trait Estimator {
    async fn estimate(&mut self) -> anyhow::Result<Vec<KeypointSet>>;

    /// True once the source can never produce another frame.
    fn is_exhausted(&self) -> bool {
        false
    }
}

#[cfg(feature = "desktop")]
pub use desktop::CameraEstimator;

#[cfg(feature = "desktop")]
mod desktop {
    use anyhow::{Context, Result};

    use super::Estimator;
    use crate::camera::OpenCvCamera;
    use crate::config::Config;
    use crate::pose::detector::PoseDetector;
    use crate::pose::keypoint::KeypointSet;
    use crate::pose::preprocess::preprocess_for_movenet;

    /// OpenCV カメラ + MoveNet
    pub struct CameraEstimator {
        camera: OpenCvCamera,
        detector: PoseDetector,
    }

    impl CameraEstimator {
        pub fn open(config: &Config) -> Result<Self> {
            let camera = OpenCvCamera::open(&config.camera)?;
            let detector = PoseDetector::new(&config.model.path)
                .with_context(|| format!("Failed to load pose model {}", config.model.path))?;
            Ok(Self { camera, detector })
        }
    }

    impl CameraEstimator {
        fn estimate_blocking(&mut self) -> Result<Vec<KeypointSet>> {
            let frame = self.camera.read_frame()?;
            let (width, height) = self.camera.resolution();
            let input = preprocess_for_movenet(&frame)?;
            let pose = self.detector.detect(input, width, height)?;
            Ok(vec![pose])
        }
    }

    impl Estimator for CameraEstimator {
        /// キャプチャと推論はブロッキングなので、他のタスクを別ワーカーへ逃がしてから実行する。
        /// マルチスレッドランタイムが必要。
        async fn estimate(&mut self) -> Result<Vec<KeypointSet>> {
            tokio::task::block_in_place(|| self.estimate_blocking())
        }
    }
}
