//! Builds the per-session pose order and loads its reference data.

use rand::Rng;
use std::path::PathBuf;
use tracing::{debug, warn};

use super::order;
use super::store::PoseStore;
use crate::config::SequenceConfig;
use crate::error::{ConfigError, DataLoadError};
use crate::pose::KeypointSet;

/// A target pose the user has to match.
#[derive(Debug, Clone, PartialEq)]
pub struct ReferencePose {
    pub id: u32,
    pub keypoints: KeypointSet,
    /// Display image; `None` when neither file name resolved.
    pub image: Option<PathBuf>,
}

#[derive(Debug, Clone)]
pub struct PoseSequencer {
    pose_ids: Vec<u32>,
    forbidden: Vec<(u32, u32)>,
    max_attempts: usize,
}

impl PoseSequencer {
    pub fn new(pose_ids: Vec<u32>, forbidden: Vec<(u32, u32)>, max_attempts: usize) -> Self {
        Self {
            pose_ids,
            forbidden,
            max_attempts,
        }
    }

    pub fn from_config(config: &SequenceConfig) -> Self {
        Self::new(
            config.pose_ids.clone(),
            config.forbidden_pairs(),
            config.max_shuffle_attempts,
        )
    }

    pub fn pose_count(&self) -> usize {
        self.pose_ids.len()
    }

    pub fn generate_order<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<Vec<u32>, ConfigError> {
        let order = order::generate_order(&self.pose_ids, &self.forbidden, self.max_attempts, rng)?;
        debug!(?order, "generated pose order");
        Ok(order)
    }

    /// Loads every pose in `order`. Any missing keypoint file aborts the
    /// whole load; a missing image only drops that pose's picture.
    pub fn load<S: PoseStore + ?Sized>(
        &self,
        order: &[u32],
        store: &S,
    ) -> Result<Vec<ReferencePose>, DataLoadError> {
        order
            .iter()
            .map(|&id| {
                let keypoints = store.load_keypoints(id)?;
                let image = match store.resolve_image(id) {
                    Ok(path) => Some(path),
                    Err(e) => {
                        warn!(error = %e, "continuing without reference image");
                        None
                    }
                };
                Ok(ReferencePose { id, keypoints, image })
            })
            .collect()
    }
}
