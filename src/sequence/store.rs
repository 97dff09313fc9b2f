//! Reference pose data and display images.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::AssetsConfig;
use crate::error::{AssetResolutionError, DataLoadError};
use crate::pose::KeypointSet;

/// Source of reference keypoints and display images, keyed by pose id.
pub trait PoseStore {
    fn load_keypoints(&self, id: u32) -> Result<KeypointSet, DataLoadError>;

    fn resolve_image(&self, id: u32) -> Result<PathBuf, AssetResolutionError>;
}

/// Reads `pose{id}.json` and `pose{id}.{ext}` from one directory.
///
/// Images are looked up with the configured extension first, then its
/// alternate-case spelling; nothing else is tried.
#[derive(Debug, Clone)]
pub struct DirPoseStore {
    root: PathBuf,
    image_extension: String,
}

impl DirPoseStore {
    pub fn new(root: impl Into<PathBuf>, image_extension: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            image_extension: image_extension.into(),
        }
    }

    pub fn from_config(config: &AssetsConfig) -> Self {
        Self::new(&config.dir, &config.image_extension)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn keypoints_path(&self, id: u32) -> PathBuf {
        self.root.join(format!("pose{id}.json"))
    }

    /// Configured extension first, then the other case: upper-case unless
    /// the configured spelling already is, in which case lower-case.
    fn image_candidates(&self, id: u32) -> Vec<PathBuf> {
        let primary = self.root.join(format!("pose{id}.{}", self.image_extension));
        let upper = self.image_extension.to_uppercase();
        let alternate = if upper == self.image_extension {
            self.image_extension.to_lowercase()
        } else {
            upper
        };
        if alternate == self.image_extension {
            return vec![primary];
        }
        vec![primary, self.root.join(format!("pose{id}.{alternate}"))]
    }
}

impl PoseStore for DirPoseStore {
    fn load_keypoints(&self, id: u32) -> Result<KeypointSet, DataLoadError> {
        let path = self.keypoints_path(id);
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(source) => return Err(DataLoadError::Read { id, path, source }),
        };
        KeypointSet::from_json(&content).map_err(|source| DataLoadError::Parse { id, path, source })
    }

    fn resolve_image(&self, id: u32) -> Result<PathBuf, AssetResolutionError> {
        let tried = self.image_candidates(id);
        match tried.iter().find(|path| path.is_file()) {
            Some(found) => Ok(found.clone()),
            None => Err(AssetResolutionError { id, tried }),
        }
    }
}
