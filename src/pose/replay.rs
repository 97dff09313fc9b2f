//! Recorded keypoint frames played back as an estimator.

use anyhow::{Context, Result};
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use super::estimator::Estimator;
use super::keypoint::KeypointSet;

/// Plays back frames from a JSON array.
///
/// Each element is either `null` (no person detected) or a keypoint set in
/// the wrapped or bare form.
pub struct ReplayEstimator {
    frames: VecDeque<Option<KeypointSet>>,
}

impl ReplayEstimator {
    pub fn from_frames(frames: impl IntoIterator<Item = Option<KeypointSet>>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        let frames: Vec<Option<KeypointSet>> =
            serde_json::from_str(json).context("Failed to parse replay frames")?;
        Ok(Self::from_frames(frames))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read replay file {}", path.display()))?;
        Self::from_json(&content)
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl Estimator for ReplayEstimator {
    async fn estimate(&mut self) -> Result<Vec<KeypointSet>> {
        match self.frames.pop_front() {
            Some(frame) => Ok(frame.into_iter().collect()),
            None => anyhow::bail!("replay exhausted"),
        }
    }

    fn is_exhausted(&self) -> bool {
        self.frames.is_empty()
    }
}
