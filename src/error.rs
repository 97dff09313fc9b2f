//! Error types for session start-up and reference data loading.

use std::path::PathBuf;
use thiserror::Error;

/// Invalid pose sequencing configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No pose ids were configured.
    #[error("pose id set is empty")]
    EmptyPoseSet,

    /// The same id appears more than once.
    #[error("pose id {0} is listed more than once")]
    DuplicatePoseId(u32),

    /// A forbidden pair names an id outside the pose set.
    #[error("forbidden pair ({a}, {b}) names unknown pose id {unknown}")]
    UnknownPairId { a: u32, b: u32, unknown: u32 },

    /// No order satisfying the adjacency constraints was found.
    #[error("no pose order without forbidden neighbours after {attempts} shuffles")]
    Unsatisfiable { attempts: usize },

    /// A numeric setting is outside its usable range.
    #[error("invalid {field} = {value}: {reason}")]
    InvalidValue {
        field: &'static str,
        value: String,
        reason: &'static str,
    },
}

/// Reference keypoints for a pose could not be loaded.
#[derive(Debug, Error)]
pub enum DataLoadError {
    #[error("failed to read reference pose {id} from {}", path.display())]
    Read {
        id: u32,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse reference pose {id} from {}", path.display())]
    Parse {
        id: u32,
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// No display image exists for a pose. Gameplay continues without it.
#[derive(Debug, Error)]
#[error("no image for pose {id} (tried {tried:?})")]
pub struct AssetResolutionError {
    pub id: u32,
    pub tried: Vec<PathBuf>,
}

/// Fatal session start failure. The controller is left idle.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Camera or pose model unavailable.
    #[error("failed to acquire camera or pose estimator")]
    Acquisition {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },

    #[error(transparent)]
    DataLoad(#[from] DataLoadError),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SessionError {
    pub fn acquisition(err: anyhow::Error) -> Self {
        Self::Acquisition { source: err.into() }
    }
}

/// `err` and its sources joined with `": "`, each message once.
pub fn report(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
