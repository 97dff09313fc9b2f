use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::warn;

use crate::error::ConfigError;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub matching: MatchingConfig,
    #[serde(default)]
    pub sequence: SequenceConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub camera: CameraConfig,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub app: AppConfig,
}

/// 一致判定のしきい値
#[derive(Debug, Clone, Deserialize)]
pub struct MatchingConfig {
    /// 平均角度差 (度) がこれ未満なら一致フレーム
    #[serde(default = "default_angle_threshold")]
    pub angle_threshold: f32,
    /// 次のポーズに進むのに必要な一致フレーム数
    #[serde(default = "default_required_frames")]
    pub required_frames: u32,
    /// 不一致フレームがこれを超えたら連続カウントをリセット
    #[serde(default = "default_max_fail_frames")]
    pub max_fail_frames: u32,
}

fn default_angle_threshold() -> f32 { 20.0 }
fn default_required_frames() -> u32 { 50 }
fn default_max_fail_frames() -> u32 { 10 }

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            angle_threshold: default_angle_threshold(),
            required_frames: default_required_frames(),
            max_fail_frames: default_max_fail_frames(),
        }
    }
}

impl MatchingConfig {
    /// 0フレームで進む・NaN で比較できない、といった設定を弾く
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.angle_threshold.is_finite() || self.angle_threshold <= 0.0 {
            return Err(ConfigError::InvalidValue {
                field: "matching.angle_threshold",
                value: self.angle_threshold.to_string(),
                reason: "must be a positive finite number of degrees",
            });
        }
        if self.required_frames == 0 {
            return Err(ConfigError::InvalidValue {
                field: "matching.required_frames",
                value: "0".to_string(),
                reason: "at least one matching frame is required",
            });
        }
        Ok(())
    }
}

/// ポーズ順序の生成
#[derive(Debug, Clone, Deserialize)]
pub struct SequenceConfig {
    /// 使用するポーズID
    #[serde(default = "default_pose_ids")]
    pub pose_ids: Vec<u32>,
    /// 隣り合ってはいけないポーズIDの組
    #[serde(default = "default_forbidden_adjacent")]
    pub forbidden_adjacent: Vec<[u32; 2]>,
    /// シャッフルのやり直し上限
    #[serde(default = "default_max_shuffle_attempts")]
    pub max_shuffle_attempts: usize,
    /// 乱数シード。未指定なら毎回ランダム
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_pose_ids() -> Vec<u32> { (1..=7).collect() }
fn default_forbidden_adjacent() -> Vec<[u32; 2]> { vec![[5, 7]] }
fn default_max_shuffle_attempts() -> usize { 10_000 }

impl Default for SequenceConfig {
    fn default() -> Self {
        Self {
            pose_ids: default_pose_ids(),
            forbidden_adjacent: default_forbidden_adjacent(),
            max_shuffle_attempts: default_max_shuffle_attempts(),
            seed: None,
        }
    }
}

impl SequenceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_shuffle_attempts == 0 {
            return Err(ConfigError::InvalidValue {
                field: "sequence.max_shuffle_attempts",
                value: "0".to_string(),
                reason: "at least one shuffle is required",
            });
        }
        Ok(())
    }

    /// 隣接禁止ペアを (u32, u32) の組で返す
    pub fn forbidden_pairs(&self) -> Vec<(u32, u32)> {
        self.forbidden_adjacent.iter().map(|[a, b]| (*a, *b)).collect()
    }
}

/// 基準ポーズのデータと画像
#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
    /// `pose{id}.json` と `pose{id}.{ext}` を置くディレクトリ
    #[serde(default = "default_assets_dir")]
    pub dir: String,
    /// 画像の拡張子。見つからなければ大文字版も試す
    #[serde(default = "default_image_extension")]
    pub image_extension: String,
}

fn default_assets_dir() -> String { "poses".to_string() }
fn default_image_extension() -> String { "png".to_string() }

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            dir: default_assets_dir(),
            image_extension: default_image_extension(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CameraConfig {
    #[serde(default)]
    pub index: i32,
    #[serde(default = "default_camera_width")]
    pub width: u32,
    #[serde(default = "default_camera_height")]
    pub height: u32,
    #[serde(default = "default_camera_fps")]
    pub fps: u32,
}

fn default_camera_width() -> u32 { 640 }
fn default_camera_height() -> u32 { 480 }
fn default_camera_fps() -> u32 { 30 }

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            index: 0,
            width: default_camera_width(),
            height: default_camera_height(),
            fps: default_camera_fps(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelConfig {
    /// MoveNet SinglePose Lightning (ONNX)
    #[serde(default = "default_model_path")]
    pub path: String,
}

fn default_model_path() -> String { "models/movenet_lightning.onnx".to_string() }

impl Default for ModelConfig {
    fn default() -> Self {
        Self { path: default_model_path() }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// 1秒あたりの評価回数。0 なら待たずに回す
    #[serde(default = "default_target_fps")]
    pub target_fps: u32,
}

fn default_target_fps() -> u32 { 60 }

impl Default for AppConfig {
    fn default() -> Self {
        Self { target_fps: default_target_fps() }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse config")?;
        config.validate().context("Invalid config")?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.matching.validate()?;
        self.sequence.validate()
    }

    /// 読めなければデフォルト値で続行
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            return Self::default();
        }
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(path = %path.display(), error = %format!("{e:#}"), "using default config");
                Self::default()
            }
        }
    }
}
