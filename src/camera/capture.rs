use anyhow::{Context, Result};
use opencv::{
    core::Mat,
    prelude::*,
    videoio::{self, VideoCapture, VideoCaptureAPIs},
};
use tracing::info;

use crate::config::CameraConfig;

/// OpenCVを使用したカメラキャプチャ
pub struct OpenCvCamera {
    capture: VideoCapture,
    width: u32,
    height: u32,
}

impl OpenCvCamera {
    /// 設定ファイルの [camera] から開く
    pub fn open(config: &CameraConfig) -> Result<Self> {
        Self::open_with_config(config.index, Some(config.width), Some(config.height), Some(config.fps))
    }

    /// 解像度とFPSを指定してカメラを開く。指定はあくまで希望値
    pub fn open_with_config(index: i32, width: Option<u32>, height: Option<u32>, fps: Option<u32>) -> Result<Self> {
        let mut capture =
            VideoCapture::new(index, VideoCaptureAPIs::CAP_ANY as i32).context("Failed to open camera")?;

        if !capture.is_opened()? {
            anyhow::bail!("Camera {} is not available", index);
        }

        let requested = [
            (videoio::CAP_PROP_FRAME_WIDTH, width),
            (videoio::CAP_PROP_FRAME_HEIGHT, height),
            (videoio::CAP_PROP_FPS, fps),
        ];
        for (prop, value) in requested {
            if let Some(v) = value {
                capture.set(prop, v as f64)?;
            }
        }
        // 古いフレームを溜めない
        capture.set(videoio::CAP_PROP_BUFFERSIZE, 1.0)?;

        let actual_width = capture.get(videoio::CAP_PROP_FRAME_WIDTH)? as u32;
        let actual_height = capture.get(videoio::CAP_PROP_FRAME_HEIGHT)? as u32;
        let actual_fps = capture.get(videoio::CAP_PROP_FPS)?;
        info!(index, width = actual_width, height = actual_height, fps = actual_fps, "camera opened");

        Ok(Self {
            capture,
            width: actual_width,
            height: actual_height,
        })
    }

    /// 実際の解像度
    pub fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    /// フレームを読み込む（BGR形式）
    pub fn read_frame(&mut self) -> Result<Mat> {
        let mut frame = Mat::default();
        self.capture
            .read(&mut frame)
            .context("Failed to read frame")?;

        if frame.empty() {
            anyhow::bail!("Empty frame received");
        }

        Ok(frame)
    }
}
