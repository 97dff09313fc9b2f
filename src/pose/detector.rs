use anyhow::{Context, Result};
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

use super::keypoint::{Keypoint, KeypointIndex, KeypointSet};

/// MoveNet SinglePose Lightning による姿勢推定
pub struct PoseDetector {
    session: Session,
}

impl PoseDetector {
    /// ONNXモデルを読み込んで初期化
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?;

        // CUDA が使えなければ ort が CPU で動かす
        #[cfg(feature = "cuda")]
        let builder = {
            tracing::info!("registering CUDA execution provider");
            builder.with_execution_providers([
                ort::execution_providers::CUDAExecutionProvider::default().build(),
            ])?
        };

        let session = builder
            .commit_from_file(model_path.as_ref())
            .context("Failed to load ONNX model")?;

        Ok(Self { session })
    }

    /// 前処理済みテンソルから姿勢を推定
    ///
    /// 入力: [1, 192, 192, 3] の f32 テンソル
    /// 出力: フレームのピクセル座標に変換した17点の KeypointSet
    pub fn detect(&mut self, input: Array4<f32>, width: u32, height: u32) -> Result<KeypointSet> {
        let input_tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs!["serving_default_input_0" => input_tensor])
            .context("Inference failed")?;

        // MoveNet の出力は [1, 1, 17, 3] (y, x, score) で 0〜1 に正規化済み
        let output: ndarray::ArrayViewD<f32> = outputs["StatefulPartitionedCall_0"]
            .try_extract_array()
            .context("Failed to extract output tensor")?;

        let keypoints = KeypointIndex::ALL
            .iter()
            .map(|&index| {
                let i = index as usize;
                let y = output[[0, 0, i, 0]] * height as f32;
                let x = output[[0, 0, i, 1]] * width as f32;
                let score = output[[0, 0, i, 2]];
                Keypoint::new(index.name(), x, y, score)
            })
            .collect();

        Ok(keypoints)
    }
}
