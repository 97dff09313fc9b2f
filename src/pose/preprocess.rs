use anyhow::{Context, Result};
use ndarray::Array4;
use opencv::{
    core::{AlgorithmHint, Mat, Size},
    imgproc,
    prelude::*,
};

/// MoveNet用の入力サイズ
pub const MOVENET_INPUT_SIZE: i32 = 192;

/// BGR8 フレームを MoveNet の入力テンソル [1, 192, 192, 3] (RGB, 0.0-255.0) に変換
///
/// アスペクト比は保たずに引き伸ばすので、出力の正規化座標に
/// 元フレームの幅・高さを掛ければそのままピクセル座標になる。
pub fn preprocess_for_movenet(frame: &Mat) -> Result<Array4<f32>> {
    let mut rgb = Mat::default();
    imgproc::cvt_color(frame, &mut rgb, imgproc::COLOR_BGR2RGB, 0, AlgorithmHint::ALGO_HINT_DEFAULT)?;

    let mut resized = Mat::default();
    imgproc::resize(
        &rgb,
        &mut resized,
        Size::new(MOVENET_INPUT_SIZE, MOVENET_INPUT_SIZE),
        0.0,
        0.0,
        imgproc::INTER_LINEAR,
    )?;

    // data_bytes は連続領域が前提
    let resized = if resized.is_continuous() {
        resized
    } else {
        resized.try_clone()?
    };

    let size = MOVENET_INPUT_SIZE as usize;
    let values: Vec<f32> = resized.data_bytes()?.iter().map(|&v| v as f32).collect();
    Array4::from_shape_vec((1, size, size, 3), values)
        .context("Frame is not 8-bit 3-channel")
}
