//! ArcFace face embedder running on ONNX Runtime.
//!
//! Crops are resized to the model's 112x112 input with nearest-neighbour
//! sampling, normalized to `[-1, 1]`, and the output vector is L2-normalized.
use std::path::Path;

use crate::recognition::domain::face_embedder::FaceEmbedder;
use crate::recognition::domain::identity::Embedding;
use crate::recognition::domain::similarity::l2_normalize;
use crate::shared::frame::Frame;

const INPUT_SIZE: usize = 112;
const NORM_MEAN: f32 = 127.5;
const NORM_STD: f32 = 127.5;

pub struct OnnxArcFaceEmbedder {
    session: ort::session::Session,
}

impl OnnxArcFaceEmbedder {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let intra_threads = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let session = ort::session::Session::builder()?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)?
            .with_inter_threads(1)?
            .with_intra_threads(intra_threads)?
            .with_execution_providers(execution_providers())?
            .commit_from_file(model_path)?;
        log::info!("Loaded embedding model {}", model_path.display());
        Ok(Self { session })
    }
}

impl FaceEmbedder for OnnxArcFaceEmbedder {
    fn embed(&mut self, face: &Frame) -> Result<Option<Embedding>, Box<dyn std::error::Error>> {
        if face.width() == 0 || face.height() == 0 || face.channels() < 3 {
            return Ok(None);
        }

        let input_value = ort::value::Tensor::from_array(preprocess(face))?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        let embedding_array = outputs[0].try_extract_array::<f32>()?;
        let mut embedding: Embedding = embedding_array.iter().copied().collect();

        if embedding.is_empty() || embedding.iter().any(|v| !v.is_finite()) {
            return Ok(None);
        }
        if embedding.iter().all(|v| *v == 0.0) {
            return Ok(None);
        }
        l2_normalize(&mut embedding);
        Ok(Some(embedding))
    }
}

/// CoreML on macOS, DirectML on Windows, CPU elsewhere.
fn execution_providers() -> Vec<ort::execution_providers::ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    return vec![ort::execution_providers::CoreMLExecutionProvider::default().build()];
    #[cfg(target_os = "windows")]
    return vec![ort::execution_providers::DirectMLExecutionProvider::default().build()];
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    Vec::new()
}

/// Resize crop to 112x112, normalize, NCHW layout.
fn preprocess(face: &Frame) -> ndarray::Array4<f32> {
    let src_w = face.width() as usize;
    let src_h = face.height() as usize;
    let src = face.as_ndarray();

    let mut tensor = ndarray::Array4::<f32>::zeros((1, 3, INPUT_SIZE, INPUT_SIZE));
    for y in 0..INPUT_SIZE {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / INPUT_SIZE as f64) as usize).min(src_h - 1);
        for x in 0..INPUT_SIZE {
            let src_x =
                (((x as f64 + 0.5) * src_w as f64 / INPUT_SIZE as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, c, y, x]] = (src[[src_y, src_x, c]] as f32 - NORM_MEAN) / NORM_STD;
            }
        }
    }
    tensor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid(w: u32, h: u32, value: u8) -> Frame {
        Frame::new(vec![value; (w * h * 3) as usize], w, h, 3, 0)
    }

    #[test]
    fn test_preprocess_shape() {
        let tensor = preprocess(&solid(50, 40, 128));
        assert_eq!(tensor.shape(), &[1, 3, 112, 112]);
    }

    #[test]
    fn test_preprocess_normalization_range() {
        assert!((preprocess(&solid(10, 10, 255))[[0, 0, 0, 0]] - 1.0).abs() < 0.01);
        assert!((preprocess(&solid(10, 10, 0))[[0, 2, 5, 5]] + 1.0).abs() < 0.01);
        let mid = preprocess(&solid(10, 10, 127))[[0, 1, 0, 0]];
        assert!((mid - (127.0 - 127.5) / 127.5).abs() < 0.01);
    }

    #[test]
    fn test_preprocess_keeps_channel_order() {
        // single pixel: R=255, G=0, B=127
        let face = Frame::new(vec![255, 0, 127], 1, 1, 3, 0);
        let tensor = preprocess(&face);
        assert!((tensor[[0, 0, 60, 60]] - 1.0).abs() < 0.01);
        assert!((tensor[[0, 1, 60, 60]] + 1.0).abs() < 0.01);
        assert!(tensor[[0, 2, 60, 60]].abs() < 0.01);
    }

    #[test]
    fn test_preprocess_samples_left_and_right_halves() {
        // 2x1 frame: left pixel black, right pixel white
        let face = Frame::new(vec![0, 0, 0, 255, 255, 255], 2, 1, 3, 0);
        let tensor = preprocess(&face);
        assert!(tensor[[0, 0, 0, 0]] < 0.0);
        assert!(tensor[[0, 0, 0, 111]] > 0.0);
    }
}
