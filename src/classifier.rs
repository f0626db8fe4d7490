use std::path::Path;

use image::DynamicImage;
use ndarray::Array4;
use tract_onnx::prelude::*;

use crate::error::ApiError;
use crate::models::{class_name, PredictionResponse, TopPrediction};

/// Model input edge, fixed by the exported network.
pub const INPUT_SIZE: u32 = 224;

/// Per-channel means in BGR order, matching the VGG16 "caffe" preprocessing
/// the model was trained with. No scaling is applied.
const BGR_MEAN: [f32; 3] = [103.939, 116.779, 123.68];

type OnnxModel = TypedSimplePlan<TypedModel>;

/// A loaded, optimized ONNX classifier. Built once at startup and shared
/// across workers.
pub struct Classifier {
    model: OnnxModel,
}

impl Classifier {
    /// Load the ONNX model from disk, pin its input fact and optimize it for
    /// repeated execution.
    pub fn load(path: &Path) -> Result<Self, ApiError> {
        let shape = tvec!(1, INPUT_SIZE as usize, INPUT_SIZE as usize, 3);
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| ApiError::Model(format!("failed to load {}: {}", path.display(), e)))?
            .with_input_fact(0, InferenceFact::dt_shape(f32::datum_type(), shape))
            .map_err(|e| ApiError::Model(format!("input fact rejected: {}", e)))?
            .into_optimized()
            .map_err(|e| ApiError::Model(format!("optimization failed: {}", e)))?
            .into_runnable()
            .map_err(|e| ApiError::Model(format!("plan construction failed: {}", e)))?;

        Ok(Self { model })
    }

    /// Decode an uploaded image from disk and classify it.
    pub fn classify_path(&self, path: &Path) -> Result<PredictionResponse, ApiError> {
        let img = image::open(path)?;
        let input = preprocess(&img);
        let scores = self.forward(input)?;
        rank(&scores)
    }

    fn forward(&self, input: Array4<f32>) -> Result<Vec<f32>, ApiError> {
        let flat: Vec<f32> = input.iter().copied().collect();
        let tensor = tract_ndarray::Array4::from_shape_vec(
            (1, INPUT_SIZE as usize, INPUT_SIZE as usize, 3),
            flat,
        )
        .map_err(|e| ApiError::Inference(e.to_string()))?
        .into_tensor();

        let outputs = self
            .model
            .run(tvec!(tensor.into()))
            .map_err(|e| ApiError::Inference(e.to_string()))?;
        flatten_outputs(&outputs)
    }
}

/// Pull the score vector out of the model's output list.
fn flatten_outputs<T: std::ops::Deref<Target = Tensor>>(
    outputs: &[T],
) -> Result<Vec<f32>, ApiError> {
    let output = outputs
        .first()
        .ok_or_else(|| ApiError::Inference("model produced no outputs".to_string()))?;
    let view = output
        .to_array_view::<f32>()
        .map_err(|e| ApiError::Inference(e.to_string()))?;
    Ok(view.iter().copied().collect())
}

/// Convert a decoded image into the model's input tensor.
///
/// Mirrors the training-time pipeline exactly: RGB conversion, resize to
/// 224x224 with a Lanczos filter (no aspect preservation), then BGR channel
/// order with mean subtraction.
pub fn preprocess(img: &DynamicImage) -> Array4<f32> {
    let resized = img
        .resize_exact(INPUT_SIZE, INPUT_SIZE, image::imageops::FilterType::Lanczos3)
        .to_rgb8();

    let size = INPUT_SIZE as usize;
    let mut input = Array4::<f32>::zeros((1, size, size, 3));
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            // channel c reads the mirrored RGB component: 0 -> blue, 2 -> red
            let value = pixel[2 - c] as f32 - BGR_MEAN[c];
            input[[0, y as usize, x as usize, c]] = value;
        }
    }
    input
}

/// Rank raw model scores into the response DTO. Scores come out of the
/// network's softmax layer, so they are used as probabilities directly.
pub fn rank(scores: &[f32]) -> Result<PredictionResponse, ApiError> {
    let top3 = top_k(scores, 3);
    let best = top3
        .first()
        .cloned()
        .ok_or_else(|| ApiError::Inference("model produced no scores".to_string()))?;

    Ok(PredictionResponse {
        predicted_class_index: best.index,
        predicted_class_name: best.name,
        confidence: best.probability,
        top3,
    })
}

fn top_k(scores: &[f32], k: usize) -> Vec<TopPrediction> {
    let mut indices: Vec<usize> = (0..scores.len()).collect();
    indices.sort_by(|&a, &b| {
        scores[b]
            .partial_cmp(&scores[a])
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    indices.truncate(k);
    indices
        .into_iter()
        .map(|i| TopPrediction {
            index: i,
            name: class_name(i).to_string(),
            probability: scores[i],
        })
        .collect()
}
