use serde::{Deserialize, Serialize};

/// Class index to human-readable name, in the label order the model was
/// trained with.
pub const CLASS_NAMES: [&str; 5] = [
    "actinic keratosis",
    "basal cell carcinoma",
    "dermatofibroma",
    "melanoma",
    "nevus",
];

/// Resolve a class index to its name. Indices outside the label table
/// (model/label mismatch) render as "unknown" rather than failing the request.
pub fn class_name(index: usize) -> &'static str {
    CLASS_NAMES.get(index).copied().unwrap_or("unknown")
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct TopPrediction {
    pub index: usize,
    pub name: String,
    pub probability: f32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PredictionResponse {
    pub predicted_class_index: usize,
    pub predicted_class_name: String,
    pub confidence: f32,
    pub top3: Vec<TopPrediction>,
}
