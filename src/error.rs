use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

/// Every failure a request can hit, mapped to the `{"error": ...}` JSON body
/// the frontend expects.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No file uploaded")]
    NoFile,

    #[error("Invalid image file")]
    InvalidImage(#[from] image::ImageError),

    #[error("Upload failed: {0}")]
    Upload(#[from] actix_multipart::MultipartError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Model error: {0}")]
    Model(String),

    #[error("Inference failed: {0}")]
    Inference(String),

    #[error("Blocking task failed: {0}")]
    Blocking(#[from] actix_web::error::BlockingError),
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::NoFile | ApiError::InvalidImage(_) | ApiError::Upload(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Io(_) | ApiError::Model(_) | ApiError::Inference(_) | ApiError::Blocking(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(json!({ "error": self.to_string() }))
    }
}
