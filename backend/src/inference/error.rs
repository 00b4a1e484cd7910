use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};

#[derive(serde::Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("No file provided")]
    EmptyInput,
    #[error("Malformed upload: {0}")]
    Upload(String),
    #[error("Could not decode image: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Tensor shape mismatch: expected [1, 224, 224, 3], got {actual:?}")]
    ShapeMismatch { actual: Vec<usize> },
    #[error("Model is unavailable")]
    ModelUnavailable,
    #[error("Model inference error: {0}")]
    Backend(String),
}

impl InferenceError {
    /// Errors the uploader can fix by sending a different file.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            InferenceError::EmptyInput | InferenceError::Upload(_) | InferenceError::Decode(_)
        )
    }
}

impl ResponseError for InferenceError {
    fn status_code(&self) -> StatusCode {
        match self {
            InferenceError::EmptyInput | InferenceError::Upload(_) | InferenceError::Decode(_) => {
                StatusCode::BAD_REQUEST
            }
            InferenceError::ModelUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            InferenceError::ShapeMismatch { .. } | InferenceError::Backend(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: self.to_string(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Model artifact not found at {0}")]
    NotFound(String),
    #[error("No inference backend for {0} (expected .onnx, or .pt with the `torch` feature)")]
    UnsupportedArtifact(String),
    #[error("Failed to load model: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_follow_error_kind() {
        assert_eq!(InferenceError::EmptyInput.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            InferenceError::ModelUnavailable.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            InferenceError::ShapeMismatch { actual: vec![1, 2] }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            InferenceError::Backend("boom".into()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn only_upload_problems_are_user_errors() {
        assert!(InferenceError::EmptyInput.is_user_error());
        assert!(InferenceError::Upload("bad boundary".into()).is_user_error());
        assert!(!InferenceError::ModelUnavailable.is_user_error());
        assert!(!InferenceError::Backend("x".into()).is_user_error());
    }
}
