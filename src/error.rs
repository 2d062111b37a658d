use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Request validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization errors (JSON, model artifacts)
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Training dataset could not be read or cleaned
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// Classifier fitting or evaluation failed
    #[error("Training error: {0}")]
    Training(String),

    /// No trained classifier is available to serve predictions
    #[error("Model unavailable: {0}")]
    ModelUnavailable(String),

    /// Classifier output broke the class/probability contract
    #[error("Classifier contract violation: {0}")]
    ClassifierContract(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::ModelUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Configuration(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Dataset(_) => StatusCode::UNPROCESSABLE_ENTITY,
            AppError::Training(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::ClassifierContract(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get error code string
    pub fn error_code(&self) -> &str {
        match self {
            AppError::NotFound(_) => "NOT_FOUND",
            AppError::Validation(_) => "VALIDATION_ERROR",
            AppError::Configuration(_) => "CONFIGURATION_ERROR",
            AppError::Io(_) => "IO_ERROR",
            AppError::Serialization(_) => "SERIALIZATION_ERROR",
            AppError::Dataset(_) => "DATASET_ERROR",
            AppError::Training(_) => "TRAINING_ERROR",
            AppError::ModelUnavailable(_) => "MODEL_UNAVAILABLE",
            AppError::ClassifierContract(_) => "CLASSIFIER_CONTRACT_VIOLATION",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

/// Convert AppError to HTTP response
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_code = self.error_code();
        let message = self.to_string();

        if status.is_server_error() {
            tracing::error!(
                error_code = error_code,
                status_code = status.as_u16(),
                message = %message,
                "Request error"
            );
        } else {
            tracing::warn!(
                error_code = error_code,
                status_code = status.as_u16(),
                message = %message,
                "Request rejected"
            );
        }

        let body = Json(json!({
            "error": {
                "code": error_code,
                "message": message,
                "status": status.as_u16(),
            }
        }));

        (status, body).into_response()
    }
}

/// Conversion from serde_json::Error
impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from bincode::Error (model artifacts)
impl From<bincode::Error> for AppError {
    fn from(err: bincode::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Conversion from csv::Error (training datasets)
impl From<csv::Error> for AppError {
    fn from(err: csv::Error) -> Self {
        AppError::Dataset(err.to_string())
    }
}

/// Conversion from validator::ValidationErrors
impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

/// Conversion from config::ConfigError
impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration(err.to_string())
    }
}

/// Result type alias
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_status_codes() {
        assert_eq!(
            AppError::NotFound("test".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            AppError::Validation("test".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            AppError::ModelUnavailable("test".to_string()).status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            AppError::ClassifierContract("test".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_error_codes() {
        assert_eq!(
            AppError::ModelUnavailable("test".to_string()).error_code(),
            "MODEL_UNAVAILABLE"
        );
        assert_eq!(
            AppError::ClassifierContract("test".to_string()).error_code(),
            "CLASSIFIER_CONTRACT_VIOLATION"
        );
        assert_ne!(
            AppError::ClassifierContract("test".to_string()).error_code(),
            AppError::Internal("test".to_string()).error_code()
        );
    }

    #[test]
    fn test_csv_error_maps_to_dataset() {
        let err: AppError = csv::Error::from(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ))
        .into();
        assert_eq!(err.error_code(), "DATASET_ERROR");
    }
}
