use std::time::Duration;

use crate::services::provider::ProviderError;
use crate::services::storage::StorageError;

/// Failures surfaced synchronously to callers of the engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("AI provider is not configured")]
    ProviderUnavailable,

    #[error("Invalid analysis request: {0}")]
    InvalidRequest(#[from] garde::Report),
}

/// A failed analysis attempt. Never escapes the engine; it becomes job state.
#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Photo not found: {0}")]
    PhotoNotFound(String),

    #[error("Photo storage error: {0}")]
    Photo(StorageError),

    #[error("Photo is not a supported image format")]
    UnsupportedImage,

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Provider call exceeded {0:?}")]
    Timeout(Duration),

    #[error("Confidence {confidence:.2} is below the minimum of {min:.2}")]
    LowConfidence { confidence: f64, min: f64 },

    #[error("AI provider is not configured")]
    NotConfigured,
}

impl From<StorageError> for AnalysisError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::NotFound(key) => AnalysisError::PhotoNotFound(key),
            other => AnalysisError::Photo(other),
        }
    }
}

impl AnalysisError {
    /// Whether another attempt could succeed. Content-level failures are final.
    pub fn is_retryable(&self) -> bool {
        match self {
            AnalysisError::Provider(e) => e.is_transient(),
            AnalysisError::Timeout(_) => true,
            AnalysisError::Photo(StorageError::S3(_) | StorageError::Unavailable(_)) => true,
            AnalysisError::Photo(_) => false,
            AnalysisError::PhotoNotFound(_) => false,
            AnalysisError::UnsupportedImage => false,
            AnalysisError::LowConfidence { .. } => false,
            AnalysisError::NotConfigured => false,
        }
    }

    /// Short label used for metrics and logs.
    pub fn reason(&self) -> &'static str {
        match self {
            AnalysisError::PhotoNotFound(_) => "photo_not_found",
            AnalysisError::Photo(_) => "photo_storage",
            AnalysisError::UnsupportedImage => "unsupported_image",
            AnalysisError::Provider(_) => "provider",
            AnalysisError::Timeout(_) => "timeout",
            AnalysisError::LowConfidence { .. } => "low_confidence",
            AnalysisError::NotConfigured => "not_configured",
        }
    }

    /// Message safe to show to end users: no upstream bodies, URLs or type names.
    pub fn public_message(&self) -> String {
        match self {
            AnalysisError::PhotoNotFound(_) => "The photo could not be found".to_string(),
            AnalysisError::Photo(_) => "The photo could not be loaded".to_string(),
            AnalysisError::UnsupportedImage => {
                "The photo is not a supported image format".to_string()
            }
            AnalysisError::Provider(_) | AnalysisError::Timeout(_) => {
                "The analysis service is temporarily unavailable. Please try again later"
                    .to_string()
            }
            AnalysisError::LowConfidence { confidence, .. } => format!(
                "The photo could not be analyzed reliably (confidence {:.0}%). Try a clearer photo",
                confidence * 100.0
            ),
            AnalysisError::NotConfigured => "The analysis service is not configured".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retry_classification() {
        let transient = AnalysisError::Provider(ProviderError::Api {
            status: 503,
            message: "overloaded".to_string(),
        });
        assert!(transient.is_retryable());

        let rate_limited = AnalysisError::Provider(ProviderError::Api {
            status: 429,
            message: String::new(),
        });
        assert!(rate_limited.is_retryable());

        let rejected = AnalysisError::Provider(ProviderError::Api {
            status: 400,
            message: "bad image".to_string(),
        });
        assert!(!rejected.is_retryable());

        assert!(AnalysisError::Timeout(Duration::from_secs(1)).is_retryable());
        assert!(!AnalysisError::LowConfidence { confidence: 0.5, min: 0.7 }.is_retryable());
        assert!(!AnalysisError::PhotoNotFound("p1".to_string()).is_retryable());
        assert!(!AnalysisError::UnsupportedImage.is_retryable());
    }

    #[test]
    fn test_public_message_hides_upstream_details() {
        let err = AnalysisError::Provider(ProviderError::Api {
            status: 500,
            message: "stack trace at worker.js:42".to_string(),
        });
        let msg = err.public_message();
        assert!(!msg.contains("worker.js"));
        assert!(!msg.contains("500"));

        let err = AnalysisError::LowConfidence { confidence: 0.5, min: 0.7 };
        assert!(err.public_message().contains("50%"));
    }

    #[test]
    fn test_storage_not_found_maps_to_photo_not_found() {
        let err: AnalysisError = StorageError::NotFound("photos/u1/p1".to_string()).into();
        assert!(matches!(err, AnalysisError::PhotoNotFound(_)));
    }
}
