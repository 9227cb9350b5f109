use garde::Validate;
use serde::Deserialize;

use crate::models::job::AnalysisType;

/// Request to analyze an uploaded photo.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisRequest {
    #[garde(length(min = 1, max = 128))]
    pub photo_id: String,

    #[garde(length(min = 1, max = 128))]
    pub user_id: String,

    #[garde(skip)]
    pub analysis_type: AnalysisType,
}

impl AnalysisRequest {
    pub fn new(photo_id: &str, user_id: &str, analysis_type: AnalysisType) -> Self {
        Self {
            photo_id: photo_id.to_string(),
            user_id: user_id.to_string(),
            analysis_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_ids_rejected() {
        assert!(AnalysisRequest::new("", "u1", AnalysisType::Meal).validate().is_err());
        assert!(AnalysisRequest::new("p1", "", AnalysisType::Meal).validate().is_err());
        assert!(AnalysisRequest::new("p1", "u1", AnalysisType::Meal).validate().is_ok());
    }

    #[test]
    fn test_deserializes_camel_case() {
        let req: AnalysisRequest =
            serde_json::from_str(r#"{"photoId":"p1","userId":"u1","analysisType":"body"}"#)
                .unwrap();
        assert_eq!(req.analysis_type, AnalysisType::Body);
    }
}
