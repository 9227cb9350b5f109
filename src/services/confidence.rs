use crate::config::ConfidenceThresholds;
use crate::error::AnalysisError;

/// Outcome of gating a confidence score that did not fail.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfidenceVerdict {
    /// No confidence was reported; nothing to gate.
    Ungated,
    Passed,
    /// Usable, but below the warning threshold.
    Warning(f64),
}

/// Classify a confidence score against the configured thresholds.
///
/// Below `min` is a terminal [`AnalysisError::LowConfidence`].
pub fn validate(
    confidence: Option<f64>,
    thresholds: &ConfidenceThresholds,
) -> Result<ConfidenceVerdict, AnalysisError> {
    let Some(confidence) = confidence else {
        return Ok(ConfidenceVerdict::Ungated);
    };

    if confidence < thresholds.min {
        return Err(AnalysisError::LowConfidence {
            confidence,
            min: thresholds.min,
        });
    }

    if confidence < thresholds.warning {
        return Ok(ConfidenceVerdict::Warning(confidence));
    }

    Ok(ConfidenceVerdict::Passed)
}

/// Warning text attached to results in the warning band.
pub fn warning_message(confidence: f64) -> String {
    format!(
        "Low confidence ({:.0}%): estimates may be inaccurate",
        confidence * 100.0
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> ConfidenceThresholds {
        ConfidenceThresholds::default()
    }

    #[test]
    fn test_below_min_is_fatal() {
        let err = validate(Some(0.5), &thresholds()).unwrap_err();
        assert!(matches!(err, AnalysisError::LowConfidence { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_warning_band() {
        assert_eq!(
            validate(Some(0.7), &thresholds()).unwrap(),
            ConfidenceVerdict::Warning(0.7)
        );
        assert_eq!(
            validate(Some(0.79), &thresholds()).unwrap(),
            ConfidenceVerdict::Warning(0.79)
        );
    }

    #[test]
    fn test_passes_at_warning_threshold() {
        assert_eq!(validate(Some(0.8), &thresholds()).unwrap(), ConfidenceVerdict::Passed);
        assert_eq!(validate(Some(1.0), &thresholds()).unwrap(), ConfidenceVerdict::Passed);
    }

    #[test]
    fn test_absent_confidence_is_ungated() {
        assert_eq!(validate(None, &thresholds()).unwrap(), ConfidenceVerdict::Ungated);
    }

    #[test]
    fn test_warning_message_mentions_percentage() {
        assert!(warning_message(0.75).contains("75%"));
    }
}
