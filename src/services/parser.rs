use serde::de::IgnoredAny;

use crate::models::analysis::{AnalysisResult, BodyAnalysis, MealAnalysis, ParseDegraded};
use crate::models::job::AnalysisType;

/// Find the first balanced `{ ... }` substring of free-form model output that
/// is well-formed JSON.
///
/// Every `{` is tried as a start in order, so a stray unmatched brace or a
/// balanced bit of prose like `{roughly}` does not hide a later object.
/// Braces inside JSON string literals are ignored.
pub fn extract_json(raw: &str) -> Option<&str> {
    candidates(raw).find(|candidate| serde_json::from_str::<IgnoredAny>(candidate).is_ok())
}

/// Balanced `{ ... }` substrings, one per opening brace that closes.
fn candidates(raw: &str) -> impl Iterator<Item = &str> {
    raw.char_indices()
        .filter(|&(_, ch)| ch == '{')
        .filter_map(move |(start, _)| balanced_object_at(raw, start))
}

fn balanced_object_at(raw: &str, start: usize) -> Option<&str> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, ch) in raw[start..].char_indices() {
        if in_string {
            match ch {
                _ if escaped => escaped = false,
                '\\' => escaped = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match ch {
            '"' => in_string = true,
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&raw[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Convert raw provider text into a structured result for `analysis_type`.
///
/// Never fails hard: anything that cannot be decoded comes back as
/// [`ParseDegraded`] carrying the original text.
pub fn parse(raw: &str, analysis_type: AnalysisType) -> Result<AnalysisResult, ParseDegraded> {
    let degraded = |reason: String| ParseDegraded {
        raw_text: raw.to_string(),
        reason,
    };

    let json = match extract_json(raw) {
        Some(json) => json,
        None => {
            let reason = match candidates(raw)
                .find_map(|candidate| serde_json::from_str::<IgnoredAny>(candidate).err())
            {
                Some(e) => format!("invalid JSON: {}", e),
                None => "no JSON object found".to_string(),
            };
            return Err(degraded(reason));
        }
    };

    let result = match analysis_type {
        AnalysisType::Meal => serde_json::from_str::<MealAnalysis>(json).map(AnalysisResult::Meal),
        AnalysisType::Body => serde_json::from_str::<BodyAnalysis>(json).map(AnalysisResult::Body),
    }
    .map_err(|e| degraded(format!("invalid JSON: {}", e)))?;

    result
        .validate_fields()
        .map_err(|report| degraded(format!("invalid fields: {}", report)))?;

    Ok(result)
}
