use garde::Validate;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// A food item recognised in a meal photo, either bare or with estimates.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum FoodItem {
    Name(String),
    Detailed {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        portion: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        calories: Option<f64>,
    },
}

impl FoodItem {
    pub fn name(&self) -> &str {
        match self {
            FoodItem::Name(name) => name,
            FoodItem::Detailed { name, .. } => name,
        }
    }
}

/// Macronutrient estimate in grams.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Macros {
    #[serde(default, alias = "proteinG")]
    pub protein: f64,
    #[serde(default, alias = "carbsG", alias = "carbohydrates")]
    pub carbs: f64,
    #[serde(default, alias = "fatG")]
    pub fat: f64,
}

/// Nutrition estimate for a meal photo.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MealAnalysis {
    #[serde(default)]
    #[garde(skip)]
    pub food_items: Vec<FoodItem>,

    #[serde(default)]
    #[garde(range(min = 0.0))]
    pub estimated_calories: f64,

    #[serde(default)]
    #[garde(skip)]
    pub macros: Macros,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(range(min = 0.0, max = 1.0))]
    pub confidence: Option<f64>,

    #[serde(default)]
    #[garde(skip)]
    pub warnings: Vec<String>,

    #[serde(default)]
    #[garde(skip)]
    pub recommendations: Vec<String>,
}

/// Qualitative body-progress feedback.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BodyAnalysis {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub muscle_definition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub body_composition: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub posture: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(skip)]
    pub fitness_level: Option<String>,

    #[serde(default)]
    #[garde(skip)]
    pub observations: Vec<String>,

    #[serde(default)]
    #[garde(skip)]
    pub recommendations: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[garde(range(min = 0.0, max = 1.0))]
    pub confidence: Option<f64>,

    #[serde(default)]
    #[garde(skip)]
    pub warnings: Vec<String>,
}

/// Structured analysis result, tagged by analysis type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnalysisResult {
    Meal(MealAnalysis),
    Body(BodyAnalysis),
}

impl AnalysisResult {
    pub fn confidence(&self) -> Option<f64> {
        match self {
            AnalysisResult::Meal(m) => m.confidence,
            AnalysisResult::Body(b) => b.confidence,
        }
    }

    pub fn warnings(&self) -> &[String] {
        match self {
            AnalysisResult::Meal(m) => &m.warnings,
            AnalysisResult::Body(b) => &b.warnings,
        }
    }

    pub fn push_warning(&mut self, warning: String) {
        match self {
            AnalysisResult::Meal(m) => m.warnings.push(warning),
            AnalysisResult::Body(b) => b.warnings.push(warning),
        }
    }

    pub(crate) fn validate_fields(&self) -> Result<(), garde::Report> {
        match self {
            AnalysisResult::Meal(m) => m.validate(),
            AnalysisResult::Body(b) => b.validate(),
        }
    }
}

/// Provider output that could not be decoded into a structured result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ParseDegraded {
    pub raw_text: String,
    pub reason: String,
}

/// What a completed job carries: a structured result or the degraded raw text.
///
/// Serialized flat with a `degraded` flag next to the payload fields, so a
/// parsed meal reads as `{"degraded":false,"type":"meal","estimatedCalories":..}`
/// and a degraded one as `{"degraded":true,"rawText":..,"reason":..}`.
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisOutcome {
    Parsed(AnalysisResult),
    Degraded(ParseDegraded),
}

#[derive(Serialize)]
struct FlaggedOutcome<'a, T> {
    degraded: bool,
    #[serde(flatten)]
    payload: &'a T,
}

impl Serialize for AnalysisOutcome {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            AnalysisOutcome::Parsed(result) => FlaggedOutcome {
                degraded: false,
                payload: result,
            }
            .serialize(serializer),
            AnalysisOutcome::Degraded(degraded) => FlaggedOutcome {
                degraded: true,
                payload: degraded,
            }
            .serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for AnalysisOutcome {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        // Parsed payloads carry a `type` tag and degraded ones never do.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Flat {
            Parsed(AnalysisResult),
            Degraded(ParseDegraded),
        }

        Ok(match Flat::deserialize(deserializer)? {
            Flat::Parsed(result) => AnalysisOutcome::Parsed(result),
            Flat::Degraded(degraded) => AnalysisOutcome::Degraded(degraded),
        })
    }
}

impl AnalysisOutcome {
    pub fn is_degraded(&self) -> bool {
        matches!(self, AnalysisOutcome::Degraded(_))
    }

    pub fn parsed(&self) -> Option<&AnalysisResult> {
        match self {
            AnalysisOutcome::Parsed(result) => Some(result),
            AnalysisOutcome::Degraded(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_meal_accepts_mixed_food_items() {
        let meal: MealAnalysis = serde_json::from_str(
            r#"{"foodItems":["rice",{"name":"chicken","portion":"150g","calories":250}],
                "estimatedCalories":500,"macros":{"protein":40,"carbs":60,"fat":10}}"#,
        )
        .unwrap();
        assert_eq!(meal.food_items.len(), 2);
        assert_eq!(meal.food_items[0].name(), "rice");
        assert_eq!(meal.food_items[1].name(), "chicken");
        assert_eq!(meal.macros.protein, 40.0);
        assert!(meal.confidence.is_none());
    }

    #[test]
    fn test_confidence_range_validation() {
        let meal = MealAnalysis {
            confidence: Some(1.4),
            ..Default::default()
        };
        assert!(meal.validate().is_err());

        let body = BodyAnalysis {
            confidence: Some(0.9),
            ..Default::default()
        };
        assert!(body.validate().is_ok());
    }

    #[test]
    fn test_result_serializes_with_type_tag() {
        let result = AnalysisResult::Meal(MealAnalysis {
            estimated_calories: 300.0,
            ..Default::default()
        });
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["type"], "meal");
        assert_eq!(json["estimatedCalories"], 300.0);
    }

    #[test]
    fn test_outcome_serializes_flat() {
        let parsed = AnalysisOutcome::Parsed(AnalysisResult::Meal(MealAnalysis {
            estimated_calories: 300.0,
            ..Default::default()
        }));
        let json = serde_json::to_value(&parsed).unwrap();
        assert_eq!(json["degraded"], false);
        assert_eq!(json["type"], "meal");
        assert_eq!(json["estimatedCalories"], 300.0);
        assert!(json.get("data").is_none());

        let degraded = AnalysisOutcome::Degraded(ParseDegraded {
            raw_text: "I see a plate of food".to_string(),
            reason: "no JSON object found".to_string(),
        });
        let json = serde_json::to_value(&degraded).unwrap();
        assert_eq!(json["degraded"], true);
        assert_eq!(json["rawText"], "I see a plate of food");
        assert!(json.get("type").is_none());
    }

    #[test]
    fn test_outcome_reads_back_both_shapes() {
        let parsed: AnalysisOutcome = serde_json::from_str(
            r#"{"degraded":false,"type":"body","posture":"upright"}"#,
        )
        .unwrap();
        assert!(!parsed.is_degraded());
        assert!(matches!(
            parsed.parsed(),
            Some(AnalysisResult::Body(body)) if body.posture.as_deref() == Some("upright")
        ));

        let degraded: AnalysisOutcome = serde_json::from_str(
            r#"{"degraded":true,"rawText":"blurry","reason":"no JSON object found"}"#,
        )
        .unwrap();
        assert!(degraded.is_degraded());
    }
}
