//! Canned provider outputs and photo bytes.

/// Smallest byte prefix `image::guess_format` recognises as PNG.
pub const PNG_BYTES: &[u8] = b"\x89PNG\r\n\x1a\n\0\0\0\rIHDR\0\0\0\x01\0\0\0\x01";

pub const NOT_AN_IMAGE: &[u8] = b"definitely not an image";

/// Meal response with high confidence.
pub const MEAL_RICE: &str =
    r#"{"foodItems":["rice"],"estimatedCalories":300,"confidence":0.9}"#;

/// Meal response wrapped in chatty prose, as vision models often answer.
pub const MEAL_IN_PROSE: &str = concat!(
    "Here is my analysis of the meal:\n",
    r#"{"foodItems":[{"name":"salmon","portion":"150g","calories":310},"broccoli"],"#,
    r#""estimatedCalories":420,"macros":{"protein":35,"carbs":12,"fat":22},"#,
    r#""confidence":0.92,"recommendations":["Add a whole grain"]}"#,
    "\nLet me know if you need anything else!"
);

/// Meal response in the warning band (0.7 <= confidence < 0.8).
pub const MEAL_UNSURE: &str =
    r#"{"foodItems":["stew"],"estimatedCalories":550,"confidence":0.75}"#;

/// Meal response below the fatal confidence threshold.
pub const MEAL_BLURRY: &str =
    r#"{"foodItems":[],"estimatedCalories":0,"confidence":0.5}"#;

/// Body response without a confidence score.
pub const BODY_NO_CONFIDENCE: &str =
    r#"{"muscleDefinition":"moderate","posture":"upright","observations":["balanced shoulders"]}"#;

pub const NO_JSON: &str = "I'm sorry, I can't tell what is in this picture.";
