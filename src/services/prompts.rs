use crate::models::job::AnalysisType;

const MEAL_PROMPT: &str = concat!(
    "Analyze this meal photo and estimate its nutrition. ",
    "Respond with a single JSON object with these fields: ",
    "foodItems (array of {name, portion, calories}), estimatedCalories (number), ",
    "macros ({protein, carbs, fat} in grams), confidence (number between 0 and 1), ",
    "warnings (array of strings), recommendations (array of strings). ",
    "Return ONLY valid JSON with these exact field names."
);

const BODY_PROMPT: &str = concat!(
    "Analyze this body progress photo and give supportive, non-medical fitness feedback. ",
    "Respond with a single JSON object with these fields: ",
    "muscleDefinition, bodyComposition, posture, fitnessLevel (short descriptive strings), ",
    "observations (array of strings), recommendations (array of strings), ",
    "confidence (number between 0 and 1). ",
    "Return ONLY valid JSON with these exact field names."
);

/// Prompt sent alongside the photo for the given analysis type.
pub fn build_prompt(analysis_type: AnalysisType) -> &'static str {
    match analysis_type {
        AnalysisType::Meal => MEAL_PROMPT,
        AnalysisType::Body => BODY_PROMPT,
    }
}
