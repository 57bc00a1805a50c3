//! Prompt construction for plan generation.
//!
//! Pure logic: takes a [`Profile`] and renders the single user message sent
//! to the model. Missing profile fields are replaced with fixed placeholders
//! so the model always sees a complete description.

use std::fmt::Write as _;

use fitplan_db::models::Profile;

/// Placeholder for unknown age, gender, height and weight.
pub const UNKNOWN: &str = "unknown";
/// Activity level assumed when the profile has none.
pub const DEFAULT_ACTIVITY_LEVEL: &str = "moderate";
/// Workout days assumed when the profile has none.
pub const DEFAULT_WORKOUT_DAYS: i32 = 3;
/// Goal assumed when the profile has none.
pub const DEFAULT_GOAL: &str = "general_fitness";

const RESPONSE_SHAPE: &str = r#"Return a JSON object with this exact structure:
{
  "workouts": [
    {
      "day_of_week": 1,
      "day_label": "Monday: Upper Body",
      "exercises": [
        { "name": "Bench Press", "sets": 3, "reps": "8-10", "notes": "Use moderate weight" }
      ]
    }
  ],
  "meals": [
    {
      "meal_type": "breakfast",
      "meal_name": "Oatmeal with banana",
      "description": "Rolled oats with sliced banana and honey",
      "calories": 350,
      "protein_g": 12,
      "carbs_g": 55,
      "fat_g": 8
    }
  ]
}
"#;

const RULES: &str = "Rules:
- Workouts should match the available days. Use day_of_week 1=Monday through 7=Sunday, each day at most once.
- Include 4-6 exercises per workout day.
- Diet should have 5 meals: breakfast, snack_am, lunch, snack_pm, dinner.
- Use everyday foods. Nothing exotic or hard to find.
- Calories and macros should align with the goal.
- Be realistic. No extreme diets or dangerous intensity.
- Return ONLY the JSON, no markdown.
";

/// Render the plan-generation prompt for a profile.
pub fn build_prompt(profile: &Profile) -> String {
    let age = profile
        .age
        .map_or_else(|| UNKNOWN.to_string(), |a| a.to_string());
    let gender = profile.gender.map_or(UNKNOWN, |g| g.as_str());
    let height = profile
        .height_cm
        .map_or_else(|| UNKNOWN.to_string(), |h| h.to_string());
    let weight = profile
        .weight_kg
        .map_or_else(|| UNKNOWN.to_string(), |w| w.to_string());
    let activity = profile
        .activity_level
        .map_or(DEFAULT_ACTIVITY_LEVEL, |a| a.as_str());
    let days = profile.workout_days_per_week.unwrap_or(DEFAULT_WORKOUT_DAYS);
    let goal = profile.goal.map_or(DEFAULT_GOAL, |g| g.as_str());

    let mut prompt = String::with_capacity(2048);
    prompt.push_str(
        "You are a practical fitness coach. Based on this person's data, \
         create a realistic workout plan and diet plan.\n\n",
    );

    // Writing into a String cannot fail.
    let _ = write!(
        prompt,
        "Person:\n\
         - Age: {age}\n\
         - Gender: {gender}\n\
         - Height: {height} cm\n\
         - Weight: {weight} kg\n\
         - Activity level: {activity}\n\
         - Available workout days: {days} per week\n\
         - Goal: {goal}\n\n"
    );

    prompt.push_str(RESPONSE_SHAPE);
    prompt.push('\n');
    prompt.push_str(RULES);
    prompt
}
