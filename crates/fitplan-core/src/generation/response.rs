//! Model response parsing with validation.
//!
//! The model is asked for bare JSON but frequently wraps it in a markdown
//! fence. [`parse_generated_plan`] strips the fence, deserializes the
//! document into [`GeneratedPlan`] and validates it into insert-ready rows:
//! - Both `workouts` and `meals` are present and non-empty.
//! - `day_of_week` is in 1..=7 and unique across workouts.
//! - Every workout day has a label and at least one named exercise with
//!   `sets >= 1` and a rep prescription.
//! - `meal_type` is a known meal slot and `meal_name` is non-empty.
//! - Macros, when present, are finite and non-negative.
//! - No text field contains a NUL character (PostgreSQL rejects it).

use std::collections::HashSet;

use serde::Deserialize;
use thiserror::Error;

use fitplan_db::models::{Exercise, MealType, NewMeal, NewWorkoutDay};

const FENCE: &str = "```";

/// Errors that make a well-formed JSON document unusable as a plan.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlanValidationError {
    #[error("plan contains no workouts")]
    NoWorkouts,

    #[error("plan contains no meals")]
    NoMeals,

    #[error("day_of_week {0} is out of range (expected 1-7)")]
    DayOutOfRange(i64),

    #[error("day_of_week {0} appears more than once")]
    DuplicateDay(i64),

    #[error("workout on day {day} has an empty day_label")]
    EmptyDayLabel { day: i64 },

    #[error("workout on day {day} has no exercises")]
    NoExercises { day: i64 },

    #[error("workout on day {day} has an exercise with no name")]
    EmptyExerciseName { day: i64 },

    #[error("exercise {exercise:?} on day {day} has invalid sets {sets}")]
    InvalidSets {
        day: i64,
        exercise: String,
        sets: String,
    },

    #[error("exercise {exercise:?} on day {day} has no reps")]
    MissingReps { day: i64, exercise: String },

    #[error("unknown meal_type {0:?} (expected breakfast, snack_am, lunch, snack_pm, or dinner)")]
    UnknownMealType(String),

    #[error("{meal_type} meal has an empty meal_name")]
    EmptyMealName { meal_type: MealType },

    #[error("meal {meal:?} has invalid {field} {value}")]
    InvalidMacro {
        meal: String,
        field: &'static str,
        value: f64,
    },

    #[error("{field} contains a NUL character")]
    NulCharacter { field: &'static str },
}

/// Errors from [`parse_generated_plan`].
#[derive(Debug, Error)]
pub enum PlanParseError {
    #[error("model response is not valid plan JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("model response is not a usable plan: {0}")]
    Invalid(#[from] PlanValidationError),
}

// ---------------------------------------------------------------------------
// Wire shape returned by the model
// ---------------------------------------------------------------------------

/// The JSON document the model is instructed to return.
#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedPlan {
    #[serde(default)]
    pub workouts: Vec<GeneratedWorkout>,
    #[serde(default)]
    pub meals: Vec<GeneratedMeal>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedWorkout {
    pub day_of_week: i64,
    #[serde(default)]
    pub day_label: String,
    #[serde(default)]
    pub exercises: Vec<GeneratedExercise>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedExercise {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub sets: Option<Sets>,
    #[serde(default)]
    pub reps: Option<Reps>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Models emit reps both as `"8-10"` and as a bare `10`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Reps {
    Text(String),
    Count(i64),
}

impl Reps {
    fn into_text(self) -> String {
        match self {
            Self::Text(s) => s.trim().to_owned(),
            Self::Count(n) => n.to_string(),
        }
    }
}

/// Sets arrive as `3`, `3.0` or `"3"`.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Sets {
    Count(i64),
    Fractional(f64),
    Text(String),
}

impl Sets {
    fn to_count(&self) -> Option<i32> {
        let n = match self {
            Self::Count(n) => *n,
            Self::Fractional(f) if f.fract() == 0.0 && f.is_finite() => *f as i64,
            Self::Fractional(_) => return None,
            Self::Text(s) => s.trim().parse().ok()?,
        };
        i32::try_from(n).ok().filter(|n| *n >= 1)
    }
}

impl std::fmt::Display for Sets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Count(n) => write!(f, "{n}"),
            Self::Fractional(x) => write!(f, "{x}"),
            Self::Text(s) => write!(f, "{s:?}"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GeneratedMeal {
    pub meal_type: String,
    #[serde(default, alias = "name")]
    pub meal_name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub calories: Option<f64>,
    #[serde(default)]
    pub protein_g: Option<f64>,
    #[serde(default)]
    pub carbs_g: Option<f64>,
    #[serde(default)]
    pub fat_g: Option<f64>,
}

/// Insert-ready rows produced from a validated model response.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedPlan {
    pub workouts: Vec<NewWorkoutDay>,
    pub meals: Vec<NewMeal>,
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Remove a surrounding markdown code fence (```` ```json ```` or ```` ``` ````)
/// and whitespace. Text without a fence, or text that already starts as a
/// JSON document, is returned trimmed.
pub fn strip_code_fences(raw: &str) -> &str {
    let mut text = raw.trim();

    if text.starts_with('{') || text.starts_with('[') {
        return text;
    }
    if !text.starts_with(FENCE) {
        match text.find(FENCE) {
            Some(start) => text = &text[start..],
            None => return text,
        }
    }
    text = &text[FENCE.len()..];

    // Drop the info string (`json`, `JSON`, or nothing) on the opening line.
    match text.find('\n') {
        Some(nl) if text[..nl].trim().chars().all(|c| c.is_ascii_alphanumeric()) => {
            text = &text[nl + 1..];
        }
        _ => text = text.strip_prefix("json").unwrap_or(text),
    }

    if let Some(end) = text.rfind(FENCE) {
        text = &text[..end];
    }
    text.trim()
}

/// Parse and validate a raw model completion.
pub fn parse_generated_plan(raw: &str) -> Result<ValidatedPlan, PlanParseError> {
    let plan: GeneratedPlan = serde_json::from_str(strip_code_fences(raw))?;
    Ok(validate(plan)?)
}

fn validate(plan: GeneratedPlan) -> Result<ValidatedPlan, PlanValidationError> {
    if plan.workouts.is_empty() {
        return Err(PlanValidationError::NoWorkouts);
    }
    if plan.meals.is_empty() {
        return Err(PlanValidationError::NoMeals);
    }

    let mut seen_days = HashSet::new();
    let mut workouts = Vec::with_capacity(plan.workouts.len());
    for workout in plan.workouts {
        workouts.push(validate_workout(workout, &mut seen_days)?);
    }

    let meals = plan
        .meals
        .into_iter()
        .map(validate_meal)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ValidatedPlan { workouts, meals })
}

fn validate_workout(
    workout: GeneratedWorkout,
    seen_days: &mut HashSet<i64>,
) -> Result<NewWorkoutDay, PlanValidationError> {
    let day = workout.day_of_week;
    if !(1..=7).contains(&day) {
        return Err(PlanValidationError::DayOutOfRange(day));
    }
    if !seen_days.insert(day) {
        return Err(PlanValidationError::DuplicateDay(day));
    }

    let day_label = workout.day_label.trim();
    if day_label.is_empty() {
        return Err(PlanValidationError::EmptyDayLabel { day });
    }
    reject_nul("day_label", day_label)?;
    if workout.exercises.is_empty() {
        return Err(PlanValidationError::NoExercises { day });
    }

    let mut exercises = Vec::with_capacity(workout.exercises.len());
    for ex in workout.exercises {
        let name = ex.name.trim().to_owned();
        if name.is_empty() {
            return Err(PlanValidationError::EmptyExerciseName { day });
        }
        reject_nul("exercise name", &name)?;
        let sets = ex
            .sets
            .as_ref()
            .and_then(Sets::to_count)
            .ok_or_else(|| PlanValidationError::InvalidSets {
                day,
                exercise: name.clone(),
                sets: ex
                    .sets
                    .as_ref()
                    .map_or_else(|| "missing".to_owned(), Sets::to_string),
            })?;
        let reps = ex
            .reps
            .map(Reps::into_text)
            .filter(|r| !r.is_empty())
            .ok_or_else(|| PlanValidationError::MissingReps {
                day,
                exercise: name.clone(),
            })?;
        reject_nul("reps", &reps)?;
        let notes = non_blank(ex.notes);
        if let Some(ref n) = notes {
            reject_nul("exercise notes", n)?;
        }

        exercises.push(Exercise {
            name,
            sets,
            reps,
            notes,
        });
    }

    Ok(NewWorkoutDay {
        // Range-checked above.
        day_of_week: day as i32,
        day_label: day_label.to_owned(),
        exercises,
    })
}

fn validate_meal(meal: GeneratedMeal) -> Result<NewMeal, PlanValidationError> {
    let meal_type: MealType = meal
        .meal_type
        .trim()
        .parse()
        .map_err(|_| PlanValidationError::UnknownMealType(meal.meal_type.clone()))?;

    let meal_name = meal.meal_name.trim().to_owned();
    if meal_name.is_empty() {
        return Err(PlanValidationError::EmptyMealName { meal_type });
    }
    reject_nul("meal_name", &meal_name)?;
    let description = non_blank(meal.description);
    if let Some(ref d) = description {
        reject_nul("meal description", d)?;
    }

    let check = |field: &'static str, value: Option<f64>| match value {
        Some(v) if !v.is_finite() || v < 0.0 => Err(PlanValidationError::InvalidMacro {
            meal: meal_name.clone(),
            field,
            value: v,
        }),
        other => Ok(other),
    };

    let calories = check("calories", meal.calories)?;
    let calories = match calories {
        Some(c) if c.round() > f64::from(i32::MAX) => {
            return Err(PlanValidationError::InvalidMacro {
                meal: meal_name.clone(),
                field: "calories",
                value: c,
            });
        }
        // Finite, non-negative and within i32 range.
        Some(c) => Some(c.round() as i32),
        None => None,
    };
    let protein_g = check("protein_g", meal.protein_g)?;
    let carbs_g = check("carbs_g", meal.carbs_g)?;
    let fat_g = check("fat_g", meal.fat_g)?;

    Ok(NewMeal {
        meal_type,
        meal_name,
        description,
        calories,
        protein_g,
        carbs_g,
        fat_g,
    })
}

fn reject_nul(field: &'static str, value: &str) -> Result<(), PlanValidationError> {
    if value.contains('\0') {
        return Err(PlanValidationError::NulCharacter { field });
    }
    Ok(())
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}
