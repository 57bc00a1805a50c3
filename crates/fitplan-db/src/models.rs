use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use sqlx::types::Json;
use thiserror::Error;
use uuid::Uuid;

/// Error returned when a stored or submitted string is not a known variant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind}: {value:?}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: &str) -> Self {
        Self {
            kind,
            value: value.to_owned(),
        }
    }
}

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// Self-reported gender from the onboarding questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Gender {
    Male,
    Female,
    Other,
}

impl Gender {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Male => "male",
            Self::Female => "female",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Gender {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "male" => Ok(Self::Male),
            "female" => Ok(Self::Female),
            "other" => Ok(Self::Other),
            other => Err(ParseEnumError::new("gender", other)),
        }
    }
}

// ---------------------------------------------------------------------------

/// Day-to-day activity outside of planned workouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityLevel {
    Sedentary,
    Light,
    Moderate,
    Active,
    VeryActive,
}

impl ActivityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sedentary => "sedentary",
            Self::Light => "light",
            Self::Moderate => "moderate",
            Self::Active => "active",
            Self::VeryActive => "very_active",
        }
    }

    /// Short description shown next to the option in the questionnaire.
    pub fn description(self) -> &'static str {
        match self {
            Self::Sedentary => "mostly sitting",
            Self::Light => "walking, light tasks",
            Self::Moderate => "regular movement",
            Self::Active => "frequent exercise",
            Self::VeryActive => "intense daily",
        }
    }
}

impl fmt::Display for ActivityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityLevel {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sedentary" => Ok(Self::Sedentary),
            "light" => Ok(Self::Light),
            "moderate" => Ok(Self::Moderate),
            "active" => Ok(Self::Active),
            "very_active" => Ok(Self::VeryActive),
            other => Err(ParseEnumError::new("activity level", other)),
        }
    }
}

// ---------------------------------------------------------------------------

/// What the user wants the plan to optimize for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    FatLoss,
    MuscleGain,
    Maintenance,
    GeneralFitness,
}

impl Goal {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::FatLoss => "fat_loss",
            Self::MuscleGain => "muscle_gain",
            Self::Maintenance => "maintenance",
            Self::GeneralFitness => "general_fitness",
        }
    }

    /// Human-facing label used on the dashboard.
    pub fn label(self) -> &'static str {
        match self {
            Self::FatLoss => "Lose fat",
            Self::MuscleGain => "Build muscle",
            Self::Maintenance => "Stay where I am",
            Self::GeneralFitness => "General fitness",
        }
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Goal {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "fat_loss" => Ok(Self::FatLoss),
            "muscle_gain" => Ok(Self::MuscleGain),
            "maintenance" => Ok(Self::Maintenance),
            "general_fitness" => Ok(Self::GeneralFitness),
            other => Err(ParseEnumError::new("goal", other)),
        }
    }
}

// ---------------------------------------------------------------------------

/// Meal slot within a day, in eating order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "text", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MealType {
    Breakfast,
    SnackAm,
    Lunch,
    SnackPm,
    Dinner,
}

impl MealType {
    /// All slots in the order they are eaten.
    pub const ALL: [MealType; 5] = [
        Self::Breakfast,
        Self::SnackAm,
        Self::Lunch,
        Self::SnackPm,
        Self::Dinner,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Breakfast => "breakfast",
            Self::SnackAm => "snack_am",
            Self::Lunch => "lunch",
            Self::SnackPm => "snack_pm",
            Self::Dinner => "dinner",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Breakfast => "Breakfast",
            Self::SnackAm => "Morning snack",
            Self::Lunch => "Lunch",
            Self::SnackPm => "Afternoon snack",
            Self::Dinner => "Dinner",
        }
    }
}

impl fmt::Display for MealType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MealType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "breakfast" => Ok(Self::Breakfast),
            "snack_am" => Ok(Self::SnackAm),
            "lunch" => Ok(Self::Lunch),
            "snack_pm" => Ok(Self::SnackPm),
            "dinner" => Ok(Self::Dinner),
            other => Err(ParseEnumError::new("meal type", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Row structs
// ---------------------------------------------------------------------------

/// Per-user demographic and goal record. Drives plan generation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<Gender>,
    pub height_cm: Option<f64>,
    pub weight_kg: Option<f64>,
    pub activity_level: Option<ActivityLevel>,
    pub workout_days_per_week: Option<i32>,
    pub goal: Option<Goal>,
    pub onboarding_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    /// First word of the full name, for greetings.
    pub fn first_name(&self) -> Option<&str> {
        self.full_name
            .as_deref()
            .and_then(|n| n.split_whitespace().next())
    }
}

/// One exercise inside a workout day, stored in the `exercises` JSONB array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub name: String,
    pub sets: i32,
    /// Rep range such as `"8-10"` or `"30s"`.
    pub reps: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// A workout day in the user's current plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkoutPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub day_of_week: i32,
    pub day_label: String,
    pub exercises: Json<Vec<Exercise>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A meal item in the user's current diet plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DietPlan {
    pub id: Uuid,
    pub user_id: Uuid,
    pub meal_type: MealType,
    pub meal_name: String,
    pub description: Option<String>,
    pub calories: Option<i32>,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An append-only progress entry.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ProgressLog {
    pub id: Uuid,
    pub user_id: Uuid,
    pub logged_at: DateTime<Utc>,
    pub weight_kg: Option<f64>,
    pub workout_completed: Option<bool>,
    pub diet_adherence: Option<i32>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Insert / update payloads
// ---------------------------------------------------------------------------

/// A workout day to insert during plan replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct NewWorkoutDay {
    pub day_of_week: i32,
    pub day_label: String,
    pub exercises: Vec<Exercise>,
}

/// A meal item to insert during plan replacement.
#[derive(Debug, Clone, PartialEq)]
pub struct NewMeal {
    pub meal_type: MealType,
    pub meal_name: String,
    pub description: Option<String>,
    pub calories: Option<i32>,
    pub protein_g: Option<f64>,
    pub carbs_g: Option<f64>,
    pub fat_g: Option<f64>,
}

/// Partial profile update. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileUpdate {
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub age: Option<i32>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[serde(default)]
    pub height_cm: Option<f64>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub activity_level: Option<ActivityLevel>,
    #[serde(default)]
    pub workout_days_per_week: Option<i32>,
    #[serde(default)]
    pub goal: Option<Goal>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Check submitted values against the ranges the `profiles` table accepts.
    pub fn validate(&self) -> Result<(), FieldError> {
        if let Some(age) = self.age {
            if !(1..150).contains(&age) {
                return Err(FieldError::new("age", "must be between 1 and 149"));
            }
        }
        check_positive("height_cm", self.height_cm)?;
        check_positive("weight_kg", self.weight_kg)?;
        if let Some(days) = self.workout_days_per_week {
            if !(1..=7).contains(&days) {
                return Err(FieldError::new(
                    "workout_days_per_week",
                    "must be between 1 and 7",
                ));
            }
        }
        Ok(())
    }
}

/// A progress entry to append.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NewProgressLog {
    /// Defaults to now when absent.
    #[serde(default)]
    pub logged_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub weight_kg: Option<f64>,
    #[serde(default)]
    pub workout_completed: Option<bool>,
    #[serde(default)]
    pub diet_adherence: Option<i32>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl NewProgressLog {
    pub fn validate(&self) -> Result<(), FieldError> {
        check_positive("weight_kg", self.weight_kg)?;
        if let Some(adherence) = self.diet_adherence {
            if !(0..=100).contains(&adherence) {
                return Err(FieldError::new("diet_adherence", "must be between 0 and 100"));
            }
        }
        Ok(())
    }
}

/// A submitted value outside the range its column accepts.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field} {reason}")]
pub struct FieldError {
    pub field: &'static str,
    pub reason: &'static str,
}

impl FieldError {
    fn new(field: &'static str, reason: &'static str) -> Self {
        Self { field, reason }
    }
}

fn check_positive(field: &'static str, value: Option<f64>) -> Result<(), FieldError> {
    match value {
        Some(v) if !v.is_finite() || v <= 0.0 => {
            Err(FieldError::new(field, "must be a positive number"))
        }
        _ => Ok(()),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
