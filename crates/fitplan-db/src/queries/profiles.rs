//! Database query functions for the `profiles` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{Profile, ProfileUpdate};

/// Fetch the profile for a user.
pub async fn get_profile(pool: &PgPool, user_id: Uuid) -> Result<Option<Profile>> {
    let profile = sqlx::query_as::<_, Profile>("SELECT * FROM profiles WHERE user_id = $1")
        .bind(user_id)
        .fetch_optional(pool)
        .await
        .context("failed to fetch profile")?;

    Ok(profile)
}

/// Create an empty profile for a user if none exists, returning the row.
pub async fn ensure_profile(pool: &PgPool, user_id: Uuid) -> Result<Profile> {
    sqlx::query("INSERT INTO profiles (user_id) VALUES ($1) ON CONFLICT (user_id) DO NOTHING")
        .bind(user_id)
        .execute(pool)
        .await
        .context("failed to create profile")?;

    get_profile(pool, user_id)
        .await?
        .with_context(|| format!("profile for user {user_id} vanished after insert"))
}

/// Apply a partial update, creating the profile if it does not exist yet.
///
/// Fields left as `None` in `update` keep their stored value.
pub async fn update_profile(pool: &PgPool, user_id: Uuid, update: &ProfileUpdate) -> Result<Profile> {
    upsert(pool, user_id, update, false)
        .await
        .context("failed to update profile")
}

/// Write the onboarding questionnaire and mark onboarding as complete.
pub async fn complete_onboarding(
    pool: &PgPool,
    user_id: Uuid,
    update: &ProfileUpdate,
) -> Result<Profile> {
    upsert(pool, user_id, update, true)
        .await
        .context("failed to complete onboarding")
}

async fn upsert(
    pool: &PgPool,
    user_id: Uuid,
    update: &ProfileUpdate,
    onboarded: bool,
) -> sqlx::Result<Profile> {
    sqlx::query_as::<_, Profile>(
        "INSERT INTO profiles \
             (user_id, full_name, age, gender, height_cm, weight_kg, activity_level, \
              workout_days_per_week, goal, onboarding_complete) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
         ON CONFLICT (user_id) DO UPDATE SET \
             full_name = COALESCE(EXCLUDED.full_name, profiles.full_name), \
             age = COALESCE(EXCLUDED.age, profiles.age), \
             gender = COALESCE(EXCLUDED.gender, profiles.gender), \
             height_cm = COALESCE(EXCLUDED.height_cm, profiles.height_cm), \
             weight_kg = COALESCE(EXCLUDED.weight_kg, profiles.weight_kg), \
             activity_level = COALESCE(EXCLUDED.activity_level, profiles.activity_level), \
             workout_days_per_week = COALESCE(EXCLUDED.workout_days_per_week, profiles.workout_days_per_week), \
             goal = COALESCE(EXCLUDED.goal, profiles.goal), \
             onboarding_complete = profiles.onboarding_complete OR EXCLUDED.onboarding_complete, \
             updated_at = now() \
         RETURNING *",
    )
    .bind(user_id)
    .bind(&update.full_name)
    .bind(update.age)
    .bind(update.gender)
    .bind(update.height_cm)
    .bind(update.weight_kg)
    .bind(update.activity_level)
    .bind(update.workout_days_per_week)
    .bind(update.goal)
    .bind(onboarded)
    .fetch_one(pool)
    .await
}
