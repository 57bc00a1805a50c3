//! Database query functions for the `workout_plans` table.
//!
//! The delete and insert functions take a bare connection so the plan
//! replacement can run them inside one transaction.

use anyhow::{Context, Result};
use sqlx::types::Json;
use sqlx::{PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{NewWorkoutDay, WorkoutPlan};

/// List a user's workout days ordered Monday (1) to Sunday (7).
pub async fn list_workouts(pool: &PgPool, user_id: Uuid) -> Result<Vec<WorkoutPlan>> {
    let rows = sqlx::query_as::<_, WorkoutPlan>(
        "SELECT * FROM workout_plans WHERE user_id = $1 ORDER BY day_of_week",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("failed to list workout plans")?;

    Ok(rows)
}

/// Fetch the workout scheduled for a given ISO weekday, if any.
pub async fn get_workout_for_day(
    pool: &PgPool,
    user_id: Uuid,
    day_of_week: i32,
) -> Result<Option<WorkoutPlan>> {
    let row = sqlx::query_as::<_, WorkoutPlan>(
        "SELECT * FROM workout_plans WHERE user_id = $1 AND day_of_week = $2",
    )
    .bind(user_id)
    .bind(day_of_week)
    .fetch_optional(pool)
    .await
    .context("failed to fetch workout for day")?;

    Ok(row)
}

/// Delete every workout row for a user. Returns the number of rows removed.
pub async fn delete_workouts(conn: &mut PgConnection, user_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM workout_plans WHERE user_id = $1")
        .bind(user_id)
        .execute(conn)
        .await
        .context("failed to delete workout plans")?;

    Ok(result.rows_affected())
}

/// Bulk-insert workout days for a user with a single statement.
pub async fn insert_workouts(
    conn: &mut PgConnection,
    user_id: Uuid,
    days: &[NewWorkoutDay],
) -> Result<u64> {
    if days.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<Postgres> =
        QueryBuilder::new("INSERT INTO workout_plans (user_id, day_of_week, day_label, exercises) ");
    builder.push_values(days, |mut row, day| {
        row.push_bind(user_id)
            .push_bind(day.day_of_week)
            .push_bind(&day.day_label)
            .push_bind(Json(&day.exercises));
    });

    let result = builder
        .build()
        .execute(conn)
        .await
        .context("failed to insert workout plans")?;

    Ok(result.rows_affected())
}
