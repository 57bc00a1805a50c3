//! Database query functions for the append-only `progress_logs` table.

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::{NewProgressLog, ProgressLog};

/// Append a progress entry. `logged_at` defaults to the server's `now()`.
pub async fn insert_progress_log(
    pool: &PgPool,
    user_id: Uuid,
    entry: &NewProgressLog,
) -> Result<ProgressLog> {
    let log = sqlx::query_as::<_, ProgressLog>(
        "INSERT INTO progress_logs \
             (user_id, logged_at, weight_kg, workout_completed, diet_adherence, notes) \
         VALUES ($1, COALESCE($2, now()), $3, $4, $5, $6) \
         RETURNING *",
    )
    .bind(user_id)
    .bind(entry.logged_at)
    .bind(entry.weight_kg)
    .bind(entry.workout_completed)
    .bind(entry.diet_adherence)
    .bind(&entry.notes)
    .fetch_one(pool)
    .await
    .context("failed to insert progress log")?;

    Ok(log)
}

/// List a user's progress entries, oldest first.
pub async fn list_progress_logs(pool: &PgPool, user_id: Uuid) -> Result<Vec<ProgressLog>> {
    let logs = sqlx::query_as::<_, ProgressLog>(
        "SELECT * FROM progress_logs WHERE user_id = $1 ORDER BY logged_at ASC, created_at ASC",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("failed to list progress logs")?;

    Ok(logs)
}

/// Fetch the most recent progress entry, if any.
pub async fn latest_progress_log(pool: &PgPool, user_id: Uuid) -> Result<Option<ProgressLog>> {
    let log = sqlx::query_as::<_, ProgressLog>(
        "SELECT * FROM progress_logs WHERE user_id = $1 \
         ORDER BY logged_at DESC, created_at DESC LIMIT 1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("failed to fetch latest progress log")?;

    Ok(log)
}
