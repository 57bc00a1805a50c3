//! Database query functions for the `diet_plans` table.

use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::{FromRow, PgConnection, PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::models::{DietPlan, NewMeal};

/// Daily macro totals across every meal item in a plan.
#[derive(Debug, Clone, Default, PartialEq, Serialize, FromRow)]
pub struct MacroTotals {
    pub calories: i64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
}

/// List a user's meal items in eating order (breakfast first).
pub async fn list_meals(pool: &PgPool, user_id: Uuid) -> Result<Vec<DietPlan>> {
    let rows = sqlx::query_as::<_, DietPlan>(
        "SELECT * FROM diet_plans WHERE user_id = $1 \
         ORDER BY CASE meal_type \
             WHEN 'breakfast' THEN 0 \
             WHEN 'snack_am' THEN 1 \
             WHEN 'lunch' THEN 2 \
             WHEN 'snack_pm' THEN 3 \
             WHEN 'dinner' THEN 4 \
         END, created_at, id",
    )
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("failed to list diet plans")?;

    Ok(rows)
}

/// Sum calories and macros over a user's meal items. Missing values count as zero.
pub async fn macro_totals(pool: &PgPool, user_id: Uuid) -> Result<MacroTotals> {
    let totals = sqlx::query_as::<_, MacroTotals>(
        "SELECT \
             COALESCE(SUM(calories), 0)::BIGINT AS calories, \
             COALESCE(SUM(protein_g), 0)::DOUBLE PRECISION AS protein_g, \
             COALESCE(SUM(carbs_g), 0)::DOUBLE PRECISION AS carbs_g, \
             COALESCE(SUM(fat_g), 0)::DOUBLE PRECISION AS fat_g \
         FROM diet_plans WHERE user_id = $1",
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .context("failed to sum diet plan macros")?;

    Ok(totals)
}

/// Delete every meal row for a user. Returns the number of rows removed.
pub async fn delete_meals(conn: &mut PgConnection, user_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM diet_plans WHERE user_id = $1")
        .bind(user_id)
        .execute(conn)
        .await
        .context("failed to delete diet plans")?;

    Ok(result.rows_affected())
}

/// Bulk-insert meal items for a user with a single statement.
pub async fn insert_meals(conn: &mut PgConnection, user_id: Uuid, meals: &[NewMeal]) -> Result<u64> {
    if meals.is_empty() {
        return Ok(0);
    }

    let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
        "INSERT INTO diet_plans \
         (user_id, meal_type, meal_name, description, calories, protein_g, carbs_g, fat_g) ",
    );
    builder.push_values(meals, |mut row, meal| {
        row.push_bind(user_id)
            .push_bind(meal.meal_type)
            .push_bind(&meal.meal_name)
            .push_bind(&meal.description)
            .push_bind(meal.calories)
            .push_bind(meal.protein_g)
            .push_bind(meal.carbs_g)
            .push_bind(meal.fat_g);
    });

    let result = builder
        .build()
        .execute(conn)
        .await
        .context("failed to insert diet plans")?;

    Ok(result.rows_affected())
}
