//! Plan regeneration service.
//!
//! Orchestrates a full regeneration: profile lookup, model call, response
//! validation, and the transactional replacement of the user's workout and
//! diet rows. Everything that can fail before the transaction (bad input,
//! missing profile, provider or parse errors) leaves existing rows untouched.

use anyhow::Context;
use serde::Serialize;
use sqlx::PgPool;
use thiserror::Error;
use tracing::{error, info, instrument};
use uuid::Uuid;

use fitplan_db::queries::{diet_plans, profiles, workout_plans};

use super::prompt::build_prompt;
use super::response::{PlanParseError, PlanValidationError, ValidatedPlan, parse_generated_plan};
use crate::llm::{ChatModel, ModelError};

/// Upstream error bodies longer than this many characters are cut short.
const MAX_UPSTREAM_BODY_CHARS: usize = 300;

/// Errors from [`regenerate_plans`].
#[derive(Debug, Error)]
pub enum GenerateError {
    #[error("userId is required")]
    MissingUserId,

    #[error("invalid userId {0:?}")]
    InvalidUserId(String),

    #[error("no profile found for user {0}")]
    ProfileNotFound(Uuid),

    #[error("AI gateway error: {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("AI gateway request failed: {0}")]
    Transport(String),

    #[error("AI gateway returned no content")]
    EmptyCompletion,

    #[error("failed to parse AI response: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("AI response is not a usable plan: {0}")]
    InvalidPlan(#[from] PlanValidationError),

    #[error("database error: {0:#}")]
    Database(anyhow::Error),
}

impl From<ModelError> for GenerateError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::Status { status, body } => Self::Upstream {
                status,
                body: truncate_body(&body),
            },
            ModelError::EmptyCompletion => Self::EmptyCompletion,
            other => Self::Transport(other.to_string()),
        }
    }
}

impl From<PlanParseError> for GenerateError {
    fn from(err: PlanParseError) -> Self {
        match err {
            PlanParseError::Json(e) => Self::Parse(e),
            PlanParseError::Invalid(e) => Self::InvalidPlan(e),
        }
    }
}

fn truncate_body(body: &str) -> String {
    let body = body.trim();
    if body.is_empty() {
        return "(empty body)".to_owned();
    }
    match body.char_indices().nth(MAX_UPSTREAM_BODY_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_owned(),
    }
}

/// Row counts written by a successful regeneration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RegenerationSummary {
    pub workouts: u64,
    pub meals: u64,
}

/// Validate a caller-supplied user identifier.
pub fn parse_user_id(raw: Option<&str>) -> Result<Uuid, GenerateError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or(GenerateError::MissingUserId)?;
    Uuid::parse_str(raw).map_err(|_| GenerateError::InvalidUserId(raw.to_owned()))
}

/// Key for the per-user `pg_advisory_xact_lock` held while plans are replaced.
pub fn advisory_lock_key(user_id: Uuid) -> i64 {
    let (hi, lo) = user_id.as_u64_pair();
    (hi ^ lo) as i64
}

/// Regenerate the workout and diet plans for `user_id`.
///
/// Reads the profile, asks `model` for a plan, validates the answer and
/// replaces the stored plan in a single transaction.
#[instrument(skip(pool, model), fields(model = model.model_id()))]
pub async fn regenerate_plans(
    pool: &PgPool,
    model: &dyn ChatModel,
    user_id: Uuid,
) -> Result<RegenerationSummary, GenerateError> {
    let profile = profiles::get_profile(pool, user_id)
        .await
        .map_err(GenerateError::Database)?
        .ok_or(GenerateError::ProfileNotFound(user_id))?;

    let prompt = build_prompt(&profile);
    let content = model.complete(&prompt).await.map_err(|e| {
        error!(error = %e, "plan generation call failed");
        GenerateError::from(e)
    })?;

    let plan = parse_generated_plan(&content).map_err(|e| {
        error!(error = %e, content_len = content.len(), "model returned an unusable plan");
        GenerateError::from(e)
    })?;

    let summary = replace_plans(pool, user_id, &plan)
        .await
        .map_err(GenerateError::Database)?;

    info!(
        workouts = summary.workouts,
        meals = summary.meals,
        "regenerated plans"
    );
    Ok(summary)
}

/// Replace all of a user's workout and diet rows with `plan`.
///
/// Runs in one transaction under a per-user advisory lock, so concurrent
/// regenerations for the same user apply one after the other and readers
/// never observe a half-written plan.
pub async fn replace_plans(
    pool: &PgPool,
    user_id: Uuid,
    plan: &ValidatedPlan,
) -> anyhow::Result<RegenerationSummary> {
    let mut tx = pool.begin().await.context("failed to begin transaction")?;

    sqlx::query("SELECT pg_advisory_xact_lock($1)")
        .bind(advisory_lock_key(user_id))
        .execute(&mut *tx)
        .await
        .context("failed to acquire plan lock")?;

    workout_plans::delete_workouts(&mut *tx, user_id).await?;
    diet_plans::delete_meals(&mut *tx, user_id).await?;

    let workouts = workout_plans::insert_workouts(&mut *tx, user_id, &plan.workouts).await?;
    let meals = diet_plans::insert_meals(&mut *tx, user_id, &plan.meals).await?;

    tx.commit().await.context("failed to commit plan replacement")?;

    Ok(RegenerationSummary { workouts, meals })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_or_blank_user_id() {
        assert!(matches!(parse_user_id(None), Err(GenerateError::MissingUserId)));
        assert!(matches!(parse_user_id(Some("  ")), Err(GenerateError::MissingUserId)));
    }

    #[test]
    fn malformed_user_id() {
        let err = parse_user_id(Some("not-a-uuid")).unwrap_err();
        assert!(matches!(err, GenerateError::InvalidUserId(ref s) if s == "not-a-uuid"));
        assert_eq!(err.to_string(), "invalid userId \"not-a-uuid\"");
    }

    #[test]
    fn valid_user_id_is_trimmed() {
        let id = Uuid::new_v4();
        assert_eq!(parse_user_id(Some(format!(" {id} ").as_str())).unwrap(), id);
    }

    #[test]
    fn lock_key_is_stable_and_distinct() {
        let a = Uuid::from_u128(0x0123_4567_89ab_cdef_0011_2233_4455_6677);
        let b = Uuid::from_u128(0x0123_4567_89ab_cdef_0011_2233_4455_6678);
        assert_eq!(advisory_lock_key(a), advisory_lock_key(a));
        assert_ne!(advisory_lock_key(a), advisory_lock_key(b));
    }

    #[test]
    fn model_errors_map_to_generate_errors() {
        let err: GenerateError = ModelError::Status {
            status: 429,
            body: "slow down".to_string(),
        }
        .into();
        assert!(matches!(err, GenerateError::Upstream { status: 429, .. }));
        assert_eq!(err.to_string(), "AI gateway error: 429: slow down");

        let err: GenerateError = ModelError::EmptyCompletion.into();
        assert!(matches!(err, GenerateError::EmptyCompletion));

        let err: GenerateError = ModelError::MissingApiKey.into();
        assert!(matches!(err, GenerateError::Transport(_)));
    }

    #[test]
    fn upstream_body_is_truncated() {
        let err: GenerateError = ModelError::Status {
            status: 500,
            body: "é".repeat(MAX_UPSTREAM_BODY_CHARS + 50),
        }
        .into();
        let GenerateError::Upstream { body, .. } = &err else {
            panic!("expected upstream error, got {err:?}");
        };
        assert_eq!(body.chars().count(), MAX_UPSTREAM_BODY_CHARS + 3);
        assert!(body.ends_with("..."));

        let err: GenerateError = ModelError::Status {
            status: 503,
            body: "  ".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "AI gateway error: 503: (empty body)");
    }

    #[test]
    fn parse_errors_keep_their_kind() {
        let err: GenerateError = parse_generated_plan("{").unwrap_err().into();
        assert!(matches!(err, GenerateError::Parse(_)));

        let err: GenerateError = parse_generated_plan(r#"{"workouts": [], "meals": []}"#)
            .unwrap_err()
            .into();
        assert!(matches!(err, GenerateError::InvalidPlan(PlanValidationError::NoWorkouts)));
    }
}
