use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use fitplan_core::generation::{
    GenerateError, RegenerationSummary, parse_user_id, regenerate_plans,
};
use fitplan_core::llm::{ChatModel, ModelError};
use fitplan_db::models::{
    DietPlan, FieldError, NewProgressLog, Profile, ProfileUpdate, ProgressLog, WorkoutPlan,
};
use fitplan_db::pool;
use fitplan_db::queries::diet_plans::{self, MacroTotals};
use fitplan_db::queries::{profiles, progress_logs, workout_plans};

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    /// `None` when no API key is configured; generation then fails with 500.
    pub model: Option<Arc<dyn ChatModel>>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
}

impl AppError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.into(),
        }
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.into(),
        }
    }

    pub fn internal(err: anyhow::Error) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: format!("{err:#}"),
        }
    }

    /// Generation failures are all reported as 500 with the error text.
    pub fn generation(err: &GenerateError) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: err.to_string(),
        }
    }
}

impl From<FieldError> for AppError {
    fn from(err: FieldError) -> Self {
        Self::bad_request(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let body = serde_json::json!({ "error": self.message });
        (self.status, Json(body)).into_response()
    }
}

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    #[serde(default, rename = "userId")]
    pub user_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub success: bool,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum GenerationOutcome {
    Generated {
        success: bool,
        #[serde(flatten)]
        summary: RegenerationSummary,
    },
    Failed {
        success: bool,
        error: String,
    },
}

#[derive(Debug, Serialize)]
pub struct OnboardingResponse {
    pub profile: Profile,
    pub generation: GenerationOutcome,
}

#[derive(Debug, Serialize)]
pub struct DietResponse {
    pub meals: Vec<DietPlan>,
    pub totals: MacroTotals,
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// ISO weekday (1 = Monday). Defaults to the server's local day.
    pub day: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct TodayResponse {
    pub day_of_week: u32,
    pub workout: Option<WorkoutPlan>,
}

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub first_name: Option<String>,
    pub goal_label: Option<&'static str>,
    pub profile: Profile,
    pub today: TodayResponse,
    pub latest_progress: Option<ProgressLog>,
}

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/functions/v1/generate-plans", post(generate_plans))
        .route("/api/profiles/{user_id}", get(get_profile).put(update_profile))
        .route("/api/profiles/{user_id}/onboarding", post(complete_onboarding))
        .route("/api/users/{user_id}/workouts", get(list_workouts))
        .route("/api/users/{user_id}/diet", get(get_diet))
        .route(
            "/api/users/{user_id}/progress",
            get(list_progress).post(add_progress),
        )
        .route("/api/users/{user_id}/dashboard", get(dashboard))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

pub async fn run_serve(state: AppState, bind: &str, port: u16) -> Result<()> {
    let app = build_router(state);
    let addr: SocketAddr = format!("{bind}:{port}").parse()?;
    tracing::info!("fitplan serve listening on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("fitplan serve shut down");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn health(State(state): State<AppState>) -> Result<Json<serde_json::Value>, AppError> {
    pool::ping(&state.pool).await.map_err(AppError::internal)?;
    Ok(Json(serde_json::json!({ "status": "ok" })))
}

async fn generate_plans(
    State(state): State<AppState>,
    body: Result<Json<GenerateRequest>, JsonRejection>,
) -> Result<Json<GenerateResponse>, AppError> {
    let Json(request) = body.map_err(|rejection| {
        tracing::warn!(error = %rejection.body_text(), "rejected generate-plans body");
        AppError {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: rejection.body_text(),
        }
    })?;

    run_generation(&state, request.user_id.as_deref())
        .await
        .map_err(|e| AppError::generation(&e))?;

    Ok(Json(GenerateResponse { success: true }))
}

async fn run_generation(
    state: &AppState,
    raw_user_id: Option<&str>,
) -> Result<RegenerationSummary, GenerateError> {
    let user_id = parse_user_id(raw_user_id)?;
    let Some(model) = state.model.as_deref() else {
        return Err(ModelError::MissingApiKey.into());
    };
    regenerate_plans(&state.pool, model, user_id)
        .await
        .inspect_err(|e| tracing::error!(%user_id, error = %e, "plan generation failed"))
}

/// Path segments that are not UUIDs get the JSON error body.
fn user_path(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    let Path(user_id) = path.map_err(|r| AppError::bad_request(r.body_text()))?;
    Ok(user_id)
}

async fn get_profile(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Profile>, AppError> {
    let user_id = user_path(path)?;
    let profile = profiles::get_profile(&state.pool, user_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("profile for user {user_id} not found")))?;
    Ok(Json(profile))
}

async fn update_profile(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<Profile>, AppError> {
    let user_id = user_path(path)?;
    let Json(update) = body.map_err(|r| AppError::bad_request(r.body_text()))?;
    update.validate()?;

    let profile = if update.is_empty() {
        profiles::ensure_profile(&state.pool, user_id).await
    } else {
        profiles::update_profile(&state.pool, user_id, &update).await
    }
    .map_err(AppError::internal)?;
    Ok(Json(profile))
}

async fn complete_onboarding(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<ProfileUpdate>, JsonRejection>,
) -> Result<Json<OnboardingResponse>, AppError> {
    let user_id = user_path(path)?;
    let Json(update) = body.map_err(|r| AppError::bad_request(r.body_text()))?;
    update.validate()?;

    let profile = profiles::complete_onboarding(&state.pool, user_id, &update)
        .await
        .map_err(AppError::internal)?;

    // The questionnaire is saved even when generation fails; the caller can
    // retry generation later.
    let user_id_text = user_id.to_string();
    let generation = match run_generation(&state, Some(&user_id_text)).await {
        Ok(summary) => GenerationOutcome::Generated {
            success: true,
            summary,
        },
        Err(e) => GenerationOutcome::Failed {
            success: false,
            error: e.to_string(),
        },
    };

    Ok(Json(OnboardingResponse {
        profile,
        generation,
    }))
}

async fn list_workouts(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<WorkoutPlan>>, AppError> {
    let user_id = user_path(path)?;
    let workouts = workout_plans::list_workouts(&state.pool, user_id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(workouts))
}

async fn get_diet(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<DietResponse>, AppError> {
    let user_id = user_path(path)?;
    let meals = diet_plans::list_meals(&state.pool, user_id)
        .await
        .map_err(AppError::internal)?;
    let totals = diet_plans::macro_totals(&state.pool, user_id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(DietResponse { meals, totals }))
}

async fn list_progress(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<Vec<ProgressLog>>, AppError> {
    let user_id = user_path(path)?;
    let logs = progress_logs::list_progress_logs(&state.pool, user_id)
        .await
        .map_err(AppError::internal)?;
    Ok(Json(logs))
}

async fn add_progress(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<NewProgressLog>, JsonRejection>,
) -> Result<(StatusCode, Json<ProgressLog>), AppError> {
    let user_id = user_path(path)?;
    let Json(entry) = body.map_err(|r| AppError::bad_request(r.body_text()))?;
    entry.validate()?;

    let log = progress_logs::insert_progress_log(&state.pool, user_id, &entry)
        .await
        .map_err(AppError::internal)?;
    Ok((StatusCode::CREATED, Json(log)))
}

async fn dashboard(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
    query: Result<Query<DashboardQuery>, QueryRejection>,
) -> Result<Json<DashboardResponse>, AppError> {
    let user_id = user_path(path)?;
    let Query(query) = query.map_err(|r| AppError::bad_request(r.body_text()))?;
    let day = match query.day {
        Some(d @ 1..=7) => d,
        Some(d) => {
            return Err(AppError::bad_request(format!(
                "day must be between 1 and 7, got {d}"
            )));
        }
        None => chrono::Local::now().weekday().number_from_monday(),
    };

    let profile = profiles::get_profile(&state.pool, user_id)
        .await
        .map_err(AppError::internal)?
        .ok_or_else(|| AppError::not_found(format!("profile for user {user_id} not found")))?;

    let workout = workout_plans::get_workout_for_day(&state.pool, user_id, day as i32)
        .await
        .map_err(AppError::internal)?;

    let latest_progress = progress_logs::latest_progress_log(&state.pool, user_id)
        .await
        .map_err(AppError::internal)?;

    Ok(Json(DashboardResponse {
        first_name: profile.first_name().map(str::to_owned),
        goal_label: profile.goal.map(|g| g.label()),
        profile,
        today: TodayResponse {
            day_of_week: day,
            workout,
        },
        latest_progress,
    }))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use serde_json::json;
    use sqlx::PgPool;
    use tower::ServiceExt;
    use uuid::Uuid;

    use fitplan_core::llm::{ChatModel, ModelError};
    use fitplan_db::models::{Goal, ProfileUpdate};
    use fitplan_db::queries::profiles;
    use fitplan_test_utils::{create_test_db, drop_test_db};

    use super::AppState;

    const PLAN: &str = r#"```json
{
  "workouts": [
    {"day_of_week": 1, "day_label": "Monday: Upper", "exercises": [
      {"name": "Push-ups", "sets": 3, "reps": "12"},
      {"name": "Rows", "sets": 3, "reps": "10"}
    ]},
    {"day_of_week": 4, "day_label": "Thursday: Lower", "exercises": [
      {"name": "Squat", "sets": 4, "reps": "8"}
    ]}
  ],
  "meals": [
    {"meal_type": "dinner", "meal_name": "Stir fry", "calories": 550, "protein_g": 35, "carbs_g": 50, "fat_g": 18},
    {"meal_type": "breakfast", "meal_name": "Eggs on toast", "calories": 400, "protein_g": 25, "carbs_g": 30, "fat_g": 15}
  ]
}
```"#;

    struct FixedModel {
        reply: Result<String, u16>,
        calls: AtomicUsize,
    }

    impl FixedModel {
        fn ok() -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(PLAN.to_string()),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(status),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl ChatModel for FixedModel {
        fn model_id(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _prompt: &str) -> Result<String, ModelError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.reply {
                Ok(s) => Ok(s.clone()),
                Err(status) => Err(ModelError::Status {
                    status: *status,
                    body: "upstream said no".to_string(),
                }),
            }
        }
    }

    // -----------------------------------------------------------------------
    // HTTP helpers
    // -----------------------------------------------------------------------

    fn state(pool: &PgPool, model: Option<Arc<dyn ChatModel>>) -> AppState {
        AppState {
            pool: pool.clone(),
            model,
        }
    }

    async fn send(state: AppState, request: Request<Body>) -> axum::response::Response {
        super::build_router(state).oneshot(request).await.unwrap()
    }

    async fn get(state: AppState, uri: &str) -> axum::response::Response {
        send(state, Request::builder().uri(uri).body(Body::empty()).unwrap()).await
    }

    async fn send_json(
        state: AppState,
        method: &str,
        uri: &str,
        body: serde_json::Value,
    ) -> axum::response::Response {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap();
        send(state, request).await
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1_048_576)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    async fn seed_profile(pool: &PgPool) -> Uuid {
        let user_id = Uuid::new_v4();
        let update = ProfileUpdate {
            full_name: Some("Jordan Lee".to_string()),
            age: Some(41),
            goal: Some(Goal::Maintenance),
            ..ProfileUpdate::default()
        };
        profiles::complete_onboarding(pool, user_id, &update)
            .await
            .unwrap();
        user_id
    }

    // -----------------------------------------------------------------------
    // Tests
    // -----------------------------------------------------------------------

    #[tokio::test]
    async fn test_health() {
        let (pool, db_name) = create_test_db().await;

        let resp = get(state(&pool, None), "/health").await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({ "status": "ok" }));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_generate_plans_success() {
        let (pool, db_name) = create_test_db().await;
        let user_id = seed_profile(&pool).await;
        let model = FixedModel::ok();

        let resp = send_json(
            state(&pool, Some(model.clone())),
            "POST",
            "/functions/v1/generate-plans",
            json!({ "userId": user_id.to_string() }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await, json!({ "success": true }));
        assert_eq!(model.calls.load(Ordering::SeqCst), 1);

        let resp = get(state(&pool, None), &format!("/api/users/{user_id}/workouts")).await;
        let workouts = body_json(resp).await;
        let workouts = workouts.as_array().unwrap();
        assert_eq!(workouts.len(), 2);
        assert_eq!(workouts[0]["day_of_week"], 1);
        assert_eq!(workouts[0]["exercises"][0]["name"], "Push-ups");

        let resp = get(state(&pool, None), &format!("/api/users/{user_id}/diet")).await;
        let diet = body_json(resp).await;
        assert_eq!(diet["meals"][0]["meal_type"], "breakfast");
        assert_eq!(diet["meals"][1]["meal_type"], "dinner");
        assert_eq!(diet["totals"]["calories"], 950);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_generate_plans_error_paths_are_500() {
        let (pool, db_name) = create_test_db().await;
        let user_id = seed_profile(&pool).await;
        let model = FixedModel::ok();
        let model_state = || state(&pool, Some(model.clone()));

        // Missing userId.
        let resp = send_json(model_state(), "POST", "/functions/v1/generate-plans", json!({})).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["error"], "userId is required");

        // Malformed userId.
        let resp = send_json(
            model_state(),
            "POST",
            "/functions/v1/generate-plans",
            json!({ "userId": "abc" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        // Unknown profile.
        let resp = send_json(
            model_state(),
            "POST",
            "/functions/v1/generate-plans",
            json!({ "userId": Uuid::new_v4().to_string() }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let msg = body_json(resp).await["error"].as_str().unwrap().to_string();
        assert!(msg.starts_with("no profile found"), "unexpected error: {msg}");
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);

        // Body that is not JSON at all.
        let request = Request::builder()
            .method("POST")
            .uri("/functions/v1/generate-plans")
            .header("content-type", "application/json")
            .body(Body::from("not json"))
            .unwrap();
        let resp = send(model_state(), request).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(body_json(resp).await.get("error").is_some());

        // Upstream failure.
        let resp = send_json(
            state(&pool, Some(FixedModel::failing(402))),
            "POST",
            "/functions/v1/generate-plans",
            json!({ "userId": user_id.to_string() }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body_json(resp).await["error"], "AI gateway error: 402: upstream said no");

        // No model configured.
        let resp = send_json(
            state(&pool, None),
            "POST",
            "/functions/v1/generate-plans",
            json!({ "userId": user_id.to_string() }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_profile_get_and_update() {
        let (pool, db_name) = create_test_db().await;
        let user_id = Uuid::new_v4();
        let uri = format!("/api/profiles/{user_id}");

        let resp = get(state(&pool, None), &uri).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = send_json(
            state(&pool, None),
            "PUT",
            &uri,
            json!({ "weight_kg": 72.5, "activity_level": "very_active" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let profile = body_json(resp).await;
        assert_eq!(profile["weight_kg"], 72.5);
        assert_eq!(profile["activity_level"], "very_active");
        assert_eq!(profile["onboarding_complete"], false);

        let resp = send_json(state(&pool, None), "PUT", &uri, json!({ "age": 30 })).await;
        let profile = body_json(resp).await;
        assert_eq!(profile["age"], 30);
        assert_eq!(profile["weight_kg"], 72.5, "unset fields are preserved");

        let resp = get(state(&pool, None), &uri).await;
        assert_eq!(resp.status(), StatusCode::OK);

        // An empty body creates nothing new and changes nothing.
        let resp = send_json(state(&pool, None), "PUT", &uri, json!({})).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(body_json(resp).await["age"], 30);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_profile_update_validation() {
        let (pool, db_name) = create_test_db().await;
        let uri = format!("/api/profiles/{}", Uuid::new_v4());

        let resp = send_json(
            state(&pool, None),
            "PUT",
            &uri,
            json!({ "workout_days_per_week": 9 }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_json(resp).await["error"],
            "workout_days_per_week must be between 1 and 7"
        );

        let resp = send_json(state(&pool, None), "PUT", &uri, json!({ "goal": "bulking" })).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = send_json(state(&pool, None), "PUT", &uri, json!({ "shoe_size": 44 })).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_onboarding_saves_profile_and_generates() {
        let (pool, db_name) = create_test_db().await;
        let user_id = Uuid::new_v4();
        let model = FixedModel::ok();

        let resp = send_json(
            state(&pool, Some(model.clone())),
            "POST",
            &format!("/api/profiles/{user_id}/onboarding"),
            json!({
                "full_name": "Casey Smith",
                "age": 25,
                "gender": "other",
                "workout_days_per_week": 2,
                "goal": "muscle_gain"
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["profile"]["onboarding_complete"], true);
        assert_eq!(json["profile"]["goal"], "muscle_gain");
        assert_eq!(json["generation"]["success"], true);
        assert_eq!(json["generation"]["workouts"], 2);
        assert_eq!(json["generation"]["meals"], 2);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_onboarding_keeps_profile_when_generation_fails() {
        let (pool, db_name) = create_test_db().await;
        let user_id = Uuid::new_v4();

        let resp = send_json(
            state(&pool, Some(FixedModel::failing(500))),
            "POST",
            &format!("/api/profiles/{user_id}/onboarding"),
            json!({ "age": 50 }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["generation"]["success"], false);
        assert_eq!(json["generation"]["error"], "AI gateway error: 500: upstream said no");

        let stored = profiles::get_profile(&pool, user_id).await.unwrap().unwrap();
        assert!(stored.onboarding_complete);
        assert_eq!(stored.age, Some(50));

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_progress_log_roundtrip() {
        let (pool, db_name) = create_test_db().await;
        let user_id = Uuid::new_v4();
        let uri = format!("/api/users/{user_id}/progress");

        let resp = send_json(
            state(&pool, None),
            "POST",
            &uri,
            json!({
                "logged_at": "2026-03-02T08:00:00Z",
                "weight_kg": 81.0,
                "workout_completed": true,
                "diet_adherence": 80
            }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = send_json(
            state(&pool, None),
            "POST",
            &uri,
            json!({ "logged_at": "2026-03-01T08:00:00Z", "notes": "rest day" }),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let resp = send_json(state(&pool, None), "POST", &uri, json!({ "diet_adherence": 150 })).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = get(state(&pool, None), &uri).await;
        let logs = body_json(resp).await;
        let logs = logs.as_array().unwrap();
        assert_eq!(logs.len(), 2);
        assert_eq!(logs[0]["notes"], "rest day");
        assert_eq!(logs[1]["diet_adherence"], 80);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_dashboard() {
        let (pool, db_name) = create_test_db().await;
        let model = FixedModel::ok();

        let resp = get(
            state(&pool, None),
            &format!("/api/users/{}/dashboard", Uuid::new_v4()),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let user_id = seed_profile(&pool).await;
        send_json(
            state(&pool, Some(model)),
            "POST",
            "/functions/v1/generate-plans",
            json!({ "userId": user_id.to_string() }),
        )
        .await;
        send_json(
            state(&pool, None),
            "POST",
            &format!("/api/users/{user_id}/progress"),
            json!({ "weight_kg": 77.7 }),
        )
        .await;

        let resp = get(
            state(&pool, None),
            &format!("/api/users/{user_id}/dashboard?day=4"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let json = body_json(resp).await;
        assert_eq!(json["first_name"], "Jordan");
        assert_eq!(json["goal_label"], "Stay where I am");
        assert_eq!(json["today"]["day_of_week"], 4);
        assert_eq!(json["today"]["workout"]["day_label"], "Thursday: Lower");
        assert_eq!(json["latest_progress"]["weight_kg"], 77.7);

        // Rest day.
        let resp = get(
            state(&pool, None),
            &format!("/api/users/{user_id}/dashboard?day=7"),
        )
        .await;
        let json = body_json(resp).await;
        assert!(json["today"]["workout"].is_null());

        let resp = get(
            state(&pool, None),
            &format!("/api/users/{user_id}/dashboard?day=0"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_cors_preflight_allows_any_origin() {
        let (pool, db_name) = create_test_db().await;

        let request = Request::builder()
            .method("OPTIONS")
            .uri("/functions/v1/generate-plans")
            .header("origin", "https://app.example.com")
            .header("access-control-request-method", "POST")
            .header("access-control-request-headers", "content-type, authorization")
            .body(Body::empty())
            .unwrap();
        let resp = send(state(&pool, None), request).await;
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(
            resp.headers()["access-control-allow-origin"],
            "*",
            "headers: {:?}",
            resp.headers()
        );

        pool.close().await;
        drop_test_db(&db_name).await;
    }

    #[tokio::test]
    async fn test_malformed_path_and_query_return_json_errors() {
        let (pool, db_name) = create_test_db().await;

        for uri in [
            "/api/profiles/not-a-uuid",
            "/api/users/not-a-uuid/workouts",
            "/api/users/not-a-uuid/dashboard",
        ] {
            let resp = get(state(&pool, None), uri).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "{uri}");
            let json = body_json(resp).await;
            assert!(json["error"].as_str().is_some_and(|m| !m.is_empty()), "{uri}: {json}");
        }

        let user_id = seed_profile(&pool).await;
        let resp = get(
            state(&pool, None),
            &format!("/api/users/{user_id}/dashboard?day=monday"),
        )
        .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert!(body_json(resp).await.get("error").is_some());

        pool.close().await;
        drop_test_db(&db_name).await;
    }
}
