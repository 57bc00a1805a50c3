//! CLI handlers that operate on one user's plans.
//!
//! Implements:
//! - `fitplan generate <user-id>` -- regenerate plans through the model
//! - `fitplan show <user-id>`     -- print profile, plans and latest progress

use anyhow::{Context, Result};
use sqlx::PgPool;
use uuid::Uuid;

use fitplan_core::generation::regenerate_plans;
use fitplan_core::llm::{ChatCompletionClient, LlmConfig};
use fitplan_db::models::{DietPlan, MealType, Profile, WorkoutPlan};
use fitplan_db::queries::{diet_plans, profiles, progress_logs, workout_plans};

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

fn parse_id(user_id: &str) -> Result<Uuid> {
    Uuid::parse_str(user_id).with_context(|| format!("invalid user ID: {user_id}"))
}

// -----------------------------------------------------------------------
// fitplan generate <user-id>
// -----------------------------------------------------------------------

pub async fn run_generate(pool: &PgPool, llm_config: &LlmConfig, user_id: &str) -> Result<()> {
    let id = parse_id(user_id)?;
    let client = ChatCompletionClient::new(llm_config)
        .context("cannot generate plans without a model provider")?;

    println!("Generating plans for {id} with {} ...", llm_config.model);
    let summary = regenerate_plans(pool, &client, id).await?;

    println!("Plans regenerated.");
    println!("  Workout days: {}", summary.workouts);
    println!("  Meals:        {}", summary.meals);
    Ok(())
}

// -----------------------------------------------------------------------
// fitplan show <user-id>
// -----------------------------------------------------------------------

pub async fn run_show(pool: &PgPool, user_id: &str) -> Result<()> {
    let id = parse_id(user_id)?;
    let profile = profiles::get_profile(pool, id)
        .await?
        .with_context(|| format!("no profile found for user {id}"))?;

    let workouts = workout_plans::list_workouts(pool, id).await?;
    let meals = diet_plans::list_meals(pool, id).await?;
    let totals = diet_plans::macro_totals(pool, id).await?;
    let latest = progress_logs::latest_progress_log(pool, id).await?;

    print_profile(&profile);

    println!();
    println!("Workout plan:");
    if workouts.is_empty() {
        println!("  (none)");
    }
    for workout in &workouts {
        print_workout(workout);
    }

    println!();
    println!("Diet plan:");
    if meals.is_empty() {
        println!("  (none)");
    }
    for meal_type in MealType::ALL {
        let slot: Vec<&DietPlan> = meals.iter().filter(|m| m.meal_type == meal_type).collect();
        if slot.is_empty() {
            continue;
        }
        println!("  {}:", meal_type.label());
        for meal in slot {
            println!("    {}", format_meal(meal));
        }
    }
    if !meals.is_empty() {
        println!(
            "  Daily total: {} kcal, P {:.0}g / C {:.0}g / F {:.0}g",
            totals.calories, totals.protein_g, totals.carbs_g, totals.fat_g
        );
    }

    println!();
    match latest {
        Some(log) => {
            println!("Latest progress ({}):", log.logged_at.format("%Y-%m-%d %H:%M"));
            if let Some(w) = log.weight_kg {
                println!("  Weight:         {w} kg");
            }
            if let Some(done) = log.workout_completed {
                println!("  Workout done:   {}", if done { "yes" } else { "no" });
            }
            if let Some(a) = log.diet_adherence {
                println!("  Diet adherence: {a}%");
            }
            if let Some(ref notes) = log.notes {
                println!("  Notes:          {notes}");
            }
        }
        None => println!("No progress logged yet."),
    }

    Ok(())
}

fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".to_string(), |v| v.to_string())
}

fn print_profile(profile: &Profile) {
    println!("Profile {}", profile.user_id);
    println!("  Name:          {}", or_dash(profile.full_name.as_deref()));
    println!("  Age:           {}", or_dash(profile.age));
    println!("  Gender:        {}", or_dash(profile.gender));
    println!("  Height:        {} cm", or_dash(profile.height_cm));
    println!("  Weight:        {} kg", or_dash(profile.weight_kg));
    println!(
        "  Activity:      {}",
        or_dash(
            profile
                .activity_level
                .map(|a| format!("{a} ({})", a.description()))
        )
    );
    println!("  Days/week:     {}", or_dash(profile.workout_days_per_week));
    println!("  Goal:          {}", or_dash(profile.goal.map(|g| g.label())));
    println!(
        "  Onboarded:     {}",
        if profile.onboarding_complete { "yes" } else { "no" }
    );
}

fn print_workout(workout: &WorkoutPlan) {
    let day = usize::try_from(workout.day_of_week - 1)
        .ok()
        .and_then(|i| DAY_NAMES.get(i))
        .copied()
        .unwrap_or("?");
    println!("  {day}: {}", workout.day_label);
    for ex in workout.exercises.iter() {
        match ex.notes {
            Some(ref notes) => println!("    - {} {}x{} ({notes})", ex.name, ex.sets, ex.reps),
            None => println!("    - {} {}x{}", ex.name, ex.sets, ex.reps),
        }
    }
}

fn format_meal(meal: &DietPlan) -> String {
    let mut line = meal.meal_name.clone();
    if let Some(kcal) = meal.calories {
        line.push_str(&format!(" ({kcal} kcal)"));
    }
    if let Some(ref desc) = meal.description {
        line.push_str(&format!(": {desc}"));
    }
    line
}
