//! Query functions, one module per table.

pub mod diet_plans;
pub mod profiles;
pub mod progress_logs;
pub mod workout_plans;
