//! Plan generation: prompt construction, response parsing, plan replacement.

pub mod prompt;
pub mod response;
pub mod service;

pub use prompt::build_prompt;
pub use response::{
    GeneratedPlan, PlanParseError, PlanValidationError, ValidatedPlan, parse_generated_plan,
    strip_code_fences,
};
pub use service::{
    GenerateError, RegenerationSummary, advisory_lock_key, parse_user_id, regenerate_plans,
    replace_plans,
};
