//! Plan generation for fitplan.
//!
//! [`generation`] turns a stored profile into a prompt, asks a
//! [`llm::ChatModel`] for a plan, validates the JSON it returns and replaces
//! the user's workout and diet rows in a single transaction.

pub mod generation;
pub mod llm;
