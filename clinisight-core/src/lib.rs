pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod tasks;
pub mod workflow;

pub use config::Config;
pub use error::{ClinisightError, Result};
pub use llm::{GroqTextModel, TextModel};
pub use models::*;
pub use workflow::ClinisightWorkflow;
