pub mod agent;
pub mod models;
pub mod normalize;
pub mod service;

pub use agent::{AgentRunner, DiagnosisAgent};
pub use models::*;
pub use service::{AppState, build_router, create_app};
