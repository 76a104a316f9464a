use axum::{
    Router,
    extract::State,
    http::{HeaderValue, StatusCode},
    response::Json,
    routing::{get, post},
};
use clinisight_core::Config;
use serde_json::{Value, json};
use std::sync::Arc;
use tower_http::{
    cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::{
    agent::{AgentRunner, DiagnosisAgent},
    models::{DiagnosisResponse, NormalizedResult, QueryInput},
    normalize::is_truthy,
};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;
type ApiError = (StatusCode, Json<Value>);

fn internal_error(message: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({
            "detail": format!("Internal server error: {}", message)
        })),
    )
}

#[derive(Clone)]
pub struct AppState {
    pub agent: Arc<dyn DiagnosisAgent>,
}

pub fn create_app(config: &Config) -> Router {
    let app_state = AppState {
        agent: Arc::new(AgentRunner::from_config(config)),
    };
    build_router(app_state, &config.server.cors_allowed_origins)
}

pub fn build_router(app_state: AppState, allowed_origins: &[String]) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health_check))
        .route("/diagnosis", post(diagnosis))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
}

async fn root() -> Json<Value> {
    Json(json!({
        "service": "Clinisight Diagnosis Service",
        "version": env!("CARGO_PKG_VERSION"),
        "description": "Symptom description to PubMed literature summary via an MCP tool agent",
        "endpoints": {
            "POST /diagnosis": "Summarize literature for a symptom description",
            "GET /health": "Health check"
        }
    }))
}

async fn health_check() -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

async fn diagnosis(
    State(state): State<AppState>,
    Json(query): Json<QueryInput>,
) -> ApiResult<DiagnosisResponse> {
    info!("Received query: {}", query.description);

    let agent_response = state
        .agent
        .run_agent_with_query(&query.description)
        .await
        .map_err(|e| {
            error!("Error processing query: {}", e);
            internal_error(&e.to_string())
        })?;

    Ok(Json(DiagnosisResponse {
        symptom: vec![query.description],
        pubmed_summary: select_summary(&agent_response),
        raw_agent: agent_response,
    }))
}

/// Primary tool output, else assistant text, else `""`.
fn select_summary(result: &NormalizedResult) -> Value {
    if let Some(primary) = result.primary_tool_output.as_ref().filter(|v| is_truthy(v)) {
        return primary.clone();
    }
    match result.assistant.as_deref() {
        Some(text) if !text.is_empty() => Value::String(text.to_string()),
        _ => Value::String(String::new()),
    }
}
