use clinisight_core::ClinisightWorkflow;
use rmcp::{
    ErrorData as McpError, ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo},
    schemars, tool, tool_handler, tool_router,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, info};

pub const SERVER_NAME: &str = "Clinisight AI";

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct ClinisightArgs {
    /// Free-text description of the patient's symptoms.
    pub symptom_text: String,
}

#[derive(Clone)]
pub struct ClinisightServer {
    tool_router: ToolRouter<Self>,
    workflow: Arc<ClinisightWorkflow>,
}

fn tool_result(payload: serde_json::Value) -> CallToolResult {
    let mut result = CallToolResult::structured(payload.clone());
    result.content = vec![Content::text(payload.to_string())];
    result
}

#[tool_router]
impl ClinisightServer {
    pub fn new(workflow: Arc<ClinisightWorkflow>) -> Self {
        Self {
            tool_router: Self::tool_router(),
            workflow,
        }
    }

    #[tool(
        description = "Extracts symptoms from a free-text description, searches PubMed for related studies and returns a summary of the literature."
    )]
    async fn clinisight_ai(
        &self,
        Parameters(args): Parameters<ClinisightArgs>,
    ) -> Result<CallToolResult, McpError> {
        info!("clinisight_ai called");

        let report = self.workflow.run(&args.symptom_text).await.map_err(|e| {
            error!("Clinisight workflow failed: {}", e);
            McpError::internal_error(e.to_string(), None)
        })?;

        let payload = serde_json::to_value(&report)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(tool_result(payload))
    }
}

#[tool_handler]
impl ServerHandler for ClinisightServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(
                "Call clinisight_ai with the patient's symptom description to get a PubMed literature summary."
                    .to_string(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
