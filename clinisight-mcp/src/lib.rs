pub mod server;

pub use server::{ClinisightArgs, ClinisightServer, SERVER_NAME};

use clinisight_core::ClinisightWorkflow;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use std::sync::Arc;

/// Streamable HTTP MCP endpoint at `path`, one `ClinisightServer` per session.
pub fn mcp_router(workflow: Arc<ClinisightWorkflow>, path: &str) -> axum::Router {
    let service = StreamableHttpService::new(
        move || Ok(ClinisightServer::new(workflow.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    axum::Router::new().nest_service(path, service)
}
