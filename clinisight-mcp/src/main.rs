use clinisight_core::{ClinisightWorkflow, Config};
use clinisight_mcp::{SERVER_NAME, mcp_router};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{Level, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = Config::from_env()?;
    let workflow = Arc::new(ClinisightWorkflow::from_config(&config)?);

    let app = mcp_router(workflow, &config.mcp.path);

    let listener = TcpListener::bind(format!("{}:{}", config.mcp.host, config.mcp.port)).await?;
    let addr = listener.local_addr()?;

    info!("{} MCP server starting on {}", SERVER_NAME, addr);
    info!("Streamable HTTP endpoint: http://{}{}", addr, config.mcp.path);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
            info!("Shutting down");
        })
        .await?;

    Ok(())
}
