use clinisight_core::Config;
use clinisight_service::create_app;
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
    info!("Loaded configuration: {:?}", config);

    let app = create_app(&config);
    let listener = TcpListener::bind(format!("{}:{}", config.server.host, config.server.port)).await?;
    let addr = listener.local_addr()?;

    info!("Clinisight Diagnosis Service starting on {}", addr);
    info!("Health check endpoint: http://{}/health", addr);
    info!("Diagnosis endpoint: POST http://{}/diagnosis", addr);
    info!("Agent tool server: {}", config.mcp.url);

    axum::serve(listener, app).await?;

    Ok(())
}
