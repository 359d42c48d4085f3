use assistant_service::config::AssistantConfig;
use assistant_service::services::init_metrics;
use assistant_service::startup::Application;
use service_core::config::Config as CoreConfig;
use service_core::observability::init_tracing;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let common = CoreConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    let otlp_endpoint = std::env::var("OTLP_ENDPOINT").ok();
    init_tracing("assistant-service", &common.log_level, otlp_endpoint.as_deref());

    init_metrics();

    let config = AssistantConfig::from_common(common).await;

    let app = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    app.run_until_stopped().await
}
