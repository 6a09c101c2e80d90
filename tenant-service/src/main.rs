use service_core::observability::init_tracing;
use tenant_service::config::TenantServiceConfig;
use tenant_service::services::init_metrics;
use tenant_service::startup::Application;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    let config = TenantServiceConfig::load().map_err(|e| {
        eprintln!("Failed to load configuration: {}", e);
        std::io::Error::other(format!("Configuration error: {}", e))
    })?;

    init_tracing(
        "tenant-service",
        &config.common.log_level,
        config.common.otlp_endpoint.as_deref(),
    );
    init_metrics();

    let application = Application::build(config).await.map_err(|e| {
        tracing::error!("Failed to build application: {}", e);
        std::io::Error::other(format!("Startup error: {}", e))
    })?;

    application.run_until_stopped().await
}
